//! Resolvers for relationship-valued and derived fields. Each call reads the store directly;
//! nothing is cached or batched across entities.

use crate::engine::database::Store;
use crate::engine::objects::{Post, SearchResult, User};
use crate::error::Error;
use juniper::GraphQLEnum;
use std::str::FromStr;

const CENTIMETRES_PER_METRE: f64 = 100.0;
const CENTIMETRES_PER_FOOT: f64 = 30.48;
const GRAMS_PER_KILOGRAM: f64 = 1000.0;
const KILOGRAMS_PER_POUND: f64 = 0.453_592_37;

/// Unit in which a height is reported. Heights are stored in centimetres.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, Hash, PartialEq)]
pub enum HeightUnit {
    Metre,
    Centimetre,
    Foot,
}

impl HeightUnit {
    /// Converts a height in centimetres to this unit
    pub fn convert(self, centimetres: f64) -> f64 {
        match self {
            HeightUnit::Metre => centimetres / CENTIMETRES_PER_METRE,
            HeightUnit::Centimetre => centimetres,
            HeightUnit::Foot => centimetres / CENTIMETRES_PER_FOOT,
        }
    }
}

impl Default for HeightUnit {
    fn default() -> Self {
        HeightUnit::Centimetre
    }
}

impl FromStr for HeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "METRE" => Ok(HeightUnit::Metre),
            "CENTIMETRE" => Ok(HeightUnit::Centimetre),
            "FOOT" => Ok(HeightUnit::Foot),
            _ => Err(Error::UnitNotSupported {
                unit: s.to_string(),
            }),
        }
    }
}

/// Unit in which a weight is reported. Weights are stored in kilograms.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, Hash, PartialEq)]
pub enum WeightUnit {
    Kilogram,
    Gram,
    Pound,
}

impl WeightUnit {
    /// Converts a weight in kilograms to this unit
    pub fn convert(self, kilograms: f64) -> f64 {
        match self {
            WeightUnit::Kilogram => kilograms,
            WeightUnit::Gram => kilograms * GRAMS_PER_KILOGRAM,
            WeightUnit::Pound => kilograms / KILOGRAMS_PER_POUND,
        }
    }
}

impl Default for WeightUnit {
    fn default() -> Self {
        WeightUnit::Kilogram
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KILOGRAM" => Ok(WeightUnit::Kilogram),
            "GRAM" => Ok(WeightUnit::Gram),
            "POUND" => Ok(WeightUnit::Pound),
            _ => Err(Error::UnitNotSupported {
                unit: s.to_string(),
            }),
        }
    }
}

/// Returns the users listed as friends of `user`, in the order they were added
pub fn friends(store: &dyn Store, user: &User) -> Result<Vec<User>, Error> {
    store.users_by_ids(&user.friend_ids)
}

/// Returns the posts written by `user`
pub fn posts_by_author(store: &dyn Store, user: &User) -> Result<Vec<Post>, Error> {
    store.posts_by_author(user.id)
}

/// Returns the author of `post`, or `None` if the author no longer exists
pub fn author(store: &dyn Store, post: &Post) -> Result<Option<User>, Error> {
    store.user_by_id(post.author_id)
}

/// Returns the users who liked `post`
pub fn like_givers(store: &dyn Store, post: &Post) -> Result<Vec<User>, Error> {
    store.users_by_ids(&post.like_giver_ids)
}

pub fn height(user: &User, unit: HeightUnit) -> Option<f64> {
    user.height.map(|cm| unit.convert(cm))
}

pub fn weight(user: &User, unit: WeightUnit) -> Option<f64> {
    user.weight.map(|kg| unit.convert(kg))
}

/// Returns the users whose name contains `contains`, followed by the posts whose title
/// contains it. Matching is case-sensitive.
pub fn search(store: &dyn Store, contains: &str) -> Result<Vec<SearchResult>, Error> {
    let users = store
        .users()?
        .into_iter()
        .filter(|u| u.name.as_deref().map_or(false, |n| n.contains(contains)))
        .map(SearchResult::User);
    let posts = store
        .posts()?
        .into_iter()
        .filter(|p| p.title.contains(contains))
        .map(SearchResult::Post);

    Ok(users.chain(posts).collect())
}
