//! Domain records held by the entity store, and the partial updates applied to them.

use crate::engine::context::GraphQLContext;
use chrono::{DateTime, Utc};
use juniper::GraphQLUnion;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Identifier of a [`User`]. Assigned sequentially, starting at 1.
pub type UserId = u32;

/// Identifier of a [`Post`]. Assigned sequentially, starting at 1.
pub type PostId = u32;

/// A registered user.
///
/// The password hash is only reachable inside the crate and is left out of the [`Debug`]
/// output, so a user can be logged safely.
#[derive(Clone, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "password")]
    pub(crate) password_hash: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    /// Height in centimetres
    pub height: Option<f64>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    #[serde(default)]
    pub friend_ids: Vec<UserId>,
}

impl User {
    pub(crate) fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Returns true if `user_id` is among this user's friends
    pub fn is_friend_of(&self, user_id: UserId) -> bool {
        self.friend_ids.contains(&user_id)
    }
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("age", &self.age)
            .field("height", &self.height)
            .field("weight", &self.weight)
            .field("friend_ids", &self.friend_ids)
            .finish()
    }
}

/// A blog post
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub like_giver_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Returns true if `user_id` has liked this post
    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.like_giver_ids.contains(&user_id)
    }
}

/// Fields required to register a user. The store assigns the id.
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
}

impl Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

/// Fields required to write a post. The store assigns the id and creation time.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub body: Option<String>,
}

/// A partial update of a [`User`]. Only fields that are `Some` overwrite the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub age: Option<i32>,
}

impl UserPatch {
    pub(crate) fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = Some(name);
        }
        if let Some(age) = self.age {
            user.age = Some(age);
        }
    }
}

/// A partial update of a [`Post`]. Only fields that are `Some` overwrite the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl PostPatch {
    pub(crate) fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(body) = self.body {
            post.body = Some(body);
        }
    }
}

/// One hit of a text search. Each variant carries its own record, so the GraphQL type of a hit
/// is decided by matching on the variant.
#[derive(Clone, Debug, GraphQLUnion, PartialEq)]
#[graphql(context = GraphQLContext)]
pub enum SearchResult {
    User(User),
    Post(Post),
}

#[cfg(test)]
mod tests {
    use super::{User, UserPatch};

    fn fong() -> User {
        User {
            id: 1,
            email: "fong@test.com".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            name: Some("Fong".to_string()),
            age: Some(23),
            height: Some(170.0),
            weight: Some(80.6),
            friend_ids: vec![2, 3],
        }
    }

    /// Passes if a patch touching only the name leaves every other field as it was
    #[test]
    fn patch_name_only() {
        let mut u = fong();
        UserPatch {
            name: Some("X".to_string()),
            ..UserPatch::default()
        }
        .apply(&mut u);

        let mut expected = fong();
        expected.name = Some("X".to_string());
        assert_eq!(u, expected);
    }

    /// Passes if the password hash never shows up in debug output
    #[test]
    fn debug_hides_password_hash() {
        let s = format!("{:?}", fong());
        assert!(s.contains("fong@test.com"));
        assert!(!s.contains("secret"));
    }
}
