//! The GraphQL schema: object types for users and posts, the input objects, and the Query and
//! Mutation roots. Root fields turn their arguments into an [`Operation`] and hand it to the
//! dispatcher; nested fields resolve through the resolver functions.
//!
//! [`Operation`]: ../dispatch/enum.Operation.html

use crate::engine::auth::{Password, Token};
use crate::engine::context::GraphQLContext;
use crate::engine::dispatch::Operation;
use crate::engine::objects::{Post, SearchResult, User};
use crate::engine::resolvers::{self, HeightUnit, WeightUnit};
use crate::error::Error;
use chrono::{DateTime, Datelike, Utc, Weekday};
use juniper::{
    graphql_interface, graphql_object, EmptySubscription, GraphQLInputObject, RootNode, ID,
};
use std::sync::Arc;

/// Parses a GraphQL `ID` into a store id
pub(crate) fn parse_id(id: &ID) -> Result<u32, Error> {
    id.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::IdMalformed { id: id.to_string() })
}

/// Anything stored under an id of its own
#[graphql_interface(for = [User, Post], context = GraphQLContext)]
pub trait Node {
    fn id(&self) -> ID;
}

#[graphql_object(context = GraphQLContext, impl = NodeValue)]
impl User {
    fn id(&self) -> ID {
        ID::from(self.id.to_string())
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn age(&self) -> Option<i32> {
        self.age
    }

    /// Height, in centimetres unless another unit is asked for
    fn height(
        &self,
        #[graphql(default = HeightUnit::Centimetre)] unit: HeightUnit,
    ) -> Option<f64> {
        resolvers::height(self, unit)
    }

    /// Weight, in kilograms unless another unit is asked for
    fn weight(&self, #[graphql(default = WeightUnit::Kilogram)] unit: WeightUnit) -> Option<f64> {
        resolvers::weight(self, unit)
    }

    fn friends(&self, context: &GraphQLContext) -> Result<Vec<User>, Error> {
        resolvers::friends(context.dispatcher().store(), self)
    }

    fn posts(&self, context: &GraphQLContext) -> Result<Vec<Post>, Error> {
        resolvers::posts_by_author(context.dispatcher().store(), self)
    }
}

#[graphql_object(context = GraphQLContext, impl = NodeValue)]
impl Post {
    fn id(&self) -> ID {
        ID::from(self.id.to_string())
    }

    fn author(&self, context: &GraphQLContext) -> Result<Option<User>, Error> {
        resolvers::author(context.dispatcher().store(), self)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn like_givers(&self, context: &GraphQLContext) -> Result<Vec<User>, Error> {
        resolvers::like_givers(context.dispatcher().store(), self)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Fields of the signed-in user that may be changed. Omitted fields are left as they are.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct UpdateMyInfoInput {
    pub name: Option<String>,
    pub age: Option<i32>,
}

#[derive(Clone, Debug, GraphQLInputObject)]
pub struct AddPostInput {
    pub title: String,
    pub body: Option<String>,
}

pub struct Query;

#[graphql_object(context = GraphQLContext)]
impl Query {
    async fn hello(context: &GraphQLContext) -> Result<String, Error> {
        context.dispatch(Operation::Hello).await?.into_text()
    }

    #[graphql(name = "_version")]
    fn version(context: &GraphQLContext) -> Option<&str> {
        context.version().map(|v| v.as_str())
    }

    /// The current time, in UTC
    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn is_friday(date: DateTime<Utc>) -> bool {
        date.weekday() == Weekday::Fri
    }

    /// The signed-in user
    async fn me(context: &GraphQLContext) -> Result<Option<User>, Error> {
        context.dispatch(Operation::GetCurrentUser).await?.into_user()
    }

    async fn users(context: &GraphQLContext) -> Result<Vec<User>, Error> {
        context.dispatch(Operation::ListUsers).await?.into_users()
    }

    async fn user(context: &GraphQLContext, name: String) -> Result<Option<User>, Error> {
        context
            .dispatch(Operation::GetUser { name })
            .await?
            .into_user()
    }

    async fn posts(context: &GraphQLContext) -> Result<Vec<Post>, Error> {
        context.dispatch(Operation::ListPosts).await?.into_posts()
    }

    async fn post(context: &GraphQLContext, id: ID) -> Result<Option<Post>, Error> {
        let id = parse_id(&id)?;
        context
            .dispatch(Operation::GetPost { id })
            .await?
            .into_post()
    }

    /// Users whose name contains the text, followed by posts whose title contains it
    /// Every user followed by every post
    async fn nodes(context: &GraphQLContext) -> Result<Vec<NodeValue>, Error> {
        let users = context.dispatch(Operation::ListUsers).await?.into_users()?;
        let posts = context.dispatch(Operation::ListPosts).await?.into_posts()?;

        Ok(users
            .into_iter()
            .map(NodeValue::from)
            .chain(posts.into_iter().map(NodeValue::from))
            .collect())
    }

    async fn search(context: &GraphQLContext, contains: String) -> Result<Vec<SearchResult>, Error> {
        context
            .dispatch(Operation::Search { contains })
            .await?
            .into_results()
    }
}

pub struct Mutation;

#[graphql_object(context = GraphQLContext)]
impl Mutation {
    async fn update_my_info(
        context: &GraphQLContext,
        input: UpdateMyInfoInput,
    ) -> Result<Option<User>, Error> {
        context
            .dispatch(Operation::UpdateCurrentUser {
                name: input.name,
                age: input.age,
            })
            .await?
            .into_user()
    }

    async fn add_friend(context: &GraphQLContext, user_id: ID) -> Result<Option<User>, Error> {
        let user_id = parse_id(&user_id)?;
        context
            .dispatch(Operation::AddFriend { user_id })
            .await?
            .into_user()
    }

    async fn sign_up(
        context: &GraphQLContext,
        name: Option<String>,
        email: String,
        password: String,
    ) -> Result<Option<User>, Error> {
        context
            .dispatch(Operation::SignUp {
                name,
                email,
                password: Password::new(password),
            })
            .await?
            .into_user()
    }

    async fn login(context: &GraphQLContext, email: String, password: String) -> Result<Token, Error> {
        context
            .dispatch(Operation::Login {
                email,
                password: Password::new(password),
            })
            .await?
            .into_token()
    }

    async fn add_post(context: &GraphQLContext, input: AddPostInput) -> Result<Option<Post>, Error> {
        context
            .dispatch(Operation::AddPost {
                title: input.title,
                body: input.body,
            })
            .await?
            .into_post()
    }

    /// Likes the post, or takes the like back if the caller already gave one
    async fn like_post(context: &GraphQLContext, post_id: ID) -> Result<Option<Post>, Error> {
        let post_id = parse_id(&post_id)?;
        context
            .dispatch(Operation::LikePost { post_id })
            .await?
            .into_post()
    }

    async fn delete_post(context: &GraphQLContext, post_id: ID) -> Result<Option<Post>, Error> {
        let post_id = parse_id(&post_id)?;
        context
            .dispatch(Operation::DeletePost { post_id })
            .await?
            .into_post()
    }
}

/// Type alias for the schema root of socialql
pub type RootRef = Arc<RootNode<'static, Query, Mutation, EmptySubscription<GraphQLContext>>>;

/// Creates the root node of the schema
pub fn create_root_node() -> RootRef {
    Arc::new(RootNode::new(Query, Mutation, EmptySubscription::new()))
}

#[cfg(test)]
mod tests {
    use super::parse_id;
    use crate::error::ErrorKind;
    use juniper::ID;

    /// Passes if positive integer ids parse and anything else is refused
    #[test]
    fn ids() {
        assert_eq!(parse_id(&ID::from("7".to_string())).unwrap(), 7);

        for bad in &["0", "-1", "abc", ""] {
            let e = parse_id(&ID::from(bad.to_string())).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::InvalidInput);
        }
    }
}
