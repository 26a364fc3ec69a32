//! The entity store interface. All reads and writes of users and posts go through a [`Store`],
//! so resolvers never touch the underlying collections.

pub mod memory;

use crate::engine::objects::{NewPost, NewUser, Post, PostId, PostPatch, User, UserId, UserPatch};
use crate::error::Error;
use std::fmt::Debug;

/// Owner of the canonical user and post collections.
///
/// Every mutation is visible to subsequent reads as soon as it returns. Implementations must
/// make each method atomic with respect to the others: a read-modify-write such as
/// [`add_friend`] or [`toggle_like`] may not interleave with another writer touching the same
/// records.
///
/// [`add_friend`]: #tymethod.add_friend
/// [`toggle_like`]: #tymethod.toggle_like
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::database::Store;
/// # use socialql::engine::database::memory::MemoryStore;
/// # use socialql::engine::objects::NewUser;
/// # fn main() -> Result<(), socialql::Error> {
/// let store = MemoryStore::new();
/// let user = store.create_user(NewUser {
///     name: Some("Ada".to_string()),
///     email: "ada@example.com".to_string(),
///     password_hash: "$2b$04$...".to_string(),
/// })?;
///
/// assert_eq!(store.user_by_id(user.id)?, Some(user));
/// # Ok(())
/// # }
/// ```
pub trait Store: Debug + Send + Sync {
    /// Returns a snapshot of all users, in id order
    fn users(&self) -> Result<Vec<User>, Error>;

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, Error>;

    fn user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Returns the first user whose name equals `name`
    fn user_by_name(&self, name: &str) -> Result<Option<User>, Error>;

    /// Returns the users with the given ids, in the order of `ids`. Ids with no matching user
    /// are skipped.
    fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, Error>;

    /// Registers a user under an id greater than any id assigned before.
    ///
    /// # Errors
    ///
    /// Returns [`EmailDuplicated`] if the email already belongs to a user.
    ///
    /// [`EmailDuplicated`]: ../../enum.Error.html#variant.EmailDuplicated
    fn create_user(&self, user: NewUser) -> Result<User, Error>;

    /// Merges the provided fields of `patch` into a user and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`UserNotFound`] if no user has the id `id`.
    ///
    /// [`UserNotFound`]: ../../enum.Error.html#variant.UserNotFound
    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, Error>;

    /// Makes `user_id` and `friend_id` friends of each other and returns the updated user
    /// `user_id`.
    ///
    /// # Errors
    ///
    /// * [`UserNotFound`] - if either user does not exist
    /// * [`FriendDuplicated`] - if the two are already friends
    /// * [`FriendInvalid`] - if both ids are the same
    ///
    /// [`UserNotFound`]: ../../enum.Error.html#variant.UserNotFound
    /// [`FriendDuplicated`]: ../../enum.Error.html#variant.FriendDuplicated
    /// [`FriendInvalid`]: ../../enum.Error.html#variant.FriendInvalid
    fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<User, Error>;

    /// Returns a snapshot of all posts, in id order
    fn posts(&self) -> Result<Vec<Post>, Error>;

    fn post_by_id(&self, id: PostId) -> Result<Option<Post>, Error>;

    fn posts_by_author(&self, author_id: UserId) -> Result<Vec<Post>, Error>;

    /// Stores a new post under an id greater than any id assigned before, with no likes and the
    /// current time as its creation time
    fn create_post(&self, post: NewPost) -> Result<Post, Error>;

    /// Merges the provided fields of `patch` into a post and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`PostNotFound`] if no post has the id `id`.
    ///
    /// [`PostNotFound`]: ../../enum.Error.html#variant.PostNotFound
    fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post, Error>;

    /// Adds `user_id` to the likers of a post if absent, removes it otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PostNotFound`] if no post has the id `post_id`.
    ///
    /// [`PostNotFound`]: ../../enum.Error.html#variant.PostNotFound
    fn toggle_like(&self, post_id: PostId, user_id: UserId) -> Result<Post, Error>;

    /// Removes a post and returns it. References to the post elsewhere are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`PostNotFound`] if no post has the id `id`.
    ///
    /// [`PostNotFound`]: ../../enum.Error.html#variant.PostNotFound
    fn delete_post(&self, id: PostId) -> Result<Post, Error>;

    /// Removes a post and returns it, provided `author_id` wrote it. The author check and the
    /// removal happen as one step.
    ///
    /// # Errors
    ///
    /// * [`PostNotFound`] - if no post has the id `id`
    /// * [`NotPostAuthor`] - if the post was written by someone else
    ///
    /// [`PostNotFound`]: ../../enum.Error.html#variant.PostNotFound
    /// [`NotPostAuthor`]: ../../enum.Error.html#variant.NotPostAuthor
    fn delete_post_by_author(&self, id: PostId, author_id: UserId) -> Result<Post, Error>;
}
