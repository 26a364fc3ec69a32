//! Provides the in-process [`Store`] implementation. State lives only as long as the process.
//!
//! [`Store`]: ../trait.Store.html

use crate::engine::config::Seed;
use crate::engine::database::Store;
use crate::engine::objects::{NewPost, NewUser, Post, PostId, PostPatch, User, UserId, UserPatch};
use crate::error::Error;
use chrono::Utc;
use log::{debug, trace};
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    // Highest ids ever assigned. Deletion never lowers them.
    last_user_id: UserId,
    last_post_id: PostId,
}

impl Tables {
    fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut User, Error> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(Error::UserNotFound { id })
    }

    fn post_mut(&mut self, id: PostId) -> Result<&mut Post, Error> {
        self.posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::PostNotFound { id })
    }

    fn next_user_id(&mut self) -> UserId {
        self.last_user_id += 1;
        self.last_user_id
    }

    fn next_post_id(&mut self) -> PostId {
        self.last_post_id += 1;
        self.last_post_id
    }
}

/// A [`Store`] keeping users and posts in memory behind a single reader-writer lock. Each
/// method holds the lock for its whole duration, which makes every read-modify-write atomic.
///
/// [`Store`]: ../trait.Store.html
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::database::Store;
/// # use socialql::engine::database::memory::MemoryStore;
/// # fn main() -> Result<(), socialql::Error> {
/// let store = MemoryStore::tutorial()?;
///
/// assert_eq!(store.users()?.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Creates a store holding the records of `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedItemDuplicated`] if two users share an id or an email, or two posts share
    /// an id.
    ///
    /// [`SeedItemDuplicated`]: ../../../enum.Error.html#variant.SeedItemDuplicated
    pub fn from_seed(seed: Seed) -> Result<MemoryStore, Error> {
        let mut user_ids = HashSet::new();
        let mut emails = HashSet::new();
        for u in &seed.users {
            if !user_ids.insert(u.id) {
                return Err(Error::SeedItemDuplicated {
                    item: format!("user id {}", u.id),
                });
            }
            if !emails.insert(u.email.as_str()) {
                return Err(Error::SeedItemDuplicated {
                    item: format!("user email {}", u.email),
                });
            }
        }

        let mut post_ids = HashSet::new();
        for p in &seed.posts {
            if !post_ids.insert(p.id) {
                return Err(Error::SeedItemDuplicated {
                    item: format!("post id {}", p.id),
                });
            }
        }

        debug!(
            "MemoryStore::from_seed -- users: {} | posts: {}",
            seed.users.len(),
            seed.posts.len()
        );

        let last_user_id = seed.users.iter().map(|u| u.id).max().unwrap_or(0);
        let last_post_id = seed.posts.iter().map(|p| p.id).max().unwrap_or(0);

        Ok(MemoryStore {
            tables: RwLock::new(Tables {
                users: seed.users,
                posts: seed.posts,
                last_user_id,
                last_post_id,
            }),
        })
    }

    /// Creates a store holding the tutorial data set: three users, Fong, Kevin and Mary, each
    /// with the password `123456`, and two posts.
    pub fn tutorial() -> Result<MemoryStore, Error> {
        MemoryStore::from_seed(Seed::tutorial()?)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, Error> {
        self.tables.read().map_err(|_| Error::StoreLockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, Error> {
        self.tables.write().map_err(|_| Error::StoreLockPoisoned)
    }
}

impl Store for MemoryStore {
    fn users(&self) -> Result<Vec<User>, Error> {
        Ok(self.read()?.users.clone())
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, Error> {
        Ok(self.read()?.user(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    fn user_by_name(&self, name: &str) -> Result<Option<User>, Error> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.name.as_deref() == Some(name))
            .cloned())
    }

    fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, Error> {
        let tables = self.read()?;
        Ok(ids.iter().filter_map(|id| tables.user(*id).cloned()).collect())
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-create-user", skip(self))]
    fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.write()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(Error::EmailDuplicated { email: user.email });
        }

        let id = tables.next_user_id();
        let created = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            age: None,
            height: None,
            weight: None,
            friend_ids: Vec::new(),
        };
        tables.users.push(created.clone());

        trace!("MemoryStore::create_user -- created: {:?}", created);
        Ok(created)
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-update-user", skip(self))]
    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, Error> {
        let mut tables = self.write()?;
        let user = tables.user_mut(id)?;
        patch.apply(user);
        Ok(user.clone())
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-add-friend", skip(self))]
    fn add_friend(&self, user_id: UserId, friend_id: UserId) -> Result<User, Error> {
        if user_id == friend_id {
            return Err(Error::FriendInvalid { user_id });
        }

        let mut tables = self.write()?;
        if tables.user(friend_id).is_none() {
            return Err(Error::UserNotFound { id: friend_id });
        }

        let me = tables.user_mut(user_id)?;
        if me.is_friend_of(friend_id) {
            return Err(Error::FriendDuplicated { user_id: friend_id });
        }
        me.friend_ids.push(friend_id);
        let updated = me.clone();

        let friend = tables.user_mut(friend_id)?;
        if !friend.is_friend_of(user_id) {
            friend.friend_ids.push(user_id);
        }

        Ok(updated)
    }

    fn posts(&self) -> Result<Vec<Post>, Error> {
        Ok(self.read()?.posts.clone())
    }

    fn post_by_id(&self, id: PostId) -> Result<Option<Post>, Error> {
        Ok(self.read()?.posts.iter().find(|p| p.id == id).cloned())
    }

    fn posts_by_author(&self, author_id: UserId) -> Result<Vec<Post>, Error> {
        Ok(self
            .read()?
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect())
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-create-post", skip(self))]
    fn create_post(&self, post: NewPost) -> Result<Post, Error> {
        let mut tables = self.write()?;
        let id = tables.next_post_id();
        let created = Post {
            id,
            author_id: post.author_id,
            title: post.title,
            body: post.body,
            like_giver_ids: Vec::new(),
            created_at: Utc::now(),
        };
        tables.posts.push(created.clone());

        trace!("MemoryStore::create_post -- created: {:?}", created);
        Ok(created)
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-update-post", skip(self))]
    fn update_post(&self, id: PostId, patch: PostPatch) -> Result<Post, Error> {
        let mut tables = self.write()?;
        let post = tables.post_mut(id)?;
        patch.apply(post);
        Ok(post.clone())
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-toggle-like", skip(self))]
    fn toggle_like(&self, post_id: PostId, user_id: UserId) -> Result<Post, Error> {
        let mut tables = self.write()?;
        let post = tables.post_mut(post_id)?;
        if post.is_liked_by(user_id) {
            post.like_giver_ids.retain(|id| *id != user_id);
        } else {
            post.like_giver_ids.push(user_id);
        }
        Ok(post.clone())
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-delete-post", skip(self))]
    fn delete_post(&self, id: PostId) -> Result<Post, Error> {
        let mut tables = self.write()?;
        let index = tables
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::PostNotFound { id })?;
        Ok(tables.posts.remove(index))
    }

    #[tracing::instrument(level = "debug", name = "sq-memory-delete-post-by-author", skip(self))]
    fn delete_post_by_author(&self, id: PostId, author_id: UserId) -> Result<Post, Error> {
        let mut tables = self.write()?;
        let index = tables
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::PostNotFound { id })?;
        if tables.posts[index].author_id != author_id {
            return Err(Error::NotPostAuthor { post_id: id });
        }
        Ok(tables.posts.remove(index))
    }
}
