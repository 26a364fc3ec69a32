//! Maps each named operation to its handler, behind the middleware chain chosen for that
//! operation when the [`Dispatcher`] is built.
//!
//! [`Dispatcher`]: ./struct.Dispatcher.html

use crate::engine::auth::{require_authenticated, Authenticator, Identity, Password, Token};
use crate::engine::database::Store;
use crate::engine::middleware::{Middleware, Request, RequireAuthenticated, RequireAuthor, UpperCase};
use crate::engine::objects::{NewPost, NewUser, Post, PostId, SearchResult, User, UserId, UserPatch};
use crate::engine::resolvers;
use crate::error::Error;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Names of the operations in the dispatch table
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OperationName {
    Hello,
    GetUser,
    ListUsers,
    GetCurrentUser,
    UpdateCurrentUser,
    AddFriend,
    SignUp,
    Login,
    ListPosts,
    GetPost,
    AddPost,
    LikePost,
    DeletePost,
    Search,
}

/// An operation together with its typed arguments
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Hello,
    GetUser {
        name: String,
    },
    ListUsers,
    GetCurrentUser,
    UpdateCurrentUser {
        name: Option<String>,
        age: Option<i32>,
    },
    AddFriend {
        user_id: UserId,
    },
    SignUp {
        name: Option<String>,
        email: String,
        password: Password,
    },
    Login {
        email: String,
        password: Password,
    },
    ListPosts,
    GetPost {
        id: PostId,
    },
    AddPost {
        title: String,
        body: Option<String>,
    },
    LikePost {
        post_id: PostId,
    },
    DeletePost {
        post_id: PostId,
    },
    Search {
        contains: String,
    },
}

impl Operation {
    pub fn name(&self) -> OperationName {
        match self {
            Operation::Hello => OperationName::Hello,
            Operation::GetUser { .. } => OperationName::GetUser,
            Operation::ListUsers => OperationName::ListUsers,
            Operation::GetCurrentUser => OperationName::GetCurrentUser,
            Operation::UpdateCurrentUser { .. } => OperationName::UpdateCurrentUser,
            Operation::AddFriend { .. } => OperationName::AddFriend,
            Operation::SignUp { .. } => OperationName::SignUp,
            Operation::Login { .. } => OperationName::Login,
            Operation::ListPosts => OperationName::ListPosts,
            Operation::GetPost { .. } => OperationName::GetPost,
            Operation::AddPost { .. } => OperationName::AddPost,
            Operation::LikePost { .. } => OperationName::LikePost,
            Operation::DeletePost { .. } => OperationName::DeletePost,
            Operation::Search { .. } => OperationName::Search,
        }
    }

    /// Returns the post the operation targets, if it targets one
    pub fn post_id(&self) -> Option<PostId> {
        match self {
            Operation::GetPost { id } => Some(*id),
            Operation::LikePost { post_id } | Operation::DeletePost { post_id } => Some(*post_id),
            _ => None,
        }
    }
}

/// The result of a handled operation
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Text(String),
    User(Option<User>),
    Users(Vec<User>),
    Post(Option<Post>),
    Posts(Vec<Post>),
    Token(Token),
    Results(Vec<SearchResult>),
}

impl Outcome {
    pub fn into_text(self) -> Result<String, Error> {
        match self {
            Outcome::Text(s) => Ok(s),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_user(self) -> Result<Option<User>, Error> {
        match self {
            Outcome::User(u) => Ok(u),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_users(self) -> Result<Vec<User>, Error> {
        match self {
            Outcome::Users(v) => Ok(v),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_post(self) -> Result<Option<Post>, Error> {
        match self {
            Outcome::Post(p) => Ok(p),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_posts(self) -> Result<Vec<Post>, Error> {
        match self {
            Outcome::Posts(v) => Ok(v),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_token(self) -> Result<Token, Error> {
        match self {
            Outcome::Token(t) => Ok(t),
            _ => Err(Error::TypeNotExpected),
        }
    }

    pub fn into_results(self) -> Result<Vec<SearchResult>, Error> {
        match self {
            Outcome::Results(v) => Ok(v),
            _ => Err(Error::TypeNotExpected),
        }
    }
}

/// Runs operations against the store. The dispatcher holds no per-call state, so one instance
/// is shared by every request.
///
/// The default table guards `GetCurrentUser`, `UpdateCurrentUser`, `AddFriend`, `AddPost` and
/// `LikePost` with [`RequireAuthenticated`], guards `DeletePost` with
/// [`RequireAuthenticated`] then [`RequireAuthor`], and passes `Hello` through [`UpperCase`].
///
/// [`RequireAuthenticated`]: ../middleware/struct.RequireAuthenticated.html
/// [`RequireAuthor`]: ../middleware/struct.RequireAuthor.html
/// [`UpperCase`]: ../middleware/struct.UpperCase.html
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<dyn Store>,
    auth: Arc<Authenticator>,
    table: HashMap<OperationName, Vec<Arc<dyn Middleware>>>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, auth: Arc<Authenticator>) -> Dispatcher {
        let authenticated: Arc<dyn Middleware> = Arc::new(RequireAuthenticated);
        let mut table: HashMap<OperationName, Vec<Arc<dyn Middleware>>> = HashMap::new();

        for name in &[
            OperationName::GetCurrentUser,
            OperationName::UpdateCurrentUser,
            OperationName::AddFriend,
            OperationName::AddPost,
            OperationName::LikePost,
        ] {
            table.insert(*name, vec![authenticated.clone()]);
        }
        table.insert(
            OperationName::DeletePost,
            vec![authenticated, Arc::new(RequireAuthor)],
        );
        table.insert(OperationName::Hello, vec![Arc::new(UpperCase)]);

        Dispatcher { store, auth, table }
    }

    /// Appends `middleware` to the chain of operation `name`
    pub fn with_middleware(mut self, name: OperationName, middleware: Arc<dyn Middleware>) -> Self {
        self.table.entry(name).or_insert_with(Vec::new).push(middleware);
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    /// Runs `operation` on behalf of `identity`: the chain's `before` hooks in order, then the
    /// handler, then the chain's `after` hooks in reverse order.
    pub async fn dispatch(
        &self,
        operation: Operation,
        identity: Option<&Identity>,
    ) -> Result<Outcome, Error> {
        debug!(
            "Dispatcher::dispatch called -- operation: {:?} | caller: {:?}",
            operation.name(),
            identity.map(|i| i.id)
        );

        let chain = self
            .table
            .get(&operation.name())
            .map(|c| c.as_slice())
            .unwrap_or(&[]);
        let request = Request {
            operation: &operation,
            identity,
            store: self.store(),
        };

        for middleware in chain {
            middleware.before(&request)?;
        }

        let mut outcome = self.handle(&operation, identity).await?;

        for middleware in chain.iter().rev() {
            outcome = middleware.after(&request, outcome)?;
        }

        Ok(outcome)
    }

    async fn handle(
        &self,
        operation: &Operation,
        identity: Option<&Identity>,
    ) -> Result<Outcome, Error> {
        let store = self.store();

        match operation {
            Operation::Hello => Ok(Outcome::Text("Hello world!".to_string())),
            Operation::GetUser { name } => Ok(Outcome::User(store.user_by_name(name)?)),
            Operation::ListUsers => Ok(Outcome::Users(store.users()?)),
            Operation::GetCurrentUser => {
                let me = require_authenticated(identity)?;
                Ok(Outcome::User(store.user_by_id(me.id)?))
            }
            Operation::UpdateCurrentUser { name, age } => {
                let me = require_authenticated(identity)?;
                let patch = UserPatch {
                    name: name.clone(),
                    age: *age,
                    ..UserPatch::default()
                };
                Ok(Outcome::User(Some(store.update_user(me.id, patch)?)))
            }
            Operation::AddFriend { user_id } => {
                let me = require_authenticated(identity)?;
                Ok(Outcome::User(Some(store.add_friend(me.id, *user_id)?)))
            }
            Operation::SignUp {
                name,
                email,
                password,
            } => {
                if store.user_by_email(email)?.is_some() {
                    return Err(Error::EmailDuplicated {
                        email: email.clone(),
                    });
                }
                let password_hash = self.auth.hash_password(password).await?;
                let user = store.create_user(NewUser {
                    name: name.clone(),
                    email: email.clone(),
                    password_hash,
                })?;
                Ok(Outcome::User(Some(user)))
            }
            Operation::Login { email, password } => {
                // An unknown email still pays for a full bcrypt verification.
                let user = store.user_by_email(email)?;
                let hash = match &user {
                    Some(u) => u.password_hash(),
                    None => self.auth.decoy_hash(),
                };
                let verified = self.auth.verify_password(password, hash).await?;

                match user {
                    Some(user) if verified => Ok(Outcome::Token(self.auth.issue_token(&user)?)),
                    _ => Err(Error::CredentialsInvalid),
                }
            }
            Operation::ListPosts => Ok(Outcome::Posts(store.posts()?)),
            Operation::GetPost { id } => Ok(Outcome::Post(store.post_by_id(*id)?)),
            Operation::AddPost { title, body } => {
                let me = require_authenticated(identity)?;
                let post = store.create_post(NewPost {
                    author_id: me.id,
                    title: title.clone(),
                    body: body.clone(),
                })?;
                Ok(Outcome::Post(Some(post)))
            }
            Operation::LikePost { post_id } => {
                let me = require_authenticated(identity)?;
                Ok(Outcome::Post(Some(store.toggle_like(*post_id, me.id)?)))
            }
            Operation::DeletePost { post_id } => {
                let me = require_authenticated(identity)?;
                Ok(Outcome::Post(Some(
                    store.delete_post_by_author(*post_id, me.id)?,
                )))
            }
            Operation::Search { contains } => {
                Ok(Outcome::Results(resolvers::search(store, contains)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, Operation, OperationName, Outcome};
    use crate::engine::auth::{Authenticator, Identity, Password};
    use crate::engine::config::AuthConfig;
    use crate::engine::database::memory::MemoryStore;
    use crate::engine::middleware::{Middleware, Request};
    use crate::error::{Error, ErrorKind};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn dispatcher() -> Dispatcher {
        let auth = Authenticator::new(&AuthConfig {
            secret: Some("test-secret".to_string()),
            token_ttl_secs: 60,
            hash_cost: 4,
        })
        .unwrap();
        Dispatcher::new(Arc::new(MemoryStore::tutorial().unwrap()), Arc::new(auth))
    }

    fn identity(id: u32) -> Identity {
        Identity {
            id,
            email: format!("user{}@test.com", id),
            name: None,
        }
    }

    /// Passes if the greeting comes back upper-cased
    #[tokio::test]
    async fn hello() {
        init();
        let d = dispatcher();
        let s = d
            .dispatch(Operation::Hello, None)
            .await
            .unwrap()
            .into_text()
            .unwrap();
        assert_eq!(s, "HELLO WORLD!");
    }

    /// Passes if guarded operations refuse anonymous callers before touching the store
    #[tokio::test]
    async fn guarded_without_identity() {
        init();
        let d = dispatcher();

        for op in vec![
            Operation::GetCurrentUser,
            Operation::AddFriend { user_id: 3 },
            Operation::AddPost {
                title: "t".to_string(),
                body: None,
            },
            Operation::LikePost { post_id: 1 },
            Operation::DeletePost { post_id: 1 },
        ] {
            let e = d.dispatch(op, None).await.unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Forbidden);
            assert_eq!(e.to_string(), "Not logged in.");
        }
        assert_eq!(d.store().posts().unwrap().len(), 2);
    }

    /// Passes if updating the current user changes name and age and nothing else
    #[tokio::test]
    async fn update_current_user() {
        init();
        let d = dispatcher();
        let before = d.store().user_by_id(1).unwrap().unwrap();

        let after = d
            .dispatch(
                Operation::UpdateCurrentUser {
                    name: None,
                    age: Some(24),
                },
                Some(&identity(1)),
            )
            .await
            .unwrap()
            .into_user()
            .unwrap()
            .unwrap();

        assert_eq!(after.age, Some(24));
        assert_eq!(after.name, before.name);
        assert_eq!(after.friend_ids, before.friend_ids);
        assert_eq!(after.height, before.height);
    }

    /// Passes if sign up then login yields a token for the new user, and a repeated email is
    /// refused
    #[tokio::test]
    async fn sign_up_then_login() {
        init();
        let d = dispatcher();

        let user = d
            .dispatch(
                Operation::SignUp {
                    name: Some("Dora".to_string()),
                    email: "dora@test.com".to_string(),
                    password: Password::new("secret".to_string()),
                },
                None,
            )
            .await
            .unwrap()
            .into_user()
            .unwrap()
            .unwrap();
        assert_eq!(user.id, 4);
        assert_ne!(user.password_hash(), "secret");

        let token = d
            .dispatch(
                Operation::Login {
                    email: "dora@test.com".to_string(),
                    password: Password::new("secret".to_string()),
                },
                None,
            )
            .await
            .unwrap()
            .into_token()
            .unwrap();
        assert_eq!(d.auth().verify_token(&token.token).unwrap().id, 4);

        let e = d
            .dispatch(
                Operation::SignUp {
                    name: None,
                    email: "dora@test.com".to_string(),
                    password: Password::new("other".to_string()),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(e, Error::EmailDuplicated { .. }));
    }

    /// Passes if an unknown email and a wrong password fail identically
    #[tokio::test]
    async fn login_failures_match() {
        init();
        let d = dispatcher();

        let unknown = d
            .dispatch(
                Operation::Login {
                    email: "nobody@test.com".to_string(),
                    password: Password::new("123456".to_string()),
                },
                None,
            )
            .await
            .unwrap_err();
        let wrong = d
            .dispatch(
                Operation::Login {
                    email: "fong@test.com".to_string(),
                    password: Password::new("654321".to_string()),
                },
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.kind(), ErrorKind::Authentication);
        assert_eq!(wrong.kind(), ErrorKind::Authentication);
    }

    /// Passes if only the author may delete a post, and a deleted post is gone
    #[tokio::test]
    async fn delete_post_ownership() {
        init();
        let d = dispatcher();

        let e = d
            .dispatch(Operation::DeletePost { post_id: 1 }, Some(&identity(2)))
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let removed = d
            .dispatch(Operation::DeletePost { post_id: 1 }, Some(&identity(1)))
            .await
            .unwrap()
            .into_post()
            .unwrap()
            .unwrap();
        assert_eq!(removed.id, 1);

        let gone = d
            .dispatch(Operation::GetPost { id: 1 }, None)
            .await
            .unwrap()
            .into_post()
            .unwrap();
        assert!(gone.is_none());

        let e = d
            .dispatch(Operation::DeletePost { post_id: 1 }, Some(&identity(1)))
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    /// Passes if the delete handler itself refuses a non-author when no middleware guards it
    #[tokio::test]
    async fn delete_post_handler_checks_author() {
        init();
        let d = dispatcher();
        let bare = Dispatcher {
            store: d.store.clone(),
            auth: d.auth.clone(),
            table: HashMap::new(),
        };

        let e = bare
            .dispatch(Operation::DeletePost { post_id: 1 }, Some(&identity(2)))
            .await
            .unwrap_err();
        assert!(matches!(e, Error::NotPostAuthor { post_id: 1 }));
        assert!(bare.store().post_by_id(1).unwrap().is_some());

        let e = bare
            .dispatch(Operation::DeletePost { post_id: 1 }, None)
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Forbidden);
        assert!(bare.store().post_by_id(1).unwrap().is_some());
    }

    /// Passes if a post added after the newest one is deleted never takes over its id
    #[tokio::test]
    async fn deleted_post_id_not_reused() {
        init();
        let d = dispatcher();
        let add = |title: &str| Operation::AddPost {
            title: title.to_string(),
            body: None,
        };

        let mary = d
            .dispatch(add("mine"), Some(&identity(3)))
            .await
            .unwrap()
            .into_post()
            .unwrap()
            .unwrap();
        d.dispatch(Operation::DeletePost { post_id: mary.id }, Some(&identity(3)))
            .await
            .unwrap();

        let kevin = d
            .dispatch(add("theirs"), Some(&identity(2)))
            .await
            .unwrap()
            .into_post()
            .unwrap()
            .unwrap();
        assert!(kevin.id > mary.id);

        let e = d
            .dispatch(Operation::DeletePost { post_id: mary.id }, Some(&identity(3)))
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert!(d.store().post_by_id(kevin.id).unwrap().is_some());
    }

    /// Passes if liking twice restores the original like list
    #[tokio::test]
    async fn like_toggles() {
        init();
        let d = dispatcher();
        let me = identity(3);

        let liked = d
            .dispatch(Operation::LikePost { post_id: 1 }, Some(&me))
            .await
            .unwrap()
            .into_post()
            .unwrap()
            .unwrap();
        assert_eq!(liked.like_giver_ids, vec![1, 2, 3]);

        let unliked = d
            .dispatch(Operation::LikePost { post_id: 1 }, Some(&me))
            .await
            .unwrap()
            .into_post()
            .unwrap()
            .unwrap();
        assert_eq!(unliked.like_giver_ids, vec![1, 2]);
    }

    #[derive(Debug)]
    struct Deny;

    impl Middleware for Deny {
        fn before(&self, _request: &Request<'_>) -> Result<(), Error> {
            Err(Error::LoginRequired)
        }
    }

    /// Passes if an added middleware joins the chain of its operation only
    #[tokio::test]
    async fn with_middleware() {
        init();
        let d = dispatcher().with_middleware(OperationName::ListUsers, Arc::new(Deny));

        assert!(d.dispatch(Operation::ListUsers, None).await.is_err());
        assert!(matches!(
            d.dispatch(Operation::ListPosts, None).await.unwrap(),
            Outcome::Posts(_)
        ));
    }

    /// Passes if asking an outcome for the wrong shape is reported
    #[test]
    fn outcome_mismatch() {
        assert!(matches!(
            Outcome::Text("x".to_string()).into_users().unwrap_err(),
            Error::TypeNotExpected
        ));
    }
}
