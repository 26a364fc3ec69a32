//! Middleware wrapped around operation handlers. A chain is fixed per operation when the
//! [`Dispatcher`] is built; each link may reject the call before the handler runs, or rewrite
//! the outcome afterwards.
//!
//! [`Dispatcher`]: ../dispatch/struct.Dispatcher.html

use crate::engine::auth::{require_authenticated, require_ownership, Identity};
use crate::engine::database::Store;
use crate::engine::dispatch::{Operation, Outcome};
use crate::error::Error;
use log::trace;
use std::fmt::Debug;

/// What a middleware sees of a call: the operation with its arguments, the caller, and the
/// store
#[derive(Debug)]
pub struct Request<'a> {
    pub operation: &'a Operation,
    pub identity: Option<&'a Identity>,
    pub store: &'a dyn Store,
}

/// A link in an operation's middleware chain. Both hooks default to passing the call through.
///
/// `before` hooks run in chain order before the handler; the first error aborts the call.
/// `after` hooks run in reverse chain order on the handler's outcome.
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::dispatch::Outcome;
/// # use socialql::engine::middleware::{Middleware, Request};
/// # use socialql::Error;
/// #[derive(Debug)]
/// struct Exclaim;
///
/// impl Middleware for Exclaim {
///     fn after(&self, _request: &Request<'_>, outcome: Outcome) -> Result<Outcome, Error> {
///         match outcome {
///             Outcome::Text(s) => Ok(Outcome::Text(s + "!")),
///             other => Ok(other),
///         }
///     }
/// }
/// ```
pub trait Middleware: Debug + Send + Sync {
    fn before(&self, _request: &Request<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn after(&self, _request: &Request<'_>, outcome: Outcome) -> Result<Outcome, Error> {
        Ok(outcome)
    }
}

/// Rejects calls that carry no identity with [`LoginRequired`]
///
/// [`LoginRequired`]: ../../enum.Error.html#variant.LoginRequired
#[derive(Clone, Debug, Default)]
pub struct RequireAuthenticated;

impl Middleware for RequireAuthenticated {
    fn before(&self, request: &Request<'_>) -> Result<(), Error> {
        require_authenticated(request.identity).map(|_| ())
    }
}

/// Rejects calls on a post unless the caller wrote it. Fails with [`PostNotFound`] if the
/// post does not exist and [`NotPostAuthor`] if the caller is someone else.
///
/// [`PostNotFound`]: ../../enum.Error.html#variant.PostNotFound
/// [`NotPostAuthor`]: ../../enum.Error.html#variant.NotPostAuthor
#[derive(Clone, Debug, Default)]
pub struct RequireAuthor;

impl Middleware for RequireAuthor {
    fn before(&self, request: &Request<'_>) -> Result<(), Error> {
        let post_id = request.operation.post_id().ok_or(Error::TypeNotExpected)?;
        let identity = require_authenticated(request.identity)?;
        let post = request
            .store
            .post_by_id(post_id)?
            .ok_or(Error::PostNotFound { id: post_id })?;

        trace!(
            "RequireAuthor::before -- post: {} | author: {} | caller: {}",
            post.id,
            post.author_id,
            identity.id
        );
        require_ownership(identity, &post)
    }
}

/// Upper-cases text outcomes and leaves all others alone
#[derive(Clone, Debug, Default)]
pub struct UpperCase;

impl Middleware for UpperCase {
    fn after(&self, _request: &Request<'_>, outcome: Outcome) -> Result<Outcome, Error> {
        match outcome {
            Outcome::Text(s) => Ok(Outcome::Text(s.to_uppercase())),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Middleware, Request, RequireAuthenticated, RequireAuthor, UpperCase};
    use crate::engine::auth::Identity;
    use crate::engine::database::memory::MemoryStore;
    use crate::engine::dispatch::{Operation, Outcome};
    use crate::error::Error;

    fn kevin() -> Identity {
        Identity {
            id: 2,
            email: "kevin@test.com".to_string(),
            name: Some("Kevin".to_string()),
        }
    }

    /// Passes if an anonymous call is stopped and a signed-in one is let through
    #[test]
    fn require_authenticated() {
        let store = MemoryStore::tutorial().unwrap();
        let op = Operation::GetCurrentUser;
        let anonymous = Request {
            operation: &op,
            identity: None,
            store: &store,
        };
        assert!(matches!(
            RequireAuthenticated.before(&anonymous).unwrap_err(),
            Error::LoginRequired
        ));

        let me = kevin();
        let signed_in = Request {
            operation: &op,
            identity: Some(&me),
            store: &store,
        };
        assert!(RequireAuthenticated.before(&signed_in).is_ok());
    }

    /// Passes if the author check distinguishes missing posts, other authors and the author
    #[test]
    fn require_author() {
        let store = MemoryStore::tutorial().unwrap();
        let me = kevin();

        let missing = Operation::DeletePost { post_id: 9 };
        let r = Request {
            operation: &missing,
            identity: Some(&me),
            store: &store,
        };
        assert!(matches!(
            RequireAuthor.before(&r).unwrap_err(),
            Error::PostNotFound { id: 9 }
        ));

        let fongs = Operation::DeletePost { post_id: 1 };
        let r = Request {
            operation: &fongs,
            identity: Some(&me),
            store: &store,
        };
        assert!(matches!(
            RequireAuthor.before(&r).unwrap_err(),
            Error::NotPostAuthor { post_id: 1 }
        ));

        let mine = Operation::DeletePost { post_id: 2 };
        let r = Request {
            operation: &mine,
            identity: Some(&me),
            store: &store,
        };
        assert!(RequireAuthor.before(&r).is_ok());
    }

    /// Passes if text is upper-cased and other outcomes are untouched
    #[test]
    fn upper_case() {
        let store = MemoryStore::new();
        let op = Operation::Hello;
        let r = Request {
            operation: &op,
            identity: None,
            store: &store,
        };

        assert_eq!(
            UpperCase
                .after(&r, Outcome::Text("Hello world!".to_string()))
                .unwrap(),
            Outcome::Text("HELLO WORLD!".to_string())
        );
        assert_eq!(
            UpperCase.after(&r, Outcome::Users(Vec::new())).unwrap(),
            Outcome::Users(Vec::new())
        );
    }
}
