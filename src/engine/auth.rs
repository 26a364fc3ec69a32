//! Session tokens, password hashing, and the authentication and ownership checks that guard
//! operations.

use crate::engine::config::AuthConfig;
use crate::engine::objects::{Post, User, UserId};
use crate::error::Error;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use juniper::GraphQLObject;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// The caller of a request, as recovered from a verified token
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    id: UserId,
    email: String,
    name: Option<String>,
    iat: u64,
    exp: u64,
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Identity {
            id: c.id,
            email: c.email,
            name: c.name,
        }
    }
}

/// A signed session token, handed out by `login`
#[derive(Clone, Debug, GraphQLObject, PartialEq)]
pub struct Token {
    pub token: String,
}

/// A plaintext password. Never printed.
#[derive(Clone, PartialEq)]
pub struct Password(String);

impl Password {
    pub fn new(plain: String) -> Password {
        Password(plain)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl From<String> for Password {
    fn from(plain: String) -> Self {
        Password(plain)
    }
}

/// Issues and verifies HS256 session tokens, and hashes and checks passwords with bcrypt.
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::auth::Authenticator;
/// # use socialql::engine::config::AuthConfig;
/// # fn main() -> Result<(), socialql::Error> {
/// let auth = Authenticator::new(&AuthConfig {
///     secret: Some("not-for-production".to_string()),
///     ..AuthConfig::default()
/// })?;
///
/// assert!(auth.verify_token("not.a.token").is_err());
/// # Ok(())
/// # }
/// ```
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl_secs: u64,
    hash_cost: u32,
    // Checked in place of a stored hash when a login names no known user.
    decoy_hash: String,
}

impl Authenticator {
    /// Creates an authenticator from the auth section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigItemInvalid`] error if no secret is configured, or
    /// [`PasswordHashFailed`] if the configured hash cost is rejected by bcrypt.
    ///
    /// [`ConfigItemInvalid`]: ../../enum.Error.html#variant.ConfigItemInvalid
    /// [`PasswordHashFailed`]: ../../enum.Error.html#variant.PasswordHashFailed
    pub fn new(config: &AuthConfig) -> Result<Authenticator, Error> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::ConfigItemInvalid {
                name: "auth.secret".to_string(),
                message: "a non-empty secret is required".to_string(),
            })?;

        Ok(Authenticator {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            token_ttl_secs: config.token_ttl_secs,
            hash_cost: config.hash_cost,
            decoy_hash: bcrypt::hash("socialql-unknown-user", config.hash_cost)?,
        })
    }

    /// Signs a token identifying `user`, valid for the configured lifetime
    pub fn issue_token(&self, user: &User) -> Result<Token, Error> {
        let iat = now_secs();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat,
            exp: iat + self.token_ttl_secs,
        };

        Ok(Token {
            token: encode(&Header::default(), &claims, &self.encoding)?,
        })
    }

    /// Checks the signature and expiry of `token` and returns the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns [`SessionExpired`] for any token that fails verification.
    ///
    /// [`SessionExpired`]: ../../enum.Error.html#variant.SessionExpired
    pub fn verify_token(&self, token: &str) -> Result<Identity, Error> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.into())
            .map_err(|e| {
                debug!("Authenticator::verify_token -- rejected: {}", e);
                Error::SessionExpired
            })
    }

    /// Hashes `password` on the blocking thread pool
    pub async fn hash_password(&self, password: &Password) -> Result<String, Error> {
        let plain = password.expose().to_string();
        let cost = self.hash_cost;
        Ok(tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??)
    }

    /// Returns a bcrypt hash, at the configured cost, that belongs to no user. Verifying a
    /// password against it costs as much as verifying against a real user's hash.
    pub fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }

    /// Checks `password` against a stored bcrypt `hash` on the blocking thread pool
    pub async fn verify_password(&self, password: &Password, hash: &str) -> Result<bool, Error> {
        let plain = password.expose().to_string();
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await??)
    }
}

impl Debug for Authenticator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Returns the identity if present.
///
/// # Errors
///
/// Returns [`LoginRequired`] if `identity` is `None`.
///
/// [`LoginRequired`]: ../../enum.Error.html#variant.LoginRequired
pub fn require_authenticated(identity: Option<&Identity>) -> Result<&Identity, Error> {
    identity.ok_or(Error::LoginRequired)
}

/// Succeeds only if `identity` wrote `post`.
///
/// # Errors
///
/// Returns [`NotPostAuthor`] otherwise.
///
/// [`NotPostAuthor`]: ../../enum.Error.html#variant.NotPostAuthor
pub fn require_ownership(identity: &Identity, post: &Post) -> Result<(), Error> {
    if identity.id == post.author_id {
        Ok(())
    } else {
        Err(Error::NotPostAuthor { post_id: post.id })
    }
}
