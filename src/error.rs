//! Provides the [`Error`] type for socialql

use juniper::{FieldError, IntoFieldError, ScalarValue};
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;

/// Error type for socialql
///
/// # Examples
///
/// ```rust
/// use socialql::Error;
///
/// let e = Error::PostNotFound { id: 7 };
/// ```
#[derive(Debug)]
pub enum Error {
    /// Returned if a [`Client`] is unable to submit a request to the server, such as due to a
    /// network or server error, or the response cannot be parsed as valid JSON. Inspect the
    /// [`reqwest::Error`] included as a source error for additional detail.
    ///
    /// [`Client`]: ./client/enum.Client.html
    ClientRequestFailed { source: reqwest::Error },

    /// Returned if a configuration value is present but unusable. The `name` field holds the
    /// dotted path of the offending item, such as `auth.hash_cost`.
    ConfigItemInvalid { name: String, message: String },

    /// Returned if a `Config` file cannot be opened, typically because the configuration file
    /// cannot be found on disk
    ConfigOpenFailed { source: std::io::Error },

    /// Returned by login when the email is unknown or the password does not match. The two cases
    /// are deliberately reported with the same variant and message.
    CredentialsInvalid,

    /// Returned if a `Config` fails to deserialize because the provided data does not match the
    /// expected data structure
    DeserializationFailed { source: serde_yaml::Error },

    /// Returned if a sign up uses an email address that already belongs to a user
    EmailDuplicated { email: String },

    /// Returned if an environment variable cannot be found. The `name` field contains the name of
    /// the environment variable that could not be found.
    EnvironmentVariableNotFound { name: String },

    /// Returned if a numeric environment variable cannot be parsed
    EnvironmentVariableNotParsed { source: ParseIntError },

    /// Returned if a registered extension function returns an error
    ExtensionFailed {
        source: Box<dyn std::error::Error + Sync + Send>,
    },

    /// Returned if a user tries to add a friend they already have
    FriendDuplicated { user_id: u32 },

    /// Returned if a user tries to add themselves as a friend
    FriendInvalid { user_id: u32 },

    /// Returned by a [`Client`] when the GraphQL response carries an `errors` array. The errors are
    /// kept as returned by the server.
    ///
    /// [`Client`]: ./client/enum.Client.html
    GraphQLFailed { errors: serde_json::Value },

    /// Returned if a GraphQL `ID` argument is not a positive integer
    IdMalformed { id: String },

    /// Returned if a [`Client`] is given a header name that is not valid in HTTP
    ///
    /// [`Client`]: ./client/enum.Client.html
    InvalidHeaderName {
        source: reqwest::header::InvalidHeaderName,
    },

    /// Returned if a [`Client`] is given a header value that is not valid in HTTP
    ///
    /// [`Client`]: ./client/enum.Client.html
    InvalidHeaderValue {
        source: reqwest::header::InvalidHeaderValue,
    },

    /// Returned if an operation that requires a signed-in caller is invoked without one
    LoginRequired,

    /// Returned if a caller tries to remove a post written by someone else
    NotPostAuthor { post_id: u32 },

    /// Returned if hashing or verifying a password fails, for example because a stored hash is
    /// not a valid bcrypt string
    PasswordHashFailed { source: bcrypt::BcryptError },

    /// Returned if a [`Client`] receives a valid JSON response that does not contain the
    /// expected 'data' object.
    ///
    /// [`Client`]: ./client/enum.Client.html
    PayloadNotFound { response: serde_json::Value },

    /// Returned if no post has the given id
    PostNotFound { id: u32 },

    /// Returned if seed data contains two records with the same id, or two users with the same
    /// email. The `item` field describes the duplicate.
    SeedItemDuplicated { item: String },

    /// Returned if a GraphQL response cannot be converted to a serde_json::Value
    SerializationFailed { source: serde_json::Error },

    /// Returned if a bearer token is malformed, expired, or carries an invalid signature
    SessionExpired,

    /// Returned if a thread panicked while holding the store lock
    StoreLockPoisoned,

    /// Returned if a blocking task, such as password hashing, panics or is cancelled
    TaskJoinFailed { source: tokio::task::JoinError },

    /// Returned if a bearer token cannot be signed
    TokenEncodingFailed {
        source: jsonwebtoken::errors::Error,
    },

    /// Returned if an operation produced a result of a different shape than the caller expected.
    /// This indicates an internal bug in the dispatch table.
    TypeNotExpected,

    /// Returned if a height or weight unit is not one of the enumerated units
    UnitNotSupported { unit: String },

    /// Returned if no user has the given id
    UserNotFound { id: u32 },
}

impl Error {
    /// Classifies the error into the coarse kinds reported to callers
    ///
    /// # Examples
    ///
    /// ```rust
    /// use socialql::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::LoginRequired.kind(), ErrorKind::Forbidden);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PostNotFound { .. } | Error::UserNotFound { .. } => ErrorKind::NotFound,
            Error::EmailDuplicated { .. }
            | Error::FriendDuplicated { .. }
            | Error::FriendInvalid { .. } => ErrorKind::Conflict,
            Error::CredentialsInvalid | Error::SessionExpired => ErrorKind::Authentication,
            Error::LoginRequired | Error::NotPostAuthor { .. } => ErrorKind::Forbidden,
            Error::UnitNotSupported { .. } => ErrorKind::UnsupportedUnit,
            Error::IdMalformed { .. } => ErrorKind::InvalidInput,
            Error::GraphQLFailed { errors } => errors
                .get(0)
                .and_then(|e| e.pointer("/extensions/code"))
                .and_then(|c| c.as_str())
                .map_or(ErrorKind::Internal, ErrorKind::from_code),
            _ => ErrorKind::Internal,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Error::ClientRequestFailed { source } => {
                write!(f, "Client request failed. Source error: {}", source)
            }
            Error::ConfigItemInvalid { name, message } => {
                write!(f, "Config item {} is invalid: {}", name, message)
            }
            Error::ConfigOpenFailed { source } => {
                write!(f, "Config file could not be opened. Source error: {}", source)
            }
            Error::CredentialsInvalid => write!(f, "Invalid email or password."),
            Error::DeserializationFailed { source } => {
                write!(f, "Failed to deserialize configuration. Source error: {}", source)
            }
            Error::EmailDuplicated { email } => {
                write!(f, "User email {} is already registered.", email)
            }
            Error::EnvironmentVariableNotFound { name } => {
                write!(f, "Could not find environment variable: {}", name)
            }
            Error::EnvironmentVariableNotParsed { source } => {
                write!(f, "Failed to parse environment variable to an integer. Source error: {}", source)
            }
            Error::ExtensionFailed { source } => {
                write!(f, "Extension returned an error: {}", source)
            }
            Error::FriendDuplicated { user_id } => {
                write!(f, "User {} is already a friend.", user_id)
            }
            Error::FriendInvalid { user_id } => {
                write!(f, "User {} cannot be added as their own friend.", user_id)
            }
            Error::GraphQLFailed { errors } => {
                write!(f, "GraphQL request returned errors: {}", errors)
            }
            Error::IdMalformed { id } => write!(f, "The id {} is not a valid identifier.", id),
            Error::InvalidHeaderName { source } => {
                write!(f, "Invalid HTTP header name. Source error: {}", source)
            }
            Error::InvalidHeaderValue { source } => {
                write!(f, "Invalid HTTP header value. Source error: {}", source)
            }
            Error::LoginRequired => write!(f, "Not logged in."),
            Error::NotPostAuthor { post_id } => {
                write!(f, "Only the author can delete post {}.", post_id)
            }
            Error::PasswordHashFailed { source } => {
                write!(f, "Password hashing failed. Source error: {}", source)
            }
            Error::PayloadNotFound { response } => {
                write!(f, "Required data field is missing from the response: {}", response)
            }
            Error::PostNotFound { id } => write!(f, "Post {} does not exist.", id),
            Error::SeedItemDuplicated { item } => {
                write!(f, "Seed data contains a duplicate item: {}", item)
            }
            Error::SerializationFailed { source } => {
                write!(f, "Serialization of the GraphQL response failed. Source error: {}", source)
            }
            Error::SessionExpired => write!(f, "Your session expired. Sign in again."),
            Error::StoreLockPoisoned => {
                write!(f, "The entity store is unavailable because a writer panicked.")
            }
            Error::TaskJoinFailed { source } => {
                write!(f, "A blocking task failed to complete. Source error: {}", source)
            }
            Error::TokenEncodingFailed { source } => {
                write!(f, "Could not sign the session token. Source error: {}", source)
            }
            Error::TypeNotExpected => {
                write!(f, "An operation returned a result of an unexpected type.")
            }
            Error::UnitNotSupported { unit } => write!(f, "Unit \"{}\" not supported.", unit),
            Error::UserNotFound { id } => write!(f, "User {} does not exist.", id),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ClientRequestFailed { source } => Some(source),
            Error::ConfigOpenFailed { source } => Some(source),
            Error::DeserializationFailed { source } => Some(source),
            Error::EnvironmentVariableNotParsed { source } => Some(source),
            Error::ExtensionFailed { source } => Some(source.as_ref()),
            Error::InvalidHeaderName { source } => Some(source),
            Error::InvalidHeaderValue { source } => Some(source),
            Error::PasswordHashFailed { source } => Some(source),
            Error::SerializationFailed { source } => Some(source),
            Error::TaskJoinFailed { source } => Some(source),
            Error::TokenEncodingFailed { source } => Some(source),
            _ => None,
        }
    }
}

impl<S: ScalarValue> IntoFieldError<S> for Error {
    fn into_field_error(self) -> FieldError<S> {
        let mut extensions = juniper::Object::with_capacity(1);
        extensions.add_field(
            "code",
            juniper::Value::scalar(self.kind().code().to_string()),
        );
        FieldError::new(self, juniper::Value::Object(extensions))
    }
}

impl From<Box<dyn std::error::Error + Sync + Send>> for Error {
    fn from(e: Box<dyn std::error::Error + Sync + Send>) -> Self {
        Error::ExtensionFailed { source: e }
    }
}

impl From<bcrypt::BcryptError> for Error {
    fn from(e: bcrypt::BcryptError) -> Self {
        Error::PasswordHashFailed { source: e }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Error::TokenEncodingFailed { source: e }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::ClientRequestFailed { source: e }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::DeserializationFailed { source: e }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Error::EnvironmentVariableNotParsed { source: e }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationFailed { source: e }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::TaskJoinFailed { source: e }
    }
}

/// Coarse classification of an [`Error`], stable across variants. The kind is what GraphQL
/// callers see in the `extensions.code` field of an error.
///
/// [`Error`]: ./enum.Error.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced id does not exist
    NotFound,
    /// The operation conflicts with existing state, such as a duplicate email
    Conflict,
    /// Credentials or the session token could not be verified
    Authentication,
    /// The caller is not signed in, or is not allowed to act on the target
    Forbidden,
    /// A height or weight unit is outside the enumerated set
    UnsupportedUnit,
    /// An argument could not be interpreted
    InvalidInput,
    /// Any failure of the service itself
    Internal,
}

impl ErrorKind {
    /// Returns the code placed in GraphQL error extensions for this kind
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Authentication => "UNAUTHENTICATED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::UnsupportedUnit => "UNSUPPORTED_UNIT",
            ErrorKind::InvalidInput => "BAD_USER_INPUT",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Maps an extensions code back to its kind. Unknown codes are treated as internal errors.
    pub fn from_code(code: &str) -> ErrorKind {
        match code {
            "NOT_FOUND" => ErrorKind::NotFound,
            "CONFLICT" => ErrorKind::Conflict,
            "UNAUTHENTICATED" => ErrorKind::Authentication,
            "FORBIDDEN" => ErrorKind::Forbidden,
            "UNSUPPORTED_UNIT" => ErrorKind::UnsupportedUnit,
            "BAD_USER_INPUT" => ErrorKind::InvalidInput,
            _ => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};
    use serde_json::json;

    /// Passes if a new error with no wrapped source error is created
    #[test]
    fn new_error() {
        let e = Error::LoginRequired;

        assert!(std::error::Error::source(&e).is_none());
    }

    /// Passes if an error prints a display string correctly
    #[test]
    fn display_fmt() {
        let s = std::io::Error::new(std::io::ErrorKind::Other, "oh no!");
        let e = Error::ConfigOpenFailed { source: s };

        assert_eq!(
            "Config file could not be opened. Source error: oh no!",
            &format!("{}", e)
        );
    }

    /// Passes if both login failure causes share one message
    #[test]
    fn credentials_message_is_opaque() {
        assert_eq!(
            "Invalid email or password.",
            &Error::CredentialsInvalid.to_string()
        );
        assert_eq!(Error::CredentialsInvalid.kind(), ErrorKind::Authentication);
    }

    /// Passes if every domain error maps to the expected kind
    #[test]
    fn kinds() {
        assert_eq!(Error::UserNotFound { id: 1 }.kind(), ErrorKind::NotFound);
        assert_eq!(Error::PostNotFound { id: 1 }.kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::EmailDuplicated {
                email: "a@b.c".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(Error::FriendDuplicated { user_id: 2 }.kind(), ErrorKind::Conflict);
        assert_eq!(Error::SessionExpired.kind(), ErrorKind::Authentication);
        assert_eq!(Error::NotPostAuthor { post_id: 1 }.kind(), ErrorKind::Forbidden);
        assert_eq!(
            Error::UnitNotSupported {
                unit: "PARSEC".to_string()
            }
            .kind(),
            ErrorKind::UnsupportedUnit
        );
        assert_eq!(Error::StoreLockPoisoned.kind(), ErrorKind::Internal);
    }

    /// Passes if a client-side GraphQL failure recovers the kind from the extensions code
    #[test]
    fn graphql_failed_kind() {
        let e = Error::GraphQLFailed {
            errors: json!([{"message": "Not logged in.", "extensions": {"code": "FORBIDDEN"}}]),
        };
        assert_eq!(e.kind(), ErrorKind::Forbidden);

        let e = Error::GraphQLFailed { errors: json!([]) };
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    /// Passes if codes round trip through their kind
    #[test]
    fn codes() {
        for kind in &[
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Authentication,
            ErrorKind::Forbidden,
            ErrorKind::UnsupportedUnit,
            ErrorKind::InvalidInput,
            ErrorKind::Internal,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), *kind);
        }
    }

    /// Passes if Error implements the Send trait
    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Error>();
    }

    /// Passes if Error implements the Sync trait
    #[test]
    fn test_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<Error>();
    }
}
