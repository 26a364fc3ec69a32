//! This module provides types for the service configuration: where the server listens, how
//! tokens and password hashes are produced, and the data the store starts with.

use crate::engine::objects::{Post, User};
use crate::error::Error;
use serde::Deserialize;
use std::env::var_os;
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::BufReader;

const TUTORIAL_SEED: &str = include_str!("tutorial_seed.yml");

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

fn default_hash_cost() -> u32 {
    10
}

fn env_string(var_name: &str) -> Result<String, Error> {
    var_os(var_name)
        .map(|osstr| osstr.to_string_lossy().into_owned())
        .ok_or_else(|| Error::EnvironmentVariableNotFound {
            name: var_name.to_string(),
        })
}

fn env_u32(var_name: &str) -> Result<u32, Error> {
    Ok(env_string(var_name)?.parse::<u32>()?)
}

/// Top level configuration for socialql. Every section may be omitted, in which case its
/// defaults apply.
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::config::Config;
/// # fn main() -> Result<(), socialql::Error> {
/// let config = Config::from_string(
///     "
/// server:
///   port: 8080
/// auth:
///   secret: not-for-production
/// ",
/// )?;
///
/// assert_eq!(config.server.port, 8080);
/// assert_eq!(config.auth.token_ttl_secs, 86400);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Records loaded into the store at start-up. Without a seed the store starts empty.
    #[serde(default)]
    pub seed: Option<Seed>,
}

impl Config {
    /// Reads a YAML configuration file from `path`
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] variant [`ConfigOpenFailed`] if the file cannot be opened, or
    /// [`DeserializationFailed`] if it does not hold a valid configuration.
    ///
    /// [`ConfigOpenFailed`]: ../../enum.Error.html#variant.ConfigOpenFailed
    /// [`DeserializationFailed`]: ../../enum.Error.html#variant.DeserializationFailed
    /// [`Error`]: ../../enum.Error.html
    pub fn from_file(path: &str) -> Result<Config, Error> {
        let f = File::open(path).map_err(|e| Error::ConfigOpenFailed { source: e })?;
        let r = BufReader::new(f);
        Ok(serde_yaml::from_reader(r)?)
    }

    /// Parses a configuration from a YAML string
    pub fn from_string(s: &str) -> Result<Config, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Checks the values that deserialization alone cannot. Returns a [`ConfigItemInvalid`]
    /// error naming the first offending item.
    ///
    /// [`ConfigItemInvalid`]: ../../enum.Error.html#variant.ConfigItemInvalid
    pub fn validate(&self) -> Result<(), Error> {
        if self.server.workers == 0 {
            return Err(Error::ConfigItemInvalid {
                name: "server.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        self.auth.validate()
    }
}

/// HTTP listener settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ServerConfig {
    /// Returns the `host:port` string the server binds to
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Token and password hashing settings.
///
/// The secret is left out of the [`Debug`] output.
#[derive(Clone, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens. Required before an engine can be built.
    #[serde(default)]
    pub secret: Option<String>,

    /// Lifetime of an issued token, in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// bcrypt cost factor
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
}

impl AuthConfig {
    /// Builds the auth settings from the environment. `SOCIALQL_SECRET` is required.
    /// `SOCIALQL_SALT_ROUNDS` overrides the default bcrypt cost if set.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvironmentVariableNotFound`] error if `SOCIALQL_SECRET` is not set, or an
    /// [`EnvironmentVariableNotParsed`] error if `SOCIALQL_SALT_ROUNDS` is not an integer.
    ///
    /// [`EnvironmentVariableNotFound`]: ../../enum.Error.html#variant.EnvironmentVariableNotFound
    /// [`EnvironmentVariableNotParsed`]: ../../enum.Error.html#variant.EnvironmentVariableNotParsed
    pub fn from_env() -> Result<AuthConfig, Error> {
        AuthConfig {
            secret: Some(env_string("SOCIALQL_SECRET")?),
            ..AuthConfig::default()
        }
        .with_env_overrides()
    }

    /// Replaces the secret and the bcrypt cost with the values of `SOCIALQL_SECRET` and
    /// `SOCIALQL_SALT_ROUNDS`, for whichever of the two is set
    pub fn with_env_overrides(mut self) -> Result<AuthConfig, Error> {
        if let Ok(secret) = env_string("SOCIALQL_SECRET") {
            self.secret = Some(secret);
        }
        match env_u32("SOCIALQL_SALT_ROUNDS") {
            Ok(cost) => self.hash_cost = cost,
            Err(Error::EnvironmentVariableNotFound { .. }) => (),
            Err(e) => return Err(e),
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.token_ttl_secs == 0 {
            return Err(Error::ConfigItemInvalid {
                name: "auth.token_ttl_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if !(4..=31).contains(&self.hash_cost) {
            return Err(Error::ConfigItemInvalid {
                name: "auth.hash_cost".to_string(),
                message: format!("{} is outside the bcrypt range 4 to 31", self.hash_cost),
            });
        }
        Ok(())
    }
}

impl Debug for AuthConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            hash_cost: default_hash_cost(),
        }
    }
}

/// Initial store contents. Users carry their bcrypt hash under the `password` key.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub posts: Vec<Post>,
}

impl Seed {
    /// Returns the tutorial data set
    pub fn tutorial() -> Result<Seed, Error> {
        Ok(serde_yaml::from_str(TUTORIAL_SEED)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, Config, Seed};
    use crate::error::Error;

    /// Passes if an empty document yields the defaults
    #[test]
    fn defaults() {
        let c = Config::from_string("{}").unwrap();

        assert_eq!(c.server.addr(), "127.0.0.1:5000");
        assert!(c.server.workers > 0);
        assert_eq!(c.auth.secret, None);
        assert_eq!(c.auth.token_ttl_secs, 86400);
        assert_eq!(c.auth.hash_cost, 10);
        assert!(c.seed.is_none());
        assert!(c.validate().is_ok());
    }

    /// Passes if a missing file is reported as such
    #[test]
    fn from_file_missing() {
        assert!(matches!(
            Config::from_file("./no_such_config.yml").unwrap_err(),
            Error::ConfigOpenFailed { .. }
        ));
    }

    /// Passes if malformed yaml fails deserialization
    #[test]
    fn from_string_malformed() {
        assert!(matches!(
            Config::from_string("auth: [").unwrap_err(),
            Error::DeserializationFailed { .. }
        ));
    }

    /// Passes if a bcrypt cost outside the supported range is rejected
    #[test]
    fn validate_hash_cost() {
        let c = Config::from_string("auth:\n  hash_cost: 2\n").unwrap();

        match c.validate().unwrap_err() {
            Error::ConfigItemInvalid { name, .. } => assert_eq!(name, "auth.hash_cost"),
            e => panic!("unexpected error: {}", e),
        }
    }

    /// Passes if a zero token lifetime is rejected
    #[test]
    fn validate_ttl() {
        let c = Config::from_string("auth:\n  token_ttl_secs: 0\n").unwrap();
        assert!(matches!(
            c.validate().unwrap_err(),
            Error::ConfigItemInvalid { .. }
        ));
    }

    /// Passes if the secret does not appear in debug output
    #[test]
    fn auth_debug_redacts_secret() {
        let a = AuthConfig {
            secret: Some("hunter2".to_string()),
            ..AuthConfig::default()
        };
        let s = format!("{:?}", a);
        assert!(!s.contains("hunter2"));
        assert!(s.contains("redacted"));
    }

    /// Passes if the tutorial data parses with its three users and two posts
    #[test]
    fn tutorial_seed() {
        let seed = Seed::tutorial().unwrap();

        assert_eq!(seed.users.len(), 3);
        assert_eq!(seed.posts.len(), 2);
        assert_eq!(seed.users[0].name.as_deref(), Some("Fong"));
        assert_eq!(seed.users[0].friend_ids, vec![2, 3]);
        assert_eq!(seed.users[1].height, Some(185.3));
        assert_eq!(seed.posts[1].like_giver_ids, vec![1]);
    }

    /// Passes if the secret variable is required when reading auth settings from the
    /// environment
    #[test]
    fn from_env_requires_secret() {
        if std::env::var_os("SOCIALQL_SECRET").is_some() {
            return;
        }
        assert!(matches!(
            AuthConfig::from_env().unwrap_err(),
            Error::EnvironmentVariableNotFound { .. }
        ));
    }
}
