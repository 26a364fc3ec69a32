//! socialql is a GraphQL service for a small social blogging graph. Users sign up, log in, write
//! posts, like each other's posts, and befriend each other. The service keeps its data in an
//! in-memory entity store and identifies callers by a signed token in the `x-token` header.
//!
//! The [`Engine`] executes GraphQL requests. Root query and mutation fields translate into
//! named operations, run through the per-operation middleware chain of the dispatcher, which
//! enforces authentication and post ownership before touching the store. Relationship fields
//! such as a user's friends or a post's like givers are resolved lazily as the query asks for
//! them.
//!
//! The [`Client`] talks to an engine either over HTTP or in process.
//!
//! [`Client`]: ./client/enum.Client.html
//! [`Engine`]: ./engine/struct.Engine.html
//!
//! # Examples
//!
//! ```rust,no_run
//! # use std::collections::HashMap;
//! # use socialql::{Client, Engine};
//! # use socialql::engine::config::Config;
//! # #[tokio::main]
//! # async fn main() -> Result<(), socialql::Error> {
//! let mut config = Config::from_file("./socialql.yml")?;
//! config.auth = config.auth.with_env_overrides()?;
//!
//! let engine = Engine::new(config).build()?;
//! let mut client = Client::new_with_engine(engine, None);
//!
//! let token = client.login("fong@test.com", "123456").await?;
//! client.set_token(&token)?;
//! let me = client.me("id name friends { name }").await?;
//! # Ok(())
//! # }
//! ```

pub use juniper;

pub use client::Client;
pub use engine::auth::{Identity, Token};
pub use engine::config::Config;
pub use engine::Engine;
pub use error::{Error, ErrorKind};

pub mod client;
pub mod engine;
pub mod error;
