//! This module provides the socialql engine, including supporting modules for configuration,
//! the entity store, authentication, operation dispatch, and the GraphQL schema.

use crate::error::Error;
use auth::Authenticator;
use config::Config;
use context::{GraphQLContext, RequestContext};
use database::memory::MemoryStore;
use database::Store;
use dispatch::{Dispatcher, OperationName};
use extensions::{Extensions, TokenExtension};
use juniper::http::GraphQLRequest;
use log::debug;
use middleware::Middleware;
use schema::{create_root_node, RootRef};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::info_span;
use tracing_futures::Instrument;

pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod dispatch;
pub mod extensions;
pub mod middleware;
pub mod objects;
pub mod resolvers;
pub mod schema;

/// Implements the builder pattern for socialql engines
///
/// # Examples
///
/// ```rust
/// # use socialql::engine::config::Config;
/// # use socialql::engine::Engine;
/// # fn main() -> Result<(), socialql::Error> {
/// let mut config = Config::default();
/// config.auth.secret = Some("not-for-production".to_string());
///
/// let engine = Engine::new(config).build()?;
/// # Ok(())
/// # }
/// ```
pub struct EngineBuilder {
    config: Config,
    store: Option<Arc<dyn Store>>,
    extensions: Extensions,
    middleware: Vec<(OperationName, Arc<dyn Middleware>)>,
    version: Option<String>,
}

impl EngineBuilder {
    /// Sets the store the engine reads and writes. Without one, the engine builds a
    /// [`MemoryStore`] from the configured seed, or an empty one if there is no seed.
    ///
    /// [`MemoryStore`]: ./database/memory/struct.MemoryStore.html
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use socialql::engine::config::Config;
    /// # use socialql::engine::database::memory::MemoryStore;
    /// # use socialql::engine::Engine;
    /// # fn main() -> Result<(), socialql::Error> {
    /// let mut config = Config::default();
    /// config.auth.secret = Some("not-for-production".to_string());
    ///
    /// let engine = Engine::new(config)
    ///     .with_store(Arc::new(MemoryStore::tutorial()?))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_store(mut self, store: Arc<dyn Store>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Replaces the engine's extensions. By default the engine runs a single
    /// [`TokenExtension`].
    ///
    /// [`TokenExtension`]: ./extensions/struct.TokenExtension.html
    pub fn with_extensions(mut self, extensions: Extensions) -> EngineBuilder {
        self.extensions = extensions;
        self
    }

    /// Appends `middleware` to the chain of operation `name`, after the built-in links
    pub fn with_middleware(
        mut self,
        name: OperationName,
        middleware: Arc<dyn Middleware>,
    ) -> EngineBuilder {
        self.middleware.push((name, middleware));
        self
    }

    /// Sets the version of the app, reported by the `_version` query
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use socialql::engine::config::Config;
    /// # use socialql::engine::Engine;
    /// # fn main() -> Result<(), socialql::Error> {
    /// let mut config = Config::default();
    /// config.auth.secret = Some("not-for-production".to_string());
    ///
    /// let engine = Engine::new(config)
    ///     .with_version("1.0.0".to_string())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_version(mut self, version: String) -> EngineBuilder {
        self.version = Some(version);
        self
    }

    /// Builds a configured [`Engine`].
    ///
    /// [`Engine`]: ./struct.Engine.html
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] variant [`ConfigItemInvalid`] if the configuration fails
    /// validation or has no token secret, or [`SeedItemDuplicated`] if the seed data repeats
    /// an id or email.
    ///
    /// [`Error`]: ../enum.Error.html
    /// [`ConfigItemInvalid`]: ../enum.Error.html#variant.ConfigItemInvalid
    /// [`SeedItemDuplicated`]: ../enum.Error.html#variant.SeedItemDuplicated
    pub fn build(self) -> Result<Engine, Error> {
        self.config.validate()?;

        let auth = Arc::new(Authenticator::new(&self.config.auth)?);
        let store: Arc<dyn Store> = match self.store {
            Some(store) => store,
            None => match self.config.seed {
                Some(seed) => Arc::new(MemoryStore::from_seed(seed)?),
                None => Arc::new(MemoryStore::new()),
            },
        };

        let dispatcher = self
            .middleware
            .into_iter()
            .fold(Dispatcher::new(store, auth), |d, (name, m)| {
                d.with_middleware(name, m)
            });

        Ok(Engine {
            dispatcher: Arc::new(dispatcher),
            extensions: self.extensions,
            version: self.version,
            root_node: create_root_node(),
        })
    }
}

impl Debug for EngineBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("extensions", &self.extensions)
            .field("middleware", &self.middleware)
            .field("version", &self.version)
            .finish()
    }
}

/// A socialql GraphQL engine. Cheap to clone; clones share the same store.
///
/// # Examples
///
/// ```rust,no_run
/// # use std::collections::HashMap;
/// # use socialql::engine::config::Config;
/// # use socialql::engine::Engine;
/// # use socialql::juniper::http::GraphQLRequest;
/// # #[tokio::main]
/// # async fn main() -> Result<(), socialql::Error> {
/// let mut config = Config::default();
/// config.auth.secret = Some("not-for-production".to_string());
/// let engine = Engine::new(config).build()?;
///
/// let request = GraphQLRequest::new("query { hello }".to_string(), None, None);
/// let result = engine.execute(request, HashMap::new()).await?;
///
/// assert_eq!(result["data"]["hello"], "HELLO WORLD!");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    extensions: Extensions,
    version: Option<String>,
    root_node: RootRef,
}

impl Engine {
    /// Creates a new [`EngineBuilder`] from `config`
    ///
    /// [`EngineBuilder`]: ./struct.EngineBuilder.html
    #[allow(clippy::new_ret_no_self)]
    pub fn new(config: Config) -> EngineBuilder {
        EngineBuilder {
            config,
            store: None,
            extensions: vec![Arc::new(TokenExtension)],
            middleware: Vec::new(),
            version: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Executes a GraphQL request. The `metadata` map holds request headers, which the
    /// extensions read before the query runs.
    ///
    /// # Errors
    ///
    /// Returns an error if a pre or post request extension hook fails, such as
    /// [`SessionExpired`] when the `x-token` header holds an invalid token, or
    /// [`SerializationFailed`] if the response cannot be converted to JSON. Errors raised while
    /// resolving fields are reported inside the response instead.
    ///
    /// [`SessionExpired`]: ../enum.Error.html#variant.SessionExpired
    /// [`SerializationFailed`]: ../enum.Error.html#variant.SerializationFailed
    pub async fn execute(
        &self,
        request: GraphQLRequest,
        metadata: HashMap<String, String>,
    ) -> Result<serde_json::Value, Error> {
        let mut request_ctx = RequestContext::new();
        let span = info_span!("sq-execute", request_id = %request_ctx.request_id());
        debug!(
            "Engine::execute called -- request_id: {} | operation: {:?}",
            request_ctx.request_id(),
            request.operation_name()
        );

        for extension in &self.extensions {
            request_ctx = extension.pre_request_hook(
                request.operation_name(),
                request_ctx,
                &metadata,
                self.dispatcher.auth(),
            )?;
        }

        let gql_ctx = GraphQLContext::new(
            self.dispatcher.clone(),
            request_ctx.clone(),
            metadata,
            self.version.clone(),
        );

        let res = request
            .execute(&*self.root_node, &gql_ctx)
            .instrument(span)
            .await;
        let mut res_value = serde_json::to_value(&res)?;

        for extension in &self.extensions {
            res_value = extension.post_request_hook(&request_ctx, res_value)?;
        }

        Ok(res_value)
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dispatcher", &self.dispatcher)
            .field("extensions", &self.extensions)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::config::Config;
    use super::database::memory::MemoryStore;
    use super::extensions::TOKEN_HEADER;
    use super::Engine;
    use crate::error::{Error, ErrorKind};
    use juniper::http::GraphQLRequest;
    use maplit::hashmap;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.auth.secret = Some("test-secret".to_string());
        config.auth.hash_cost = 4;
        config
    }

    fn engine() -> Engine {
        Engine::new(config())
            .with_store(Arc::new(MemoryStore::tutorial().unwrap()))
            .with_version("1.2.3".to_string())
            .build()
            .unwrap()
    }

    fn request(query: &str) -> GraphQLRequest {
        GraphQLRequest::new(query.to_string(), None, None)
    }

    /// Passes if an engine cannot be built without a token secret
    #[test]
    fn build_requires_secret() {
        init();
        assert!(matches!(
            Engine::new(Config::default()).build().unwrap_err(),
            Error::ConfigItemInvalid { .. }
        ));
    }

    /// Passes if the engine answers plain queries
    #[tokio::test]
    async fn hello_and_version() {
        init();
        let res = engine()
            .execute(request("query { hello _version }"), HashMap::new())
            .await
            .unwrap();

        assert_eq!(res["data"]["hello"], json!("HELLO WORLD!"));
        assert_eq!(res["data"]["_version"], json!("1.2.3"));
    }

    /// Passes if nested relationship fields resolve through the store
    #[tokio::test]
    async fn nested_fields() {
        init();
        let res = engine()
            .execute(
                request(
                    "query { user(name: \"Fong\") { id friends { name } posts { title likeGivers { name } } } }",
                ),
                HashMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            res["data"]["user"],
            json!({
                "id": "1",
                "friends": [{"name": "Kevin"}, {"name": "Mary"}],
                "posts": [{"title": "Hello World", "likeGivers": [{"name": "Fong"}, {"name": "Kevin"}]}]
            })
        );
    }

    /// Passes if an invalid token fails the whole request with the session message
    #[tokio::test]
    async fn invalid_token() {
        init();
        let e = engine()
            .execute(
                request("query { me { id } }"),
                hashmap! {TOKEN_HEADER.to_string() => "bogus".to_string()},
            )
            .await
            .unwrap_err();

        assert_eq!(e.kind(), ErrorKind::Authentication);
        assert_eq!(e.to_string(), "Your session expired. Sign in again.");
    }

    /// Passes if field errors carry their code in the extensions
    #[tokio::test]
    async fn error_extensions() {
        init();
        let res = engine()
            .execute(request("query { me { id } }"), HashMap::new())
            .await
            .unwrap();

        assert_eq!(res["data"]["me"], json!(null));
        assert_eq!(res["errors"][0]["message"], json!("Not logged in."));
        assert_eq!(res["errors"][0]["extensions"]["code"], json!("FORBIDDEN"));
    }

    /// Passes if the engine starts from the configured seed when given no store
    #[tokio::test]
    async fn seeded_from_config() {
        init();
        let mut config = config();
        config.seed = Some(super::config::Seed::tutorial().unwrap());
        let engine = Engine::new(config).build().unwrap();

        assert_eq!(engine.dispatcher().store().users().unwrap().len(), 3);
    }
}
