//! This module provides the Juniper context for socialql GraphQL queries. The context carries
//! the shared dispatcher and the per-request state set up by extensions.

use crate::engine::auth::Identity;
use crate::engine::dispatch::{Dispatcher, Operation, Outcome};
use crate::error::Error;
use juniper::Context;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// State belonging to a single request. Extensions fill it in before the query runs.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    request_id: Uuid,
    identity: Option<Identity>,
}

impl RequestContext {
    /// Creates an anonymous context with a fresh request id
    pub fn new() -> RequestContext {
        RequestContext {
            request_id: Uuid::new_v4(),
            identity: None,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the caller, if the request carried a valid token
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn with_identity(self, identity: Identity) -> RequestContext {
        RequestContext {
            identity: Some(identity),
            ..self
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::new()
    }
}

/// Juniper context for socialql's GraphQL queries
#[derive(Debug)]
pub struct GraphQLContext {
    dispatcher: Arc<Dispatcher>,
    request_ctx: RequestContext,
    metadata: HashMap<String, String>,
    version: Option<String>,
}

impl GraphQLContext {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        request_ctx: RequestContext,
        metadata: HashMap<String, String>,
        version: Option<String>,
    ) -> GraphQLContext {
        GraphQLContext {
            dispatcher,
            request_ctx,
            metadata,
            version,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn request_ctx(&self) -> &RequestContext {
        &self.request_ctx
    }

    /// Returns the request metadata, such as HTTP headers with lower-cased names
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn version(&self) -> Option<&String> {
        self.version.as_ref()
    }

    /// Runs `operation` on behalf of the request's caller
    pub async fn dispatch(&self, operation: Operation) -> Result<Outcome, Error> {
        self.dispatcher
            .dispatch(operation, self.request_ctx.identity())
            .await
    }
}

impl Context for GraphQLContext {}
