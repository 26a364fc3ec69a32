//! Contains types and functions for extensions that hook into the socialql request lifecycle.

use crate::engine::auth::Authenticator;
use crate::engine::context::RequestContext;
use crate::error::Error;
use log::trace;
use std::collections::hash_map::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Name of the request header carrying the session token
pub const TOKEN_HEADER: &str = "x-token";

/// Trait implemented by socialql extensions. Exposes hook points that allow external logic to
/// be executed before and after a GraphQL request runs.
///
/// # Examples
///
/// ```rust
/// # use std::collections::HashMap;
/// # use std::sync::Arc;
/// # use socialql::engine::auth::Authenticator;
/// # use socialql::engine::context::RequestContext;
/// # use socialql::engine::extensions::{Extension, Extensions};
/// # use socialql::Error;
///
/// #[derive(Clone, Debug)]
/// pub struct MetadataExtension;
///
/// impl Extension for MetadataExtension {
///     fn pre_request_hook(
///         &self,
///         _op_name: Option<&str>,
///         request_ctx: RequestContext,
///         _headers: &HashMap<String, String>,
///         _auth: &Authenticator,
///     ) -> Result<RequestContext, Error> {
///         // Set values in request context, or take some other action
///         Ok(request_ctx)
///     }
/// }
///
/// let extensions: Extensions = vec![Arc::new(MetadataExtension)];
/// ```
pub trait Extension: Debug + Send + Sync {
    /// Runs before the query executes. An error aborts the request.
    fn pre_request_hook(
        &self,
        _op_name: Option<&str>,
        request_ctx: RequestContext,
        _headers: &HashMap<String, String>,
        _auth: &Authenticator,
    ) -> Result<RequestContext, Error> {
        Ok(request_ctx)
    }

    /// Runs on the JSON response after the query executes
    fn post_request_hook(
        &self,
        _request_ctx: &RequestContext,
        response: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        Ok(response)
    }
}

/// Type alias for a thread-safe Extension vector.
pub type Extensions = Vec<Arc<dyn Extension>>;

/// Resolves the caller from the `x-token` header. A request without the header stays
/// anonymous; a request whose token fails verification is rejected with [`SessionExpired`].
///
/// [`SessionExpired`]: ../../enum.Error.html#variant.SessionExpired
#[derive(Clone, Debug, Default)]
pub struct TokenExtension;

impl Extension for TokenExtension {
    fn pre_request_hook(
        &self,
        _op_name: Option<&str>,
        request_ctx: RequestContext,
        headers: &HashMap<String, String>,
        auth: &Authenticator,
    ) -> Result<RequestContext, Error> {
        let token = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(TOKEN_HEADER))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty());

        match token {
            None => Ok(request_ctx),
            Some(t) => {
                let identity = auth.verify_token(t)?;
                trace!(
                    "TokenExtension::pre_request_hook -- request: {} | caller: {}",
                    request_ctx.request_id(),
                    identity.id
                );
                Ok(request_ctx.with_identity(identity))
            }
        }
    }
}
