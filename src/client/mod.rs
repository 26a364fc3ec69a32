//! This module provides the socialql client.

use crate::engine::extensions::TOKEN_HEADER;
use crate::{Engine, Error};
use juniper::http::GraphQLRequest;
use log::{debug, trace};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// A socialql GraphQL client
///
/// The [`Client`] either posts queries to a running server or executes them against a local
/// [`Engine`]. Besides raw queries, it offers one helper per operation of the API, each taking
/// the selection `shape` of the returned object.
///
/// [`Client`]: ./enum.Client.html
/// [`Engine`]: ../engine/struct.Engine.html
///
/// # Examples
///
/// ```rust
/// # use socialql::Client;
///
/// let client = Client::new_with_http("http://localhost:5000/graphql", None).unwrap();
/// ```
#[derive(Clone, Debug)]
pub enum Client {
    Http {
        endpoint: String,
        headers: HeaderMap,
    },
    Local {
        engine: Box<Engine>,
        metadata: HashMap<String, String>,
    },
}

impl Client {
    /// Takes the URL of a socialql service endpoint and returns a new [`Client`] initialized to
    /// query that endpoint
    ///
    /// [`Client`]: ./enum.Client.html
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderName`] or [`InvalidHeaderValue`] if a header cannot be used in an
    /// HTTP request.
    ///
    /// [`InvalidHeaderName`]: ../enum.Error.html#variant.InvalidHeaderName
    /// [`InvalidHeaderValue`]: ../enum.Error.html#variant.InvalidHeaderValue
    pub fn new_with_http(
        endpoint: &str,
        headers_opt: Option<HashMap<&str, &str>>,
    ) -> Result<Client, Error> {
        trace!("Client::new_with_http called -- endpoint: {}", endpoint);

        let mut header_map = HeaderMap::new();
        if let Some(headers) = headers_opt {
            for (key, value) in headers {
                let header_name = HeaderName::from_str(key)
                    .map_err(|e| Error::InvalidHeaderName { source: e })?;
                let header_value = HeaderValue::from_str(value)
                    .map_err(|e| Error::InvalidHeaderValue { source: e })?;
                header_map.insert(header_name, header_value);
            }
        }

        Ok(Client::Http {
            endpoint: endpoint.to_string(),
            headers: header_map,
        })
    }

    /// Takes a socialql engine and returns a new [`Client`] initialized to query that engine.
    /// The `metadata` stands in for the HTTP headers of a remote request.
    ///
    /// [`Client`]: ./enum.Client.html
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use socialql::{Client, Engine};
    /// # use socialql::engine::config::Config;
    /// # fn main() -> Result<(), socialql::Error> {
    /// let mut config = Config::default();
    /// config.auth.secret = Some("not-for-production".to_string());
    /// let engine = Engine::new(config).build()?;
    ///
    /// let client = Client::new_with_engine(engine, None);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_with_engine(engine: Engine, metadata: Option<HashMap<String, String>>) -> Client {
        trace!("Client::new_with_engine called");
        Client::Local {
            engine: Box::new(engine),
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Sends `token` in the `x-token` header of every following request
    pub fn set_token(&mut self, token: &str) -> Result<(), Error> {
        match self {
            Client::Http { headers, .. } => {
                let value = HeaderValue::from_str(token)
                    .map_err(|e| Error::InvalidHeaderValue { source: e })?;
                headers.insert(TOKEN_HEADER, value);
            }
            Client::Local { metadata, .. } => {
                metadata.insert(TOKEN_HEADER.to_string(), token.to_string());
            }
        }
        Ok(())
    }

    /// Stops sending a token, so following requests are anonymous
    pub fn clear_token(&mut self) {
        match self {
            Client::Http { headers, .. } => {
                headers.remove(TOKEN_HEADER);
            }
            Client::Local { metadata, .. } => {
                metadata.remove(TOKEN_HEADER);
            }
        }
    }

    /// Executes a graphql query
    ///
    /// # Arguments
    ///
    /// * query - text of the query statement, parameterized to avoid query injection attacks
    /// * variables - a [`serde_json::Value`], specifically a Value::Object, holding the query
    /// variables
    /// * result_field - an optional name of a field under 'data' that holds the GraphQL response.
    /// If present, the object with name `result_field` under `data` will be returned. If `None`,
    /// the `data` object will be returned.
    ///
    /// # Errors
    ///
    /// * [`ClientRequestFailed`] - if the HTTP request fails
    /// * [`GraphQLFailed`] - if the response carries GraphQL errors
    /// * [`PayloadNotFound`] - if the JSON response body is not a valid GraphQL response
    ///
    /// A local engine may also fail with the errors of [`Engine::execute`].
    ///
    /// [`ClientRequestFailed`]: ../enum.Error.html#variant.ClientRequestFailed
    /// [`GraphQLFailed`]: ../enum.Error.html#variant.GraphQLFailed
    /// [`PayloadNotFound`]: ../enum.Error.html#variant.PayloadNotFound
    /// [`Engine::execute`]: ../engine/struct.Engine.html#method.execute
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use socialql::Client;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut client = Client::new_with_http("http://localhost:5000/graphql", None).unwrap();
    ///
    /// let users = client.graphql("query { users { id name } }", None, Some("users")).await;
    /// # }
    /// ```
    pub async fn graphql(
        &mut self,
        query: &str,
        variables: Option<&Value>,
        result_field_opt: Option<&str>,
    ) -> Result<Value, Error> {
        trace!(
            "Client::graphql called -- query: {} | variables: {:#?} | result_field: {:#?}",
            query,
            variables,
            result_field_opt,
        );

        let req_body = json!({
            "query": query.to_string(),
            "variables": variables,
        });

        debug!("Client::graphql making request -- query: {}", query);
        let mut body = match self {
            Client::Http { endpoint, headers } => {
                let client = reqwest::Client::new();
                let response = client
                    .post(endpoint.as_str())
                    .headers(headers.clone())
                    .json(&req_body)
                    .send()
                    .await?;
                response.json::<Value>().await?
            }
            Client::Local { engine, metadata } => {
                let request: GraphQLRequest = serde_json::from_value(req_body)?;
                engine.execute(request, metadata.clone()).await?
            }
        };
        debug!("Client::graphql -- response body: {:#?}", body);

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(Error::GraphQLFailed {
                errors: errors.clone(),
            });
        }

        let data = body.as_object_mut().and_then(|m| m.remove("data"));
        match result_field_opt {
            Some(result_field) => data
                .and_then(|mut d| d.as_object_mut().and_then(|dm| dm.remove(result_field)))
                .ok_or(Error::PayloadNotFound { response: body }),
            None => data.ok_or(Error::PayloadNotFound { response: body }),
        }
    }

    /// Returns the greeting
    pub async fn hello(&mut self) -> Result<Value, Error> {
        self.graphql("query { hello }", None, Some("hello")).await
    }

    /// Registers a user
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use socialql::Client;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut client = Client::new_with_http("http://localhost:5000/graphql", None).unwrap();
    ///
    /// let user = client.sign_up(Some("Dora"), "dora@test.com", "123456", "id name email").await;
    /// # }
    /// ```
    pub async fn sign_up(
        &mut self,
        name: Option<&str>,
        email: &str,
        password: &str,
        shape: &str,
    ) -> Result<Value, Error> {
        let query = format!(
            "mutation SignUp($name: String, $email: String!, $password: String!) {{ signUp(name: $name, email: $email, password: $password) {{ {} }} }}",
            shape
        );
        let variables = json!({"name": name, "email": email, "password": password});
        self.graphql(&query, Some(&variables), Some("signUp")).await
    }

    /// Logs in and returns the session token. The token is not set on the client; pass it to
    /// [`set_token`] to act as the user.
    ///
    /// [`set_token`]: #method.set_token
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String, Error> {
        let query = "mutation Login($email: String!, $password: String!) { login(email: $email, password: $password) { token } }";
        let variables = json!({"email": email, "password": password});
        let result = self.graphql(query, Some(&variables), Some("login")).await?;

        result
            .get("token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .ok_or(Error::PayloadNotFound { response: result })
    }

    pub async fn me(&mut self, shape: &str) -> Result<Value, Error> {
        let query = format!("query {{ me {{ {} }} }}", shape);
        self.graphql(&query, None, Some("me")).await
    }

    pub async fn users(&mut self, shape: &str) -> Result<Value, Error> {
        let query = format!("query {{ users {{ {} }} }}", shape);
        self.graphql(&query, None, Some("users")).await
    }

    pub async fn user(&mut self, name: &str, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "query User($name: String!) {{ user(name: $name) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "name": name })), Some("user"))
            .await
    }

    pub async fn posts(&mut self, shape: &str) -> Result<Value, Error> {
        let query = format!("query {{ posts {{ {} }} }}", shape);
        self.graphql(&query, None, Some("posts")).await
    }

    pub async fn post(&mut self, id: &str, shape: &str) -> Result<Value, Error> {
        let query = format!("query Post($id: ID!) {{ post(id: $id) {{ {} }} }}", shape);
        self.graphql(&query, Some(&json!({ "id": id })), Some("post"))
            .await
    }

    /// Searches users by name and posts by title. The `shape` selects on the `SearchResult`
    /// union, typically with inline fragments.
    pub async fn search(&mut self, contains: &str, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "query Search($contains: String!) {{ search(contains: $contains) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "contains": contains })), Some("search"))
            .await
    }

    /// Updates the signed-in user. `input` holds any of `name` and `age`.
    pub async fn update_my_info(&mut self, input: &Value, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "mutation UpdateMyInfo($input: UpdateMyInfoInput!) {{ updateMyInfo(input: $input) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "input": input })), Some("updateMyInfo"))
            .await
    }

    pub async fn add_friend(&mut self, user_id: &str, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "mutation AddFriend($userId: ID!) {{ addFriend(userId: $userId) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "userId": user_id })), Some("addFriend"))
            .await
    }

    pub async fn add_post(
        &mut self,
        title: &str,
        body: Option<&str>,
        shape: &str,
    ) -> Result<Value, Error> {
        let query = format!(
            "mutation AddPost($input: AddPostInput!) {{ addPost(input: $input) {{ {} }} }}",
            shape
        );
        let variables = json!({"input": {"title": title, "body": body}});
        self.graphql(&query, Some(&variables), Some("addPost")).await
    }

    /// Likes a post, or takes the like back
    pub async fn like_post(&mut self, post_id: &str, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "mutation LikePost($postId: ID!) {{ likePost(postId: $postId) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "postId": post_id })), Some("likePost"))
            .await
    }

    pub async fn delete_post(&mut self, post_id: &str, shape: &str) -> Result<Value, Error> {
        let query = format!(
            "mutation DeletePost($postId: ID!) {{ deletePost(postId: $postId) {{ {} }} }}",
            shape
        );
        self.graphql(&query, Some(&json!({ "postId": post_id })), Some("deletePost"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::engine::extensions::TOKEN_HEADER;
    use maplit::hashmap;

    /// Passes if a new client is created with the given endpoint and headers
    #[test]
    fn new_with_http() {
        let client = Client::new_with_http(
            "http://localhost:5000/graphql",
            Some(hashmap! {"x-request-source" => "test"}),
        )
        .unwrap();

        match client {
            Client::Http { endpoint, headers } => {
                assert_eq!(endpoint, "http://localhost:5000/graphql");
                assert_eq!(headers.get("x-request-source").unwrap(), "test");
            }
            Client::Local { .. } => panic!("expected an http client"),
        }
    }

    /// Passes if a header name that is not valid in HTTP is refused
    #[test]
    fn new_with_http_bad_header() {
        assert!(Client::new_with_http(
            "http://localhost:5000/graphql",
            Some(hashmap! {"bad header" => "x"}),
        )
        .is_err());
    }

    /// Passes if the token header is set, then removed
    #[test]
    fn token_header() {
        let mut client = Client::new_with_http("http://localhost:5000/graphql", None).unwrap();
        client.set_token("abc").unwrap();
        if let Client::Http { headers, .. } = &client {
            assert_eq!(headers.get(TOKEN_HEADER).unwrap(), "abc");
        }

        client.clear_token();
        if let Client::Http { headers, .. } = &client {
            assert!(headers.get(TOKEN_HEADER).is_none());
        }
    }
}
