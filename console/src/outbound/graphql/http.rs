//! Reqwest-backed HTTP exchange for the GraphQL endpoint.
//!
//! This layer only moves bytes: it posts the request body with a bearer
//! token and hands back the status and the body parsed as JSON. Retries,
//! classification, and decoding happen in the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use crate::domain::AccessToken;

const USER_AGENT: &str = "fleet-console/0.1";

/// Status and body of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Body parsed as JSON; `None` when empty or not JSON.
    pub body: Option<Value>,
}

impl HttpReply {
    /// Whether the status is 2xx.
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request did not complete: {message}")]
pub struct NetworkFailure {
    /// Transport error text.
    pub message: String,
}

/// One POST against the GraphQL endpoint.
#[async_trait]
pub trait GraphqlHttp: Send + Sync {
    /// Post `body` as JSON with `token` as bearer credentials.
    async fn post(&self, body: &Value, token: &AccessToken) -> Result<HttpReply, NetworkFailure>;
}

/// [`GraphqlHttp`] over a reqwest client with a request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: Client,
    endpoint: Url,
}

impl ReqwestHttp {
    /// Build a client posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint requests are posted to.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlHttp for ReqwestHttp {
    async fn post(&self, body: &Value, token: &AccessToken) -> Result<HttpReply, NetworkFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(HttpReply {
            status,
            body: serde_json::from_slice(bytes.as_ref()).ok(),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> NetworkFailure {
    let message = if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        error.to_string()
    };
    NetworkFailure { message }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network helpers.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(301, false)]
    #[case(401, false)]
    #[case(500, false)]
    fn success_is_2xx(#[case] status: u16, #[case] expected: bool) {
        let reply = HttpReply { status, body: None };
        assert_eq!(reply.is_success(), expected);
    }

    #[test]
    fn keeps_configured_endpoint() {
        let endpoint = Url::parse("http://localhost:8080/graphql").expect("valid url");
        let http = ReqwestHttp::new(endpoint.clone(), Duration::from_secs(5))
            .expect("client builds");
        assert_eq!(http.endpoint(), &endpoint);
    }
}
