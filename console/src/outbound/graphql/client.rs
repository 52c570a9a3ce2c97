//! GraphQL client: authenticated POSTs with retries and failure
//! classification.
//!
//! Network failures and 5xx replies are retried with linear backoff. Once
//! retries are exhausted, or for any other non-2xx reply, the failure is
//! classified into a user-facing message. A 401 triggers sign-in once and
//! surfaces as [`GatewayError::Unauthenticated`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::documents::{DocumentError, DocumentSet};
use super::envelope::response_field;
use super::http::{GraphqlHttp, HttpReply};
use crate::domain::http_failure::{RetryPolicy, UNEXPECTED_MESSAGE, classify};
use crate::domain::ports::{GatewayError, IdentityProvider};

/// Waits between retries.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Executes named GraphQL operations for the entity gateways.
pub struct GraphqlClient {
    http: Arc<dyn GraphqlHttp>,
    identity: Arc<dyn IdentityProvider>,
    documents: DocumentSet,
    retry: RetryPolicy,
    sleeper: Arc<dyn RetrySleeper>,
}

impl GraphqlClient {
    /// Client using the default retry policy and real sleeps.
    pub fn new(
        http: Arc<dyn GraphqlHttp>,
        identity: Arc<dyn IdentityProvider>,
        documents: DocumentSet,
    ) -> Self {
        Self {
            http,
            identity,
            documents,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn RetrySleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Whether a document is loaded for `field`.
    pub fn supports(&self, field: &str) -> bool {
        self.documents.get(field).is_ok()
    }

    /// Run the document for `field` and return the raw value of
    /// `data.<field>`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for GraphQL rejections, classified HTTP
    /// failures, authentication failures, and malformed responses.
    pub async fn execute(
        &self,
        field: &str,
        variables: Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        let document = self
            .documents
            .get(field)
            .map_err(|err: DocumentError| GatewayError::decode(err.to_string()))?;
        let token = match self.identity.valid_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(field, error = %err, "no access token; requesting sign-in");
                return Err(self.reauthenticate().await);
            }
        };
        let mut request = Map::new();
        request.insert("query".to_owned(), Value::String(document.to_owned()));
        request.insert("variables".to_owned(), Value::Object(variables));
        let body = Value::Object(request);

        let mut retry = 0_u32;
        loop {
            let reply = match self.http.post(&body, &token).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(field, error = %err, "graphql request did not complete");
                    HttpReply {
                        status: 0,
                        body: None,
                    }
                }
            };
            if reply.is_success() {
                debug!(field, retries = retry, "graphql request succeeded");
                return response_field(reply.body, field);
            }

            retry = retry.saturating_add(1);
            if self.retry.allows(reply.status, retry) {
                let delay = self.retry.delay_for(retry);
                debug!(
                    field,
                    status = reply.status,
                    retry,
                    ?delay,
                    "retrying graphql request"
                );
                self.sleeper.sleep(delay).await;
                continue;
            }
            return Err(self.fail(field, &reply).await);
        }
    }

    async fn fail(&self, field: &str, reply: &HttpReply) -> GatewayError {
        let failure = classify(reply.status, reply.body.as_ref());
        if failure.reauthenticate {
            warn!(field, "graphql request unauthenticated; requesting sign-in");
            return self.reauthenticate().await;
        }
        let message = failure
            .message
            .unwrap_or_else(|| UNEXPECTED_MESSAGE.to_owned());
        warn!(
            field,
            status = failure.status,
            %message,
            "graphql request failed"
        );
        GatewayError::transport(failure.status, message)
    }

    async fn reauthenticate(&self) -> GatewayError {
        if let Err(err) = self.identity.login().await {
            warn!(error = %err, "sign-in trigger failed");
        }
        GatewayError::unauthenticated()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for retries, classification, and sign-in.
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::domain::http_failure::{SERVER_ERROR_MESSAGE, TOO_MANY_REQUESTS_MESSAGE};
    use crate::domain::ports::FixtureIdentityProvider;
    use crate::outbound::graphql::http::NetworkFailure;
    use crate::test_support::{RecordingSleeper, ScriptedHttp, http_reply, network_failure};

    struct Harness {
        http: Arc<ScriptedHttp>,
        identity: Arc<FixtureIdentityProvider>,
        sleeper: Arc<RecordingSleeper>,
        client: GraphqlClient,
    }

    impl Harness {
        async fn drivers(&self) -> Result<Value, GatewayError> {
            self.client.execute("drivers", Map::new()).await
        }
    }

    #[fixture]
    fn documents() -> DocumentSet {
        let query = "query GetAllDrivers { drivers { id } }";
        DocumentSet::default().with_document("drivers", query)
    }

    fn harness(
        replies: Vec<Result<HttpReply, NetworkFailure>>,
        documents: DocumentSet,
    ) -> Harness {
        let http = Arc::new(ScriptedHttp::new(replies));
        let identity = Arc::new(FixtureIdentityProvider::development());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = GraphqlClient::new(http.clone(), identity.clone(), documents)
            .with_sleeper(sleeper.clone());
        Harness {
            http,
            identity,
            sleeper,
            client,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn posts_document_with_bearer_token(documents: DocumentSet) {
        let reply = http_reply(200, json!({ "data": { "drivers": [] } }));
        let h = harness(vec![reply], documents);
        let mut variables = Map::new();
        variables.insert("limit".to_owned(), json!(5));

        let value = h.client.execute("drivers", variables).await;
        assert_eq!(value, Ok(json!([])));
        let requests = h.http.requests();
        let (body, token) = requests.first().expect("one request");
        assert_eq!(token, "dev-token");
        assert_eq!(body["variables"], json!({ "limit": 5 }));
        let query = body["query"].as_str().unwrap_or_default();
        assert!(query.contains("GetAllDrivers"));
    }

    #[rstest]
    #[tokio::test]
    async fn retries_server_errors_with_linear_backoff(documents: DocumentSet) {
        let h = harness(
            vec![
                http_reply(503, json!({})),
                network_failure(),
                http_reply(200, json!({ "data": { "drivers": [] } })),
            ],
            documents,
        );

        h.drivers().await.expect("third attempt succeeds");

        assert_eq!(h.http.calls(), 3);
        assert_eq!(
            h.sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn exhausted_retries_surface_classified_message(documents: DocumentSet) {
        let h = harness(
            vec![
                http_reply(500, json!({})),
                http_reply(500, json!({})),
                http_reply(500, json!({})),
            ],
            documents,
        );

        let err = h.drivers().await.expect_err("fails");

        assert_eq!(err, GatewayError::transport(500_u16, SERVER_ERROR_MESSAGE));
        assert_eq!(h.http.calls(), 3);
    }

    #[rstest]
    #[case(429, json!({}), TOO_MANY_REQUESTS_MESSAGE)]
    #[case(409, json!({ "message": "Licence number in use" }), "Licence number in use")]
    #[case(404, json!({}), "The requested resource was not found.")]
    #[tokio::test]
    async fn client_errors_are_not_retried(
        documents: DocumentSet,
        #[case] status: u16,
        #[case] body: Value,
        #[case] message: &str,
    ) {
        let h = harness(vec![http_reply(status, body)], documents);

        let err = h.drivers().await.expect_err("fails");

        assert_eq!(err, GatewayError::transport(status, message));
        assert!(h.sleeper.delays().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn unauthorised_reply_triggers_sign_in_once(documents: DocumentSet) {
        let h = harness(vec![http_reply(401, json!({}))], documents);

        let err = h.drivers().await.expect_err("fails");

        assert!(err.is_unauthenticated());
        assert_eq!(h.identity.login_calls(), 1);
        assert_eq!(h.http.calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_token_skips_request_and_signs_in(documents: DocumentSet) {
        let h = harness(Vec::new(), documents);
        h.identity.logout().await.expect("logout succeeds");

        let err = h.drivers().await.expect_err("fails");

        assert!(err.is_unauthenticated());
        assert_eq!(h.http.calls(), 0);
        assert_eq!(h.identity.login_calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn graphql_errors_are_rejections(documents: DocumentSet) {
        let body = json!({ "errors": [{ "message": "Driver is on a trip" }], "data": null });
        let h = harness(vec![http_reply(200, body)], documents);

        let err = h.drivers().await.expect_err("rejected");

        assert_eq!(err, GatewayError::rejected("Driver is on a trip"));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_field_fails_before_any_request(documents: DocumentSet) {
        let h = harness(Vec::new(), documents);
        assert!(!h.client.supports("vehicles"));
        let err = h.client.execute("vehicles", Map::new()).await;
        let err = err.expect_err("no document");
        assert!(err.is_decode());
        assert_eq!(h.http.calls(), 0);
    }
}
