//! Single round-trip request executor with observable state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use apex_core::ApiResponse;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use super::{ApiClient, HttpMethod};

/// Application code the backend uses for success.
const SUCCESS_CODE: f64 = 200.0;

/// Everything about a request that is fixed when the executor is created.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Path segment joined onto the API origin.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// JSON body; `None` means the request carries no body at all.
    pub body: Option<Value>,
    /// Value for the `authorization` header.
    pub token: Option<SecretString>,
}

impl RequestConfig {
    /// A body-less, unauthenticated request.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            token: None,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach any serializable value as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self, serde_json::Error> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    /// Send `token` verbatim in the `authorization` header.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }
}

/// Observable state of one executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState {
    /// Full parsed response body of the latest completed request.
    pub data: Option<Value>,
    /// `true` while any invocation has not completed.
    pub loading: bool,
    /// Transport failure message, or the body's `message` for error codes.
    pub error: Option<String>,
}

impl RequestState {
    /// Interpret `data` as the backend's response envelope.
    ///
    /// Returns `None` when there is no data or it does not fit the envelope.
    #[must_use]
    pub fn envelope<T: DeserializeOwned>(&self) -> Option<ApiResponse<T>> {
        let data = self.data.as_ref()?;
        match serde_json::from_value(data.clone()) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!(error = %e, "Response body does not match the envelope");
                None
            }
        }
    }

    /// Record a completed round trip.
    fn complete(&mut self, outcome: Result<Value, reqwest::Error>) {
        match outcome {
            Ok(body) => {
                if has_error_code(&body) {
                    self.error = message_of(&body);
                }
                self.data = Some(body);
            }
            Err(e) => self.error = Some(e.to_string()),
        }
        self.loading = false;
    }
}

/// `true` when the body carries a numeric `code` other than 200.
fn has_error_code(body: &Value) -> bool {
    body.get("code")
        .and_then(Value::as_f64)
        .is_some_and(|code| (code - SUCCESS_CODE).abs() > f64::EPSILON)
}

fn message_of(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

/// Performs one request configuration any number of times.
///
/// Calls are not serialized: overlapping invocations race and whichever
/// completes last owns `data` and `error`. `loading` stays set until every
/// overlapping call has completed. There are no retries, timeouts or
/// cancellation.
#[derive(Clone)]
pub struct RequestExecutor {
    api: ApiClient,
    config: Arc<RequestConfig>,
    state: Arc<watch::Sender<RequestState>>,
    /// Only touched inside `send_modify`, so it moves in step with `state`.
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor in the idle state.
    #[must_use]
    pub fn new(api: ApiClient, config: RequestConfig) -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            api,
            config: Arc::new(config),
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The fixed request configuration.
    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    /// Start a round trip.
    ///
    /// `loading` is `true` and `error` cleared before this returns; the
    /// request itself runs on a spawned task whose handle is returned so
    /// callers can wait for it if they want to.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn fetch_data(&self) -> JoinHandle<()> {
        self.state.send_modify(|state| {
            self.in_flight.fetch_add(1, Ordering::Relaxed);
            state.loading = true;
            state.error = None;
        });

        let this = self.clone();
        let span = info_span!(
            "fetch_data",
            method = %self.config.method,
            url = %self.config.url
        );
        tokio::spawn(
            async move {
                let outcome = this.round_trip().await;
                if let Err(e) = &outcome {
                    warn!(error = %e, "Request failed");
                }
                this.state.send_modify(|state| {
                    state.complete(outcome);
                    state.loading = this.in_flight.fetch_sub(1, Ordering::Relaxed) > 1;
                });
            }
            .instrument(span),
        )
    }

    /// Start a round trip and wait for it, returning the final state.
    pub async fn execute(&self) -> RequestState {
        if let Err(e) = self.fetch_data().await {
            warn!(error = %e, "Request task did not complete");
        }
        self.state()
    }

    async fn round_trip(&self) -> Result<Value, reqwest::Error> {
        let mut request = self
            .api
            .http()
            .request(self.config.method.into(), self.api.endpoint(&self.config.url))
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &self.config.token {
            request = request.header(AUTHORIZATION, token.expose_secret());
        }
        if let Some(body) = &self.config.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        response.json::<Value>().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::storage::MemoryStorage;

    fn unreachable_api() -> ApiClient {
        // Port 1 is reserved and refuses connections on loopback
        ApiClient::new(
            &Url::parse("http://127.0.0.1:1").unwrap(),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_complete_with_error_code() {
        let mut state = RequestState {
            loading: true,
            ..RequestState::default()
        };
        let body = json!({"code": 404, "message": "Not found"});
        state.complete(Ok(body.clone()));

        assert_eq!(state.error.as_deref(), Some("Not found"));
        assert_eq!(state.data, Some(body));
        assert!(!state.loading);
    }

    #[test]
    fn test_complete_with_success_code() {
        let mut state = RequestState::default();
        let body = json!({"code": 200, "data": {"items": [1, 2, 3]}});
        state.complete(Ok(body.clone()));

        assert_eq!(state.error, None);
        assert_eq!(state.data, Some(body));
    }

    #[test]
    fn test_complete_without_code_is_not_an_error() {
        let mut state = RequestState::default();
        state.complete(Ok(json!({"success": false, "message": "nope"})));
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_error_code_without_message() {
        let mut state = RequestState::default();
        state.complete(Ok(json!({"code": 500})));
        assert_eq!(state.error, None);
        assert!(state.data.is_some());
    }

    #[test]
    fn test_envelope_accessor() {
        let state = RequestState {
            data: Some(json!({"code": 400, "message": "Bad Request"})),
            ..RequestState::default()
        };
        let envelope = state.envelope::<Value>().unwrap();
        assert_eq!(envelope.code, Some(400));
        assert_eq!(envelope.message.as_deref(), Some("Bad Request"));

        let not_an_object = RequestState {
            data: Some(json!([1, 2])),
            ..RequestState::default()
        };
        assert!(not_an_object.envelope::<Value>().is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = RequestConfig::new(HttpMethod::Post, "users")
            .with_json(&json!({"a": 1}))
            .unwrap()
            .with_token(SecretString::from("Bearer token123"));
        assert_eq!(config.body, Some(json!({"a": 1})));
        assert_eq!(config.token.unwrap().expose_secret(), "Bearer token123");
    }

    #[tokio::test]
    async fn test_initial_state() {
        let executor =
            unreachable_api().executor(RequestConfig::new(HttpMethod::Get, "test-endpoint"));
        assert_eq!(executor.state(), RequestState::default());
    }

    #[tokio::test]
    async fn test_transport_failure_sets_error_and_clears_loading() {
        let executor =
            unreachable_api().executor(RequestConfig::new(HttpMethod::Get, "test-endpoint"));

        let handle = executor.fetch_data();
        assert!(executor.state().loading);

        handle.await.unwrap();
        let state = executor.state();
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn test_new_call_clears_previous_error() {
        let executor =
            unreachable_api().executor(RequestConfig::new(HttpMethod::Get, "test-endpoint"));
        executor.execute().await;
        assert!(executor.state().error.is_some());

        let handle = executor.fetch_data();
        let state = executor.state();
        assert!(state.loading);
        assert_eq!(state.error, None);
        handle.await.unwrap();
    }
}
