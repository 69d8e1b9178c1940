//! Integration tests for the Apex storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p apex-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `executor` - Request executor wire behavior and state transitions
//! - `session` - Session restore, cart persistence and cookie replay
//! - `pages` - Login, registration and header flows end to end
//!
//! Every test talks to a [`MockBackend`]: an in-process `axum` server bound
//! to an ephemeral loopback port that mimics the auth API and records each
//! request it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use apex_storefront::config::StorefrontConfig;
use apex_storefront::state::Storefront;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Email of the account every backend starts with.
pub const SEEDED_EMAIL: &str = "ada@example.com";

/// Password of the seeded account.
pub const SEEDED_PASSWORD: &str = "secret123";

/// Name of the session cookie the backend sets.
pub const SESSION_COOKIE: &str = "session";

/// How long `/api/test/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(200);

/// Path whose first call waits [`SLOW_DELAY`] and later calls answer at once.
pub const FIRST_SLOW_PATH: &str = "/api/test/first-slow";

// =============================================================================
// Recorded Requests
// =============================================================================

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    /// Raw body; `None` when the request carried no bytes.
    pub body: Option<String>,
}

impl RecordedRequest {
    /// The body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

impl Account {
    fn user_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "firstName": self.first_name,
            "lastName": self.last_name,
        })
    }

    fn session_token(&self) -> String {
        format!("tok-{}", self.id)
    }
}

#[derive(Default)]
struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    accounts: Mutex<Vec<Account>>,
    first_slow_calls: AtomicUsize,
}

impl BackendState {
    fn record(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };

        let request = RecordedRequest {
            method,
            path: uri.path().to_owned(),
            content_type: header_str(header::CONTENT_TYPE),
            authorization: header_str(header::AUTHORIZATION),
            cookie: header_str(header::COOKIE),
            body: (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned()),
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn account_for_cookie(&self, headers: &HeaderMap) -> Option<Account> {
        let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = cookie.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })?;

        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|account| account.session_token() == token)
            .cloned()
    }
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<BackendState>>;

fn logged_in(account: &Account) -> Response {
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly",
        account.session_token()
    );
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({"code": 200, "success": true, "data": account.user_json()})),
    )
        .into_response()
}

async fn me(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);

    match state.account_for_cookie(&headers) {
        Some(account) => {
            Json(json!({"code": 200, "success": true, "data": account.user_json()})).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "success": false, "message": "Not authenticated"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);

    let Ok(credentials) = serde_json::from_slice::<LoginBody>(&body) else {
        return Json(json!({"code": 400, "success": false, "message": "Bad Request"}))
            .into_response();
    };

    let account = state
        .accounts
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .find(|a| a.email == credentials.email && a.password == credentials.password)
        .cloned();

    match account {
        Some(account) => logged_in(&account),
        None => Json(json!({"code": 401, "success": false, "message": "Invalid credentials"}))
            .into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn register(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);

    let Ok(form) = serde_json::from_slice::<RegisterBody>(&body) else {
        return Json(json!({"code": 400, "success": false, "message": "Bad Request"}))
            .into_response();
    };

    if form.password != form.confirm_password {
        return Json(json!({"success": false, "message": "Passwords do not match"}))
            .into_response();
    }

    let mut accounts = state
        .accounts
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if accounts.iter().any(|a| a.email == form.email) {
        // No code: the page has to fall back to the body message
        return Json(json!({"success": false, "message": "Email already registered"}))
            .into_response();
    }

    let account = Account {
        id: (accounts.len() + 1).to_string(),
        email: form.email,
        password: form.password,
        first_name: form.first_name,
        last_name: form.last_name,
    };
    accounts.push(account.clone());
    drop(accounts);

    logged_in(&account)
}

async fn echo(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method.clone(), &uri, &headers, &body);
    Json(json!({
        "code": 200,
        "data": {
            "method": method.as_str(),
            "bodyLength": body.len(),
        }
    }))
    .into_response()
}

async fn ok(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);
    Json(json!({"code": 200, "data": {"items": [1, 2, 3]}})).into_response()
}

async fn not_found(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": 404, "message": "Not found"})),
    )
        .into_response()
}

async fn slow(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({"code": 200, "data": {"slow": true}})).into_response()
}

async fn first_slow(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);
    let call = state.first_slow_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call == 1 {
        tokio::time::sleep(SLOW_DELAY).await;
    }
    Json(json!({"code": 200, "data": {"call": call}})).into_response()
}

async fn not_json(
    State(state): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(method, &uri, &headers, &body);
    "plain text, not JSON".into_response()
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-process stand-in for the backend API.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral loopback port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        state
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Account {
                id: "1".to_owned(),
                email: SEEDED_EMAIL.to_owned(),
                password: SEEDED_PASSWORD.to_owned(),
                first_name: "Ada".to_owned(),
                last_name: "Lovelace".to_owned(),
            });

        let app = Router::new()
            .route("/api/auth/me", get(me))
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/test/echo", any(echo))
            .route("/api/test/ok", get(ok))
            .route("/api/test/not-found", get(not_found))
            .route("/api/test/slow", get(slow))
            .route(FIRST_SLOW_PATH, get(first_slow))
            .route("/api/test/not-json", get(not_json))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock backend");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Origin to configure the client with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// TestContext
// =============================================================================

/// A mock backend plus a private state directory.
///
/// Each call to [`TestContext::storefront`] behaves like a fresh process
/// started against the same state file.
pub struct TestContext {
    pub backend: MockBackend,
    dir: TempDir,
}

impl TestContext {
    /// # Panics
    ///
    /// Panics if the backend or temporary directory cannot be created.
    pub async fn new() -> Self {
        Self {
            backend: MockBackend::start().await,
            dir: tempfile::tempdir().expect("create state dir"),
        }
    }

    /// Configuration pointing at the mock backend and the state file.
    ///
    /// # Panics
    ///
    /// Panics if the backend URL is rejected.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_api(&self.backend.url(), self.dir.path().join("state.json"))
            .expect("mock backend URL is valid")
    }

    /// Start a storefront the way a new process would.
    ///
    /// # Panics
    ///
    /// Panics if startup fails.
    pub async fn storefront(&self) -> Storefront {
        Storefront::start(self.config())
            .await
            .expect("start storefront")
    }
}
