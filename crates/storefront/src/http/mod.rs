//! HTTP access to the backend API.
//!
//! # Architecture
//!
//! - One shared [`ApiClient`] per process: a `reqwest` client plus the
//!   configured API origin and the persistent cookie jar
//! - One [`RequestExecutor`] per call site: a fixed request configuration
//!   and an observable `{data, loading, error}` state
//! - Every request is credentialed: cookies for the origin always go out
//!
//! # Example
//!
//! ```rust,ignore
//! use apex_storefront::http::{ApiClient, HttpMethod, RequestConfig};
//!
//! let api = ApiClient::new(&config.api_url, storage)?;
//! let executor = api.executor(RequestConfig::new(HttpMethod::Get, "api/auth/me"));
//!
//! let state = executor.execute().await;
//! if let Some(error) = state.error {
//!     tracing::warn!("{error}");
//! }
//! ```

mod executor;

pub use executor::{RequestConfig, RequestExecutor, RequestState};

use std::sync::Arc;

use url::Url;

use crate::cookies::PersistentCookieJar;
use crate::storage::Storage;

/// HTTP methods the backend API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Upper-case method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Shared, cheaply cloneable handle to the backend API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cookies: Arc<PersistentCookieJar>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("cookies", &self.inner.cookies)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `api_url`, restoring cookies from `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_url: &Url, storage: Arc<dyn Storage>) -> Result<Self, reqwest::Error> {
        let cookies = Arc::new(PersistentCookieJar::load(api_url, storage));

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: api_url.as_str().trim_end_matches('/').to_string(),
                cookies,
            }),
        })
    }

    /// Absolute URL for a path segment: origin, one `/`, then the path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// The configured API origin without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The cookie jar shared by every request.
    #[must_use]
    pub fn cookies(&self) -> &PersistentCookieJar {
        &self.inner.cookies
    }

    /// The underlying `reqwest` client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Create a request executor bound to this client.
    #[must_use]
    pub fn executor(&self, config: RequestConfig) -> RequestExecutor {
        RequestExecutor::new(self.clone(), config)
    }
}
