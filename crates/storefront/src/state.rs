//! Process-wide storefront state.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::http::{ApiClient, RequestConfig, RequestExecutor};
use crate::pages::{Header, LoginForm, LoginPage, RegisterForm, RegisterPage};
use crate::session::SessionStore;
use crate::storage::{FileStorage, Storage};

/// Everything a front-end needs, created once at startup.
///
/// This struct is cheaply cloneable via `Arc`; clones share the API client,
/// storage and session store.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    storage: Arc<dyn Storage>,
    api: ApiClient,
    session: SessionStore,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Open file-backed storage at `config.state_path` and initialize.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file exists but cannot be read, or the
    /// HTTP client cannot be built.
    pub async fn start(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::open(&config.state_path)?);
        Self::with_storage(config, storage).await
    }

    /// Initialize on top of an existing storage backend.
    ///
    /// Restores the cart and, if the backend still recognises the persisted
    /// session cookie, the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[instrument(skip_all, fields(api_url = %config.api_url))]
    pub async fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, AppError> {
        let api = ApiClient::new(&config.api_url, Arc::clone(&storage))?;
        let session = SessionStore::initialize(&api, Arc::clone(&storage)).await;

        info!(
            authenticated = session.is_authenticated(),
            cart_lines = session.cart().len(),
            "Storefront ready"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                storage,
                api,
                session,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Executor for `config`, falling back to the configured API token.
    #[must_use]
    pub fn request(&self, mut config: RequestConfig) -> RequestExecutor {
        if config.token.is_none() {
            config.token.clone_from(&self.inner.config.api_token);
        }
        self.inner.api.executor(config)
    }

    #[must_use]
    pub fn login_page(&self, form: LoginForm) -> LoginPage {
        LoginPage::new(self.inner.api.clone(), self.inner.session.clone(), form)
            .with_token(self.inner.config.api_token.clone())
    }

    #[must_use]
    pub fn register_page(&self, form: RegisterForm) -> RegisterPage {
        RegisterPage::new(self.inner.api.clone(), self.inner.session.clone(), form)
            .with_token(self.inner.config.api_token.clone())
    }

    #[must_use]
    pub fn header(&self) -> Header {
        Header::from_store(&self.inner.session)
    }
}
