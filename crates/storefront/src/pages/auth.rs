//! Login and registration pages.
//!
//! Both pages validate locally, post the form to the backend and, when the
//! response carries `success: true` with a user, commit that user to the
//! session store and send the visitor home.

use apex_core::{ApiResponse, Email, User};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::{PageOutcome, Route};
use crate::http::{ApiClient, HttpMethod, RequestConfig, RequestState};
use crate::session::SessionStore;

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "api/auth/login";

/// Path of the registration endpoint.
pub const REGISTER_PATH: &str = "api/auth/register";

/// Shortest password accepted before contacting the backend.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REGISTER_FAILED: &str = "Registration failed. Please check your credentials.";

/// Form input rejected before submission.
///
/// The display strings are shown to the visitor as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// Checks shared by every credential form, in the order the visitor sees them.
fn validate_credentials(email: &str, password: &str) -> Result<Email, FormError> {
    if email.is_empty() || password.is_empty() {
        return Err(FormError::MissingFields);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(FormError::PasswordTooShort);
    }
    Email::parse(email).map_err(|_| FormError::InvalidEmail)
}

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl LoginForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] the input violates.
    pub fn validate(&self) -> Result<Email, FormError> {
        validate_credentials(&self.email, self.password.expose_secret())
    }

    fn body(&self) -> LoginBody<'_> {
        LoginBody {
            email: &self.email,
            password: self.password.expose_secret(),
        }
    }
}

/// Registration form data.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

impl RegisterForm {
    /// Validate the form.
    ///
    /// Password confirmation is checked by the backend.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] the input violates.
    pub fn validate(&self) -> Result<Email, FormError> {
        if self.first_name.is_empty()
            || self.last_name.is_empty()
            || self.confirm_password.expose_secret().is_empty()
        {
            return Err(FormError::MissingFields);
        }
        validate_credentials(&self.email, self.password.expose_secret())
    }

    fn body(&self) -> RegisterBody<'_> {
        RegisterBody {
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            password: self.password.expose_secret(),
            confirm_password: self.confirm_password.expose_secret(),
        }
    }
}

// =============================================================================
// Pages
// =============================================================================

/// The login page.
#[derive(Debug, Clone)]
pub struct LoginPage {
    api: ApiClient,
    store: SessionStore,
    form: LoginForm,
    token: Option<SecretString>,
}

impl LoginPage {
    #[must_use]
    pub const fn new(api: ApiClient, store: SessionStore, form: LoginForm) -> Self {
        Self {
            api,
            store,
            form,
            token: None,
        }
    }

    /// Send `token` in the `authorization` header on submit.
    #[must_use]
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub const fn form(&self) -> &LoginForm {
        &self.form
    }

    /// Validate, submit and settle the form.
    #[instrument(skip(self), fields(email = %self.form.email))]
    pub async fn submit(&self) -> PageOutcome {
        if let Err(e) = self.form.validate() {
            debug!(error = %e, "Login form rejected");
            return PageOutcome::Error(e.to_string());
        }

        let config = match RequestConfig::new(HttpMethod::Post, LOGIN_PATH).with_json(&self.form.body())
        {
            Ok(config) => with_optional_token(config, self.token.as_ref()),
            Err(e) => return PageOutcome::Error(e.to_string()),
        };

        let state = self.api.executor(config).execute().await;
        settle(&self.store, &state, LOGIN_FAILED)
    }
}

/// The registration page.
#[derive(Debug, Clone)]
pub struct RegisterPage {
    api: ApiClient,
    store: SessionStore,
    form: RegisterForm,
    token: Option<SecretString>,
}

impl RegisterPage {
    #[must_use]
    pub const fn new(api: ApiClient, store: SessionStore, form: RegisterForm) -> Self {
        Self {
            api,
            store,
            form,
            token: None,
        }
    }

    /// Send `token` in the `authorization` header on submit.
    #[must_use]
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub const fn form(&self) -> &RegisterForm {
        &self.form
    }

    /// Validate, submit and settle the form.
    #[instrument(skip(self), fields(email = %self.form.email))]
    pub async fn submit(&self) -> PageOutcome {
        if let Err(e) = self.form.validate() {
            debug!(error = %e, "Registration form rejected");
            return PageOutcome::Error(e.to_string());
        }

        let config =
            match RequestConfig::new(HttpMethod::Post, REGISTER_PATH).with_json(&self.form.body()) {
                Ok(config) => with_optional_token(config, self.token.as_ref()),
                Err(e) => return PageOutcome::Error(e.to_string()),
            };

        let state = self.api.executor(config).execute().await;
        settle(&self.store, &state, REGISTER_FAILED)
    }
}

fn with_optional_token(config: RequestConfig, token: Option<&SecretString>) -> RequestConfig {
    match token {
        Some(token) => config.with_token(token.clone()),
        None => config,
    }
}

/// Turn a finished request into a page outcome.
///
/// A successful envelope with a user logs in and navigates home. Otherwise
/// the executor error wins, then the body's `message`, then `fallback`.
fn settle(store: &SessionStore, state: &RequestState, fallback: &str) -> PageOutcome {
    let envelope: ApiResponse<Value> = state.envelope().unwrap_or_default();

    if envelope.is_success()
        && let Some(user) = envelope
            .data
            .clone()
            .and_then(|data| serde_json::from_value::<User>(data).ok())
    {
        info!(user_id = %user.id, "Logged in");
        store.login(user);
        return PageOutcome::Navigate(Route::Home);
    }

    if let Some(error) = &state.error {
        return PageOutcome::Error(error.clone());
    }

    match envelope.message {
        Some(message) if !message.is_empty() => PageOutcome::Error(message),
        _ => PageOutcome::Error(fallback.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: SecretString::from(password),
        }
    }

    fn register_form() -> RegisterForm {
        RegisterForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: SecretString::from("secret123"),
            confirm_password: SecretString::from("secret123"),
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStorage::new()), Vec::new())
    }

    fn finished(data: Value, error: Option<&str>) -> RequestState {
        RequestState {
            data: Some(data),
            loading: false,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_login_validation_order() {
        assert_eq!(
            login_form("", "secret123").validate(),
            Err(FormError::MissingFields)
        );
        assert_eq!(
            login_form("a@b.com", "").validate(),
            Err(FormError::MissingFields)
        );
        assert_eq!(
            login_form("a@b.com", "12345").validate(),
            Err(FormError::PasswordTooShort)
        );
        assert_eq!(
            login_form("ab.com", "123456").validate(),
            Err(FormError::InvalidEmail)
        );
        assert!(login_form("a@b.com", "123456").validate().is_ok());
    }

    #[test]
    fn test_form_error_messages() {
        assert_eq!(FormError::MissingFields.to_string(), "Please fill in all fields");
        assert_eq!(
            FormError::PasswordTooShort.to_string(),
            "Password must be at least 6 characters long"
        );
        assert_eq!(
            FormError::InvalidEmail.to_string(),
            "Please enter a valid email address"
        );
    }

    #[test]
    fn test_register_requires_every_field() {
        assert!(register_form().validate().is_ok());

        let mut form = register_form();
        form.last_name.clear();
        assert_eq!(form.validate(), Err(FormError::MissingFields));

        let mut form = register_form();
        form.confirm_password = SecretString::from("");
        assert_eq!(form.validate(), Err(FormError::MissingFields));
    }

    #[test]
    fn test_register_body_is_camel_case() {
        let form = register_form();
        let body = serde_json::to_value(form.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": "secret123",
                "confirmPassword": "secret123"
            })
        );
    }

    #[test]
    fn test_form_debug_redacts_password() {
        let debug_output = format!("{:?}", login_form("a@b.com", "hunter22"));
        assert!(!debug_output.contains("hunter22"));
    }

    #[test]
    fn test_settle_success_logs_in() {
        let store = store();
        let state = finished(
            json!({
                "code": 200,
                "success": true,
                "data": {"id": "1", "email": "a@b.com", "firstName": "A", "lastName": "B"}
            }),
            None,
        );

        assert_eq!(
            settle(&store, &state, LOGIN_FAILED),
            PageOutcome::Navigate(Route::Home)
        );
        assert_eq!(store.user().unwrap().first_name, "A");
    }

    #[test]
    fn test_settle_prefers_executor_error() {
        let store = store();
        let state = finished(
            json!({"code": 401, "message": "Invalid credentials"}),
            Some("Invalid credentials"),
        );
        assert_eq!(
            settle(&store, &state, LOGIN_FAILED),
            PageOutcome::Error("Invalid credentials".to_string())
        );
        assert!(store.user().is_none());
    }

    #[test]
    fn test_settle_surfaces_message_without_code() {
        let store = store();
        let state = finished(json!({"success": false, "message": "Email already used"}), None);
        assert_eq!(
            settle(&store, &state, REGISTER_FAILED),
            PageOutcome::Error("Email already used".to_string())
        );
    }

    #[test]
    fn test_settle_fallback() {
        let store = store();
        let state = finished(json!({"success": true}), None);
        assert_eq!(
            settle(&store, &state, REGISTER_FAILED),
            PageOutcome::Error(REGISTER_FAILED.to_string())
        );
        assert!(store.user().is_none());
    }

    #[test]
    fn test_settle_transport_failure() {
        let store = store();
        let state = RequestState {
            data: None,
            loading: false,
            error: Some("connection refused".to_string()),
        };
        assert_eq!(
            settle(&store, &state, LOGIN_FAILED),
            PageOutcome::Error("connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_network() {
        // Unroutable API: any request would surface a transport error instead
        let api = ApiClient::new(
            &url::Url::parse("http://127.0.0.1:1").unwrap(),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();
        let page = LoginPage::new(api, store(), login_form("a@b.com", "123"));
        assert_eq!(
            page.submit().await,
            PageOutcome::Error("Password must be at least 6 characters long".to_string())
        );
    }
}
