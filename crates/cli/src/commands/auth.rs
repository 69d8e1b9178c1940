//! Account commands: login, register, logout and whoami.
//!
//! # Environment Variables
//!
//! - `APEX_PASSWORD` - Password used when `--password` is omitted
//! - `APEX_CONFIRM_PASSWORD` - Confirmation used by `register`

use apex_storefront::error::AppError;
use apex_storefront::pages::{LoginForm, PageOutcome, RegisterForm};
use apex_storefront::state::Storefront;
use secrecy::SecretString;

use super::CommandError;

/// Raw registration input from the command line.
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Submit the login form.
pub async fn login(
    storefront: &Storefront,
    email: String,
    password: String,
) -> Result<(), CommandError> {
    let page = storefront.login_page(LoginForm {
        email,
        password: SecretString::from(password),
    });
    settle(storefront, page.submit().await)
}

/// Submit the registration form.
pub async fn register(
    storefront: &Storefront,
    registration: Registration,
) -> Result<(), CommandError> {
    let page = storefront.register_page(RegisterForm {
        first_name: registration.first_name,
        last_name: registration.last_name,
        email: registration.email,
        password: SecretString::from(registration.password),
        confirm_password: SecretString::from(registration.confirm_password),
    });
    settle(storefront, page.submit().await)
}

/// Forget the user locally and drop the backend session cookie.
pub fn logout(storefront: &Storefront) {
    storefront.session().logout();
    storefront.api().cookies().clear();
    tracing::info!("Logged out");
}

/// Print the header for the current session.
pub fn whoami(storefront: &Storefront) {
    tracing::info!("{}", storefront.header());
}

fn settle(storefront: &Storefront, outcome: PageOutcome) -> Result<(), CommandError> {
    match outcome {
        PageOutcome::Navigate(route) => {
            tracing::info!("{} (-> {route})", storefront.header());
            Ok(())
        }
        PageOutcome::Error(message) => Err(AppError::Rejected(message).into()),
    }
}
