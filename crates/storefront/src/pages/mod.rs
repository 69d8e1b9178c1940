//! Page models.
//!
//! Each page owns its form state, validates it, drives a request through the
//! executor and reports what the UI should do next. Rendering is left to the
//! front-end.

pub mod auth;
pub mod header;

pub use auth::{FormError, LoginForm, LoginPage, RegisterForm, RegisterPage};
pub use header::{Header, HeaderAction, HeaderView};

/// Client-side routes a page can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
}

impl Route {
    /// Path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/auth/login",
            Self::Register => "/auth/register",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// What a page submission resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Navigate to another route.
    Navigate(Route),
    /// Stay on the page and show this message inline.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.to_string(), "/");
        assert_eq!(Route::Login.path(), "/auth/login");
        assert_eq!(Route::Register.path(), "/auth/register");
    }
}
