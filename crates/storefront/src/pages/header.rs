//! Site header: brand, greeting and the login/logout control.

use std::fmt;

use super::Route;
use crate::session::{SessionSnapshot, SessionStore};

/// Brand shown at the left of the header.
pub const BRAND: &str = "Apex";

/// Who the header is talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderView {
    Authenticated { greeting: String },
    Anonymous,
}

/// The single button in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    /// Clear the user from the session store.
    Logout,
    /// Go to another page.
    Navigate(Route),
}

impl HeaderAction {
    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Logout => "Logout",
            Self::Navigate(_) => "Login",
        }
    }
}

/// Header model derived from the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub brand: &'static str,
    pub view: HeaderView,
    pub cart_count: u32,
}

impl Header {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let view = snapshot
            .user
            .as_ref()
            .map_or(HeaderView::Anonymous, |user| HeaderView::Authenticated {
                greeting: format!("Welcome, {}", user.first_name),
            });

        Self {
            brand: BRAND,
            view,
            cart_count: snapshot.cart_count(),
        }
    }

    #[must_use]
    pub fn from_store(store: &SessionStore) -> Self {
        Self::from_snapshot(&store.snapshot())
    }

    /// What the header button does.
    #[must_use]
    pub const fn action(&self) -> HeaderAction {
        match self.view {
            HeaderView::Authenticated { .. } => HeaderAction::Logout,
            HeaderView::Anonymous => HeaderAction::Navigate(Route::Login),
        }
    }

    /// Carry out the header button against `store`.
    ///
    /// Returns the route to navigate to, if any.
    pub fn activate(&self, store: &SessionStore) -> Option<Route> {
        match self.action() {
            HeaderAction::Logout => {
                store.logout();
                None
            }
            HeaderAction::Navigate(route) => Some(route),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.brand)?;
        if let HeaderView::Authenticated { greeting } = &self.view {
            write!(f, " | {greeting}")?;
        }
        write!(f, " | Cart ({})", self.cart_count)?;
        write!(f, " | [{}]", self.action().label())
    }
}
