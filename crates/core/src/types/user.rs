//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// The identity record returned by the backend's auth endpoints.
///
/// Replaced wholesale on login and cleared on logout; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend-assigned identifier.
    pub id: UserId,
    /// Account email.
    pub email: Email,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl User {
    /// First and last name joined with a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}
