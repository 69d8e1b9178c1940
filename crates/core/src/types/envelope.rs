//! The response envelope shared by every backend endpoint.

use serde::{Deserialize, Serialize};

/// Status code the backend uses for a successful operation.
pub const SUCCESS_CODE: i64 = 200;

/// `{ code?, success?, data?, message? }` as returned by the backend.
///
/// Every field is optional; endpoints populate different subsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    /// Application-level status code (distinct from the HTTP status).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Whether the operation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Operation payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message, usually present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Default for ApiResponse<T> {
    fn default() -> Self {
        Self {
            code: None,
            success: None,
            data: None,
            message: None,
        }
    }
}

impl<T> ApiResponse<T> {
    /// `true` only when the backend explicitly reported `success: true`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.success, Some(true))
    }

    /// `true` when a `code` is present and differs from 200.
    #[must_use]
    pub const fn has_error_code(&self) -> bool {
        matches!(self.code, Some(code) if code != SUCCESS_CODE)
    }

    /// The message to surface for an error code, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        if self.has_error_code() {
            self.message.as_deref()
        } else {
            None
        }
    }

    /// The payload, only when the operation succeeded.
    #[must_use]
    pub fn into_success_data(self) -> Option<T> {
        if self.is_success() { self.data } else { None }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::User;

    #[test]
    fn test_error_code_with_message() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"code":404,"message":"Not found"}"#).unwrap();
        assert!(resp.has_error_code());
        assert_eq!(resp.error_message(), Some("Not found"));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_success_code_has_no_error() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"code":200,"message":"OK"}"#).unwrap();
        assert!(!resp.has_error_code());
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn test_typed_user_payload() {
        let resp: ApiResponse<User> = serde_json::from_str(
            r#"{"success":true,"data":{"id":"7","email":"x@y.z","firstName":"X","lastName":"Y"}}"#,
        )
        .unwrap();
        let user = resp.into_success_data().unwrap();
        assert_eq!(user.id.as_str(), "7");
    }

    #[test]
    fn test_unsuccessful_payload_is_withheld() {
        let resp: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"data":{"id":"7"}}"#).unwrap();
        assert!(resp.into_success_data().is_none());
    }

    #[test]
    fn test_empty_object() {
        let resp: ApiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp, ApiResponse::default());
    }

    fn parse<T: serde::de::DeserializeOwned>(raw: &str) -> ApiResponse<T> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_payload_without_default_impl() {
        let resp: ApiResponse<User> = parse(r#"{"message":"Not authenticated"}"#);
        assert_eq!(resp.code, None);
        assert_eq!(resp.data, None);
        assert_eq!(resp.message.as_deref(), Some("Not authenticated"));
        assert!(!resp.has_error_code());
    }
}
