//! Unified error handling.
//!
//! The request executor and session restore never fail: they report problems
//! through observable state. The errors here cover the remaining genuine
//! failures (bad configuration, local storage I/O, HTTP client construction,
//! form validation) and are aggregated into [`AppError`] for front-ends.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::pages::FormError;

/// Errors raised by a [`crate::storage::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized for storage.
    #[error("failed to serialize value for storage: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Form input was rejected before submission.
    #[error("Invalid form: {0}")]
    Form(#[from] FormError),

    /// The backend rejected an operation.
    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(ConfigError::MissingEnvVar("APEX_API_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: APEX_API_URL"
        );

        let err = AppError::Rejected("Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_storage_error_includes_path() {
        let err = StorageError::Io {
            path: PathBuf::from("/tmp/state.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/state.json"));
    }
}
