//! Subcommand implementations.

pub mod auth;
pub mod cart;

use apex_core::QuantityError;
use apex_storefront::error::AppError;
use thiserror::Error;

/// Errors a subcommand can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Storefront setup or a local operation failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// Quantity given on the command line is not a positive number.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),
}

impl From<apex_storefront::error::StorageError> for CommandError {
    fn from(e: apex_storefront::error::StorageError) -> Self {
        Self::App(AppError::from(e))
    }
}
