//! Core types for Apex.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod envelope;
pub mod id;
pub mod price;
pub mod user;

pub use cart::{CartItem, Quantity, QuantityError};
pub use email::{Email, EmailError};
pub use envelope::{ApiResponse, SUCCESS_CODE};
pub use id::*;
pub use price::{Price, PriceError};
pub use user::User;
