//! Apex Core - Shared types library.
//!
//! This crate provides common types used across all Apex components:
//! - `storefront` - Session/cart store, request executor and auth pages
//! - `cli` - Command-line front-end for the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, plus the
//!   user, cart and response envelope records exchanged with the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
