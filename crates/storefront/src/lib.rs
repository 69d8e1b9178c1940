//! Apex Storefront library.
//!
//! Client-side core of the Apex shop: the session/cart store shared by every
//! page, the request executor used for form submissions, and the login,
//! registration and header page models built on top of them. All business
//! logic lives in the backend API; this crate only keeps local state in sync
//! with it.
//!
//! # Example
//!
//! ```rust,ignore
//! use apex_storefront::{config::StorefrontConfig, state::Storefront};
//!
//! let storefront = Storefront::start(StorefrontConfig::from_env()?).await?;
//! if let Some(user) = storefront.session().user() {
//!     println!("Welcome back, {}", user.first_name);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod pages;
pub mod session;
pub mod state;
pub mod storage;
