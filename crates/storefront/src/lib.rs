//! Marketstall storefront library.
//!
//! A client for the marketplace REST backend: it reads the persisted
//! session, loads the cart and shipping address, prices the checkout,
//! resolves discount codes, submits orders and hands payment off to the
//! processor.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use checkout::Checkout;
pub use config::StorefrontConfig;
pub use error::{CheckoutError, Result};
pub use models::{CurrentUser, Session, SessionStore};
pub use state::Storefront;
