//! Marketstall Core - Shared types library.
//!
//! This crate provides common types used across all Marketstall components:
//! - `storefront` - Checkout client library for the marketplace REST backend
//! - `cli` - The `mst` command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Money is always carried in integer minor currency units; conversion to
//! decimal major units happens at the wire boundary.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, quantities, contacts and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
