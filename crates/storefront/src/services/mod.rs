//! Cross-cutting services shared by storefront operations.
//!
//! - `error_log` - Deduplicated error reporting to tracing and Sentry

pub mod error_log;

pub use error_log::ErrorLog;
