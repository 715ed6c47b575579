//! Deduplicating error reporter.
//!
//! Checkout pages retry and re-render; the same failure would otherwise be
//! logged and sent to Sentry on every attempt. [`ErrorLog`] remembers which
//! `(context, message)` pairs it has already emitted and drops repeats.
//!
//! The log is owned by a [`crate::Storefront`] and lives as long as it does.
//! Memory is bounded by `max_capacity`; once the bound is reached the least
//! recently seen keys are evicted and may be emitted again.

use std::sync::Arc;

use moka::future::Cache;

/// A bounded, deduplicating error reporter.
#[derive(Clone)]
pub struct ErrorLog {
    seen: Cache<Arc<str>, ()>,
}

impl std::fmt::Debug for ErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLog")
            .field("entries", &self.seen.entry_count())
            .finish()
    }
}

impl ErrorLog {
    /// Create a log that remembers up to `capacity` distinct errors.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            seen: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Report an error under a context label (e.g. `"fetchCartItems"`).
    ///
    /// Returns `true` when the error was emitted and `false` when the same
    /// context and message were already reported.
    pub async fn report<E>(&self, context: &str, error: &E) -> bool
    where
        E: std::error::Error + ?Sized,
    {
        let message = error.to_string();
        if !self.first_sighting(context, &message).await {
            return false;
        }

        let event_id = sentry::capture_error(error);
        tracing::error!(
            context,
            error = %message,
            sentry_event_id = %event_id,
            "Storefront operation failed"
        );
        true
    }

    /// Report a failure that has no error value, only a message.
    pub async fn report_message(&self, context: &str, message: &str) -> bool {
        if !self.first_sighting(context, message).await {
            return false;
        }

        let event_id = sentry::capture_message(message, sentry::Level::Error);
        tracing::error!(
            context,
            error = %message,
            sentry_event_id = %event_id,
            "Storefront operation failed"
        );
        true
    }

    /// Forget every reported error.
    pub fn clear(&self) {
        self.seen.invalidate_all();
    }

    async fn first_sighting(&self, context: &str, message: &str) -> bool {
        let key: Arc<str> = format!("{context}:{message}").into();
        self.seen.entry(key).or_insert(()).await.is_fresh()
    }
}
