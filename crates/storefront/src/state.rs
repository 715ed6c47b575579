//! Storefront state shared across operations.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError, StoreBackend};
use crate::checkout::{DiscountResolver, ShippingRates};
use crate::config::StorefrontConfig;
use crate::error::CheckoutError;
use crate::services::ErrorLog;

/// Storefront state shared across all operations.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend, the error log, discount resolution and configuration.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    backend: Arc<dyn StoreBackend>,
    errors: ErrorLog,
    discounts: DiscountResolver,
    rates: ShippingRates,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("rates", &self.inner.rates)
            .field("errors", &self.inner.errors)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a storefront talking to the configured REST API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let client = ApiClient::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// Create a storefront over any backend, with the coupon service backed
    /// by the static codes.
    #[must_use]
    pub fn with_backend(config: StorefrontConfig, backend: Arc<dyn StoreBackend>) -> Self {
        let errors = ErrorLog::new(config.error_log_capacity);
        let discounts =
            DiscountResolver::remote_with_static_fallback(Arc::clone(&backend), errors.clone());
        Self::from_parts(config, backend, errors, discounts)
    }

    /// Create a storefront with a custom discount resolver.
    #[must_use]
    pub fn with_discounts(
        config: StorefrontConfig,
        backend: Arc<dyn StoreBackend>,
        discounts: DiscountResolver,
    ) -> Self {
        let errors = ErrorLog::new(config.error_log_capacity);
        Self::from_parts(config, backend, errors, discounts)
    }

    fn from_parts(
        config: StorefrontConfig,
        backend: Arc<dyn StoreBackend>,
        errors: ErrorLog,
        discounts: DiscountResolver,
    ) -> Self {
        let rates = ShippingRates::new(config.express_shipping_fee);
        Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                errors,
                discounts,
                rates,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the marketplace backend.
    #[must_use]
    pub fn backend(&self) -> &dyn StoreBackend {
        self.inner.backend.as_ref()
    }

    /// Get a reference to the deduplicating error log.
    #[must_use]
    pub fn errors(&self) -> &ErrorLog {
        &self.inner.errors
    }

    /// Get a reference to the discount resolver.
    #[must_use]
    pub fn discounts(&self) -> &DiscountResolver {
        &self.inner.discounts
    }

    /// Get a reference to the shipping rates.
    #[must_use]
    pub fn rates(&self) -> &ShippingRates {
        &self.inner.rates
    }

    /// Report an API failure and wrap it with its context.
    pub(crate) async fn reported(&self, context: &'static str, error: ApiError) -> CheckoutError {
        self.errors().report(context, &error).await;
        CheckoutError::api(context, error)
    }
}
