//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_API_URL` - Marketplace REST API base URL (default: `http://localhost:5000/api`)
//! - `STOREFRONT_SESSION_PATH` - Persisted session file (default: `.marketstall/session.json`)
//! - `STOREFRONT_CURRENCY` - Display currency (default: GBP)
//! - `STOREFRONT_DEFAULT_COUNTRY` - Country pre-filled in the address form (default: Vietnam)
//! - `STOREFRONT_EXPRESS_SHIPPING_FEE` - Express shipping fee in minor units (default: 500)
//! - `STOREFRONT_ERROR_LOG_CAPACITY` - Distinct errors remembered for deduplication (default: 256)
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use marketstall_core::{CurrencyCode, Money};
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_SESSION_PATH: &str = ".marketstall/session.json";
const DEFAULT_COUNTRY: &str = "Vietnam";
const DEFAULT_EXPRESS_SHIPPING_FEE: i64 = 500;
const DEFAULT_ERROR_LOG_CAPACITY: u64 = 256;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the marketplace REST API (always ends with `/`)
    pub api_url: Url,
    /// Where the session (current user + bearer token) is persisted
    pub session_path: PathBuf,
    /// Currency used for display
    pub currency: CurrencyCode,
    /// Country pre-filled when the address form is shown
    pub default_country: String,
    /// Flat fee charged for express shipping
    pub express_shipping_fee: Money,
    /// Maximum number of distinct errors remembered by the error log
    pub error_log_capacity: u64,
    /// How long catalog responses are cached
    pub catalog_cache_ttl: Duration,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: Option<String>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_url: normalize_base_url(DEFAULT_API_URL).expect("default API URL is valid"),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            currency: CurrencyCode::default(),
            default_country: DEFAULT_COUNTRY.to_string(),
            express_shipping_fee: Money::from_minor(DEFAULT_EXPRESS_SHIPPING_FEE),
            error_log_capacity: DEFAULT_ERROR_LOG_CAPACITY,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            sentry: SentryConfig::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = normalize_base_url(&get_env_or_default("STOREFRONT_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_API_URL".to_string(), e))?;
        let session_path =
            PathBuf::from(get_env_or_default("STOREFRONT_SESSION_PATH", DEFAULT_SESSION_PATH));
        let currency = parse_env_or_default("STOREFRONT_CURRENCY", CurrencyCode::default())?;
        let default_country = get_env_or_default("STOREFRONT_DEFAULT_COUNTRY", DEFAULT_COUNTRY);

        let express_fee: i64 =
            parse_env_or_default("STOREFRONT_EXPRESS_SHIPPING_FEE", DEFAULT_EXPRESS_SHIPPING_FEE)?;
        if express_fee < 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_EXPRESS_SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let error_log_capacity =
            parse_env_or_default("STOREFRONT_ERROR_LOG_CAPACITY", DEFAULT_ERROR_LOG_CAPACITY)?;
        if error_log_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_ERROR_LOG_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let cache_ttl_secs = parse_env_or_default(
            "STOREFRONT_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            api_url,
            session_path,
            currency,
            default_country,
            express_shipping_fee: Money::from_minor(express_fee),
            error_log_capacity,
            catalog_cache_ttl: Duration::from_secs(cache_ttl_secs),
            sentry: SentryConfig {
                dsn: get_optional_env("SENTRY_DSN"),
                environment: get_optional_env("SENTRY_ENVIRONMENT"),
            },
        })
    }

    /// Resolve an API path (e.g. `cart/remove/123`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL and make sure relative joins keep its last path segment.
fn normalize_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_appends_slash() {
        let url = normalize_base_url("http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
    }

    #[test]
    fn test_normalize_base_url_rejects_relative() {
        assert!(normalize_base_url("/api").is_err());
        assert!(normalize_base_url("mailto:shop@example.com").is_err());
    }

    #[test]
    fn test_endpoint_joins_under_api_prefix() {
        let config = StorefrontConfig::default();
        let url = config.endpoint("cart/remove/abc").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/cart/remove/abc");

        let url = config.endpoint("/coupons/verify/SAVE10").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/coupons/verify/SAVE10");
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.currency, CurrencyCode::GBP);
        assert_eq!(config.default_country, "Vietnam");
        assert_eq!(config.express_shipping_fee, Money::from_minor(500));
        assert_eq!(config.error_log_capacity, 256);
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let value: u64 = parse_env_or_default("STOREFRONT_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
