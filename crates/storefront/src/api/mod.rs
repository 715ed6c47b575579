//! Marketplace REST API access.
//!
//! # Architecture
//!
//! - [`StoreBackend`] is the seam between checkout logic and the network;
//!   every endpoint the storefront consumes is one trait method
//! - [`ApiClient`] implements it with `reqwest` (JSON over HTTP, bearer
//!   token on authenticated routes)
//! - Catalog reads are cached in memory via `moka`
//!
//! The backend is the source of truth: the client keeps no local copy of
//! carts or orders beyond the page that is currently open.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketstall_storefront::api::{ApiClient, StoreBackend};
//!
//! let client = ApiClient::new(&config)?;
//! let cart = client.fetch_cart(session.token()).await?;
//! for entry in cart.entries() {
//!     client.remove_cart_item(session.token(), entry.product_id().unwrap()).await?;
//! }
//! ```

mod cache;
mod client;
pub mod conversions;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;
use marketstall_core::{PayerId, PaymentOrderId, ProductId, UserId};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// The bearer token was missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the server looked at the request and refused it (4xx).
    ///
    /// Transport failures, parse failures and 5xx answers are not rejections:
    /// the service was unavailable rather than saying no.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 400 && *status < 500,
            Self::Unauthorized | Self::NotFound(_) => true,
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => false,
        }
    }

    /// The server-provided message for a rejected request.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::NotFound(message) if !message.is_empty() => {
                Some(message)
            }
            _ => None,
        }
    }
}

/// Every marketplace endpoint the storefront consumes.
///
/// Authenticated routes take the session's bearer token; catalog, coupon and
/// payment routes are public, as on the backend.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    // Catalog

    /// `GET /products`
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /products/:id`
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;

    // Cart

    /// `GET /cart`
    async fn fetch_cart(&self, token: &SecretString) -> Result<CartEnvelope, ApiError>;

    /// `POST /cart/add`
    async fn add_cart_item(
        &self,
        token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError>;

    /// `PUT /cart/update`
    async fn update_cart_item(
        &self,
        token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError>;

    /// `DELETE /cart/remove/:productId`
    async fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<(), ApiError>;

    // Users

    /// `GET /auth/me`
    async fn fetch_me(&self, token: &SecretString) -> Result<MeResponse, ApiError>;

    /// `PUT /admin/users/:id`
    async fn update_user_address(
        &self,
        token: &SecretString,
        user_id: &UserId,
        update: &UserAddressUpdate,
    ) -> Result<(), ApiError>;

    // Coupons

    /// `GET /coupons/verify/:code`
    async fn verify_coupon(&self, code: &str) -> Result<CouponVerification, ApiError>;

    // Orders

    /// `POST /email/send-order-confirmation`
    async fn send_order_confirmation(
        &self,
        token: &SecretString,
        confirmation: &OrderConfirmation,
    ) -> Result<(), ApiError>;

    /// `POST /admin/orders`
    async fn create_order(
        &self,
        token: &SecretString,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ApiError>;

    // Payments

    /// `POST /paypal/create-order`
    async fn create_payment_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> Result<PaymentOrder, ApiError>;

    /// `POST /paypal/capture-payment`
    async fn capture_payment(
        &self,
        order_id: &PaymentOrderId,
        payer_id: &PayerId,
    ) -> Result<(), ApiError>;

    /// `POST /paypal/capture`
    async fn confirm_capture(
        &self,
        order_id: &PaymentOrderId,
    ) -> Result<CaptureConfirmation, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Status {
            status: 400,
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 400 - Coupon expired");
        assert_eq!(err.server_message(), Some("Coupon expired"));

        let err = ApiError::NotFound("Coupon not found".to_string());
        assert_eq!(err.server_message(), Some("Coupon not found"));
    }

    #[test]
    fn test_rejection_classification() {
        let rejected = ApiError::Status {
            status: 400,
            message: String::new(),
        };
        assert!(rejected.is_rejection());
        assert!(rejected.server_message().is_none());

        let unavailable = ApiError::Status {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert!(!unavailable.is_rejection());
        assert!(ApiError::Unauthorized.is_rejection());
    }
}
