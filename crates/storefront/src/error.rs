//! Checkout error handling with Sentry integration.
//!
//! Every storefront operation returns `Result<T, CheckoutError>`. The
//! `Display` text is for logs; [`CheckoutError::user_message`] is the short
//! text shown to the shopper, with transport details hidden.

use marketstall_core::QuantityError;
use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::FormErrors;

/// Where an unauthenticated shopper is sent to sign in.
pub const SIGN_IN_PATH: &str = "/auth";

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No session; the shopper must sign in.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The address form did not validate.
    #[error("Invalid shipping address: {0}")]
    InvalidAddress(FormErrors),

    /// The profile fetch has not finished yet.
    #[error("Shipping address is still loading")]
    AddressPending,

    /// A backend call failed.
    #[error("{context} failed: {source}")]
    Api {
        context: &'static str,
        #[source]
        source: ApiError,
    },

    /// The payment processor did not accept the payment.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// A cart quantity was out of range.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),
}

impl CheckoutError {
    /// Wrap an API error with the operation it interrupted.
    #[must_use]
    pub const fn api(context: &'static str, source: ApiError) -> Self {
        Self::Api { context, source }
    }

    /// Short text suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Please sign in to continue".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::InvalidAddress(_) => "Please check your shipping information".to_string(),
            Self::AddressPending => "Please wait while we load your address".to_string(),
            Self::Api {
                source: ApiError::Unauthorized,
                ..
            } => "Your session has expired, please sign in again".to_string(),
            Self::Api { context, .. } => match *context {
                "handleCheckout" => "An error occurred while placing your order".to_string(),
                "fetchCartItems" => "Could not load your cart".to_string(),
                _ => "Something went wrong, please try again".to_string(),
            },
            Self::PaymentFailed(_) => "Payment failed, please try again".to_string(),
            Self::InvalidQuantity(_) => "Quantity must be at least 1".to_string(),
        }
    }

    /// Where the shopper should be sent, if anywhere.
    #[must_use]
    pub const fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::NotAuthenticated
            | Self::Api {
                source: ApiError::Unauthorized,
                ..
            } => Some(SIGN_IN_PATH),
            _ => None,
        }
    }
}

/// Result type alias for `CheckoutError`.
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once a session is loaded to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Applied discount", Some(&[("code", "SAVE10")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_error_display() {
        let err = CheckoutError::api(
            "handleCheckout",
            ApiError::Status {
                status: 500,
                message: "db down".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "handleCheckout failed: API error: 500 - db down"
        );
        assert_eq!(
            err.user_message(),
            "An error occurred while placing your order"
        );
    }

    #[test]
    fn test_unauthenticated_errors_redirect_to_sign_in() {
        assert_eq!(CheckoutError::NotAuthenticated.redirect(), Some("/auth"));
        assert_eq!(
            CheckoutError::api("fetchCartItems", ApiError::Unauthorized).redirect(),
            Some("/auth")
        );
        assert_eq!(CheckoutError::EmptyCart.redirect(), None);
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = CheckoutError::PaymentFailed("INSTRUMENT_DECLINED".to_string());
        assert!(!err.user_message().contains("INSTRUMENT_DECLINED"));
    }
}
