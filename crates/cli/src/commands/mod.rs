//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod payment;
pub mod products;
pub mod session;

use marketstall_storefront::models::SessionError;
use marketstall_storefront::{CheckoutError, Session};
use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Not signed in; run `mst session login` first")]
    NotSignedIn,

    /// A storefront operation failed; the message is the shopper-facing one.
    #[error("{message}")]
    Storefront {
        message: String,
        #[source]
        source: CheckoutError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0}")]
    Invalid(String),
}

impl From<CheckoutError> for CommandError {
    fn from(source: CheckoutError) -> Self {
        if source.redirect().is_some() {
            return Self::NotSignedIn;
        }
        Self::Storefront {
            message: source.user_message(),
            source,
        }
    }
}

/// The loaded session, or an error telling the user to sign in.
pub fn require_session(session: Option<&Session>) -> Result<&Session, CommandError> {
    session.ok_or(CommandError::NotSignedIn)
}
