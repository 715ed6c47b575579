//! Cart loading, cart-page mutations and batch clearing.

use marketstall_core::{CartItemId, Money, ProductId, Quantity};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::api::conversions::convert_cart;
use crate::api::{ApiError, CartLineRequest};
use crate::error::Result;
use crate::models::Session;
use crate::state::Storefront;

// =============================================================================
// Line items
// =============================================================================

/// One product-quantity pair in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub product_id: ProductId,
    /// The cart entry's own document ID, when the backend sent one.
    pub cart_item_id: Option<CartItemId>,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl LineItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The shopper's cart as last loaded from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CartLines {
    items: Vec<LineItem>,
}

impl CartLines {
    #[must_use]
    pub const fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total units across every line.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    #[must_use]
    pub fn find(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Change one line's quantity. Returns `false` if the product is absent.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: Quantity) -> bool {
        self.items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
            .map(|item| item.quantity = quantity)
            .is_some()
    }

    /// Drop one line. Returns `false` if the product is absent.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }
}

// =============================================================================
// Batch clearing
// =============================================================================

/// Outcome of emptying the cart one deletion at a time.
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Set when the cart could not be re-fetched, so nothing was attempted.
    fetch_error: Option<ApiError>,
    outcomes: Vec<(ProductId, std::result::Result<(), ApiError>)>,
}

impl ClearReport {
    /// Why the cart could not be read before clearing, if it could not.
    #[must_use]
    pub const fn fetch_error(&self) -> Option<&ApiError> {
        self.fetch_error.as_ref()
    }

    /// Every deletion attempted, in order.
    #[must_use]
    pub fn outcomes(&self) -> &[(ProductId, std::result::Result<(), ApiError>)] {
        &self.outcomes
    }

    /// Number of deletions attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Products that were removed.
    pub fn succeeded(&self) -> impl Iterator<Item = &ProductId> {
        self.outcomes
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(id, _)| id)
    }

    /// Products whose removal failed, with the reason.
    pub fn failed(&self) -> impl Iterator<Item = (&ProductId, &ApiError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|e| (id, e)))
    }

    /// Whether the cart was read and every deletion succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fetch_error.is_none() && self.failed().next().is_none()
    }
}

// =============================================================================
// Storefront cart operations
// =============================================================================

impl Storefront {
    /// Fetch and normalize the shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` if the cart cannot be fetched.
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn load_cart(&self, session: &Session) -> Result<CartLines> {
        let envelope = match self.backend().fetch_cart(session.token()).await {
            Ok(envelope) => envelope,
            Err(e) => return Err(self.reported("fetchCartItems", e).await),
        };

        let lines = CartLines::new(convert_cart(&envelope));
        debug!(lines = lines.len(), "Cart loaded");
        Ok(lines)
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` if the backend refuses the item.
    #[instrument(skip(self, session))]
    pub async fn add_to_cart(
        &self,
        session: &Session,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<()> {
        let line = CartLineRequest {
            product_id: product_id.clone(),
            quantity: quantity.get(),
        };
        match self.backend().add_cart_item(session.token(), &line).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.reported("addToCart", e).await),
        }
    }

    /// Set a cart line's quantity.
    ///
    /// Quantities below 1 are rejected here without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidQuantity` for an out-of-range quantity
    /// and `CheckoutError::Api` if the update fails.
    #[instrument(skip(self, session))]
    pub async fn update_quantity(
        &self,
        session: &Session,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Quantity> {
        let quantity = Quantity::new(quantity)?;
        let line = CartLineRequest {
            product_id: product_id.clone(),
            quantity: quantity.get(),
        };
        match self.backend().update_cart_item(session.token(), &line).await {
            Ok(()) => Ok(quantity),
            Err(e) => Err(self.reported("updateQuantity", e).await),
        }
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` if the deletion fails.
    #[instrument(skip(self, session))]
    pub async fn remove_from_cart(&self, session: &Session, product_id: &ProductId) -> Result<()> {
        match self
            .backend()
            .remove_cart_item(session.token(), product_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.reported("removeItem", e).await),
        }
    }

    /// Number of distinct products in the cart, for the menu badge.
    ///
    /// Signed-out shoppers and failed fetches show 0; the failure is logged.
    pub async fn cart_count(&self, session: Option<&Session>) -> usize {
        let Some(session) = session else {
            return 0;
        };
        match self.backend().fetch_cart(session.token()).await {
            Ok(envelope) => envelope.entries().len(),
            Err(e) => {
                self.errors().report("fetchCartCount", &e).await;
                0
            }
        }
    }

    /// Empty the cart, one deletion per item.
    ///
    /// The cart is re-fetched first so items added elsewhere are included.
    /// Deletions run sequentially and a failure never stops the rest; each
    /// failure is reported and recorded in the returned [`ClearReport`].
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn clear_cart(&self, session: &Session) -> ClearReport {
        let mut report = ClearReport::default();
        let envelope = match self.backend().fetch_cart(session.token()).await {
            Ok(envelope) => envelope,
            Err(e) => {
                self.errors().report("clearCart", &e).await;
                report.fetch_error = Some(e);
                return report;
            }
        };

        for entry in envelope.entries() {
            let Some(product_id) = entry.product_id() else {
                warn!("Skipping cart entry without a product reference");
                continue;
            };

            let result = self
                .backend()
                .remove_cart_item(session.token(), product_id)
                .await;
            if let Err(e) = &result {
                self.errors().report("clearCart", e).await;
            }
            report.outcomes.push((product_id.clone(), result));
        }

        debug!(
            attempted = report.attempted(),
            complete = report.is_complete(),
            "Cart cleared"
        );
        report
    }
}
