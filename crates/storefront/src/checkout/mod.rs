//! The checkout page: cart, address, pricing, discount and submission.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut checkout = Checkout::load(&storefront, session.as_ref()).await;
//! checkout.select_shipping(ShippingTier::Express);
//! checkout.apply_discount("SAVE10").await;
//! println!("Total: {}", checkout.summary().total.display(CurrencyCode::GBP));
//! let pending = checkout.submit().await?;
//! println!("Approve payment at {}", pending.approval_url);
//! ```

pub mod address;
pub mod cart;
pub mod discount;
pub mod order;
pub mod payment;
pub mod pricing;

pub use address::{Address, AddressForm, AddressState, FormErrors};
pub use cart::{CartLines, ClearReport, LineItem};
pub use discount::{
    AppliedDiscount, Coupon, DiscountOutcome, DiscountResolver, DiscountRule, DiscountSource,
    FallbackPolicy, Lookup, LookupSource, RemoteCoupons, StaticCoupons,
};
pub use order::{Order, OrderDraft, OrderItem, OrderSubmitter};
pub use payment::{CheckoutReceipt, PendingPayment};
pub use pricing::{PriceSummary, ShippingRates};

use marketstall_core::{ProductId, ShippingTier};
use tracing::{debug, instrument};

use crate::api::conversions::{convert_address_update, convert_profile};
use crate::error::{CheckoutError, Result};
use crate::models::Session;
use crate::state::Storefront;

/// Feedback from the last discount attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountMessage {
    Success(String),
    Error(String),
}

/// Everything the checkout page holds.
#[derive(Debug)]
pub struct Checkout {
    storefront: Storefront,
    session: Option<Session>,
    cart: CartLines,
    address: AddressState,
    tier: ShippingTier,
    discount: Option<AppliedDiscount>,
    discount_message: Option<DiscountMessage>,
    cart_error: Option<CheckoutError>,
}

impl Checkout {
    /// Load the cart and the shipping address concurrently.
    ///
    /// Without a session the checkout is empty and the address form shows.
    /// A failed cart fetch leaves the cart empty and is kept for
    /// [`Self::take_cart_error`]; a failed profile fetch shows the form. Both
    /// failures are reported to the error log.
    #[instrument(skip_all)]
    pub async fn load(storefront: &Storefront, session: Option<&Session>) -> Self {
        let Some(session) = session else {
            return Self::new(
                storefront,
                None,
                CartLines::default(),
                AddressState::NeedsForm(AddressForm::new(&storefront.config().default_country)),
            );
        };

        let (cart, address) = tokio::join!(
            storefront.load_cart(session),
            storefront.resolve_address(session)
        );

        let (cart, cart_error) = match cart {
            Ok(cart) => (cart, None),
            Err(e) => (CartLines::default(), Some(e)),
        };
        let mut checkout = Self::new(storefront, Some(session.clone()), cart, address);
        checkout.cart_error = cart_error;
        checkout
    }

    fn new(
        storefront: &Storefront,
        session: Option<Session>,
        cart: CartLines,
        address: AddressState,
    ) -> Self {
        Self {
            storefront: storefront.clone(),
            session,
            cart,
            address,
            tier: ShippingTier::default(),
            discount: None,
            discount_message: None,
            cart_error: None,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartLines {
        &self.cart
    }

    /// The error that left the cart empty on load, if any.
    pub const fn take_cart_error(&mut self) -> Option<CheckoutError> {
        self.cart_error.take()
    }

    #[must_use]
    pub const fn address(&self) -> &AddressState {
        &self.address
    }

    /// Mutable access for filling in or reopening the address form.
    pub const fn address_mut(&mut self) -> &mut AddressState {
        &mut self.address
    }

    #[must_use]
    pub const fn shipping_tier(&self) -> ShippingTier {
        self.tier
    }

    #[must_use]
    pub const fn discount(&self) -> Option<&AppliedDiscount> {
        self.discount.as_ref()
    }

    #[must_use]
    pub const fn discount_message(&self) -> Option<&DiscountMessage> {
        self.discount_message.as_ref()
    }

    /// Current prices, derived from the cart as it is now.
    #[must_use]
    pub fn summary(&self) -> PriceSummary {
        PriceSummary::new(
            &self.cart,
            self.storefront.rates(),
            self.tier,
            self.discount.as_ref(),
        )
    }

    pub const fn select_shipping(&mut self, tier: ShippingTier) {
        self.tier = tier;
    }

    /// Apply a discount code; an invalid code clears any previous discount.
    pub async fn apply_discount(&mut self, code: &str) -> DiscountOutcome {
        let outcome = self.storefront.discounts().apply(code, &self.cart).await;
        match &outcome {
            DiscountOutcome::Applied { discount, message } => {
                self.discount = Some(discount.clone());
                self.discount_message = Some(DiscountMessage::Success(message.clone()));
            }
            DiscountOutcome::Invalid { message } => {
                debug!(message = %message, "Discount not applied");
                self.discount = None;
                self.discount_message = Some(DiscountMessage::Error(message.clone()));
            }
        }
        outcome
    }

    /// Change a line's quantity on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a session, `InvalidQuantity` for a
    /// quantity below 1 and `Api` if the server refuses the change.
    pub async fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Result<()> {
        let session = self.session.as_ref().ok_or(CheckoutError::NotAuthenticated)?;
        let quantity = self
            .storefront
            .update_quantity(session, product_id, quantity)
            .await?;
        self.cart.set_quantity(product_id, quantity);
        Ok(())
    }

    /// Remove a line on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a session and `Api` if the server
    /// refuses the removal.
    pub async fn remove_item(&mut self, product_id: &ProductId) -> Result<()> {
        let session = self.session.as_ref().ok_or(CheckoutError::NotAuthenticated)?;
        self.storefront.remove_from_cart(session, product_id).await?;
        self.cart.remove(product_id);
        self.drop_lapsed_discount();
        Ok(())
    }

    /// Clear a product discount whose product is no longer in the cart.
    fn drop_lapsed_discount(&mut self) {
        if self
            .discount
            .as_ref()
            .is_some_and(|d| !d.rule.applies_to(&self.cart))
        {
            debug!("Product discount lapsed");
            self.discount = None;
            self.discount_message = Some(DiscountMessage::Error(
                discount::NOT_IN_CART_MESSAGE.to_string(),
            ));
        }
    }

    /// Place the order and start payment.
    ///
    /// Once the order is placed its lines and discount leave the checkout,
    /// so submitting again fails with `EmptyCart`. Lines the backend failed
    /// to delete are listed in [`PendingPayment::cart_cleared`].
    ///
    /// # Errors
    ///
    /// See [`OrderSubmitter::submit`].
    pub async fn submit(&mut self) -> Result<PendingPayment> {
        let draft = OrderDraft {
            cart: &self.cart,
            tier: self.tier,
            discount: self.discount.as_ref(),
        };
        let pending = OrderSubmitter::new(&self.storefront)
            .submit(self.session.as_ref(), draft, &mut self.address)
            .await?;

        self.cart = CartLines::default();
        self.discount = None;
        self.discount_message = None;
        Ok(pending)
    }
}

impl Storefront {
    /// Work out the shipping address from the shopper's profile.
    ///
    /// Never fails: anything short of a complete stored address yields the
    /// form, pre-filled with whatever is known.
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn resolve_address(&self, session: &Session) -> AddressState {
        let default_country = &self.config().default_country;
        match self.backend().fetch_me(session.token()).await {
            Ok(me) => match convert_profile(me.user.as_ref(), default_country) {
                Ok(address) => AddressState::Resolved(address),
                Err(mut form) => {
                    debug!("Stored profile has no usable address");
                    if form.name.is_empty()
                        && let Some(name) =
                            session.user.fullname.as_ref().or(session.user.username.as_ref())
                    {
                        form.name.clone_from(name);
                    }
                    AddressState::NeedsForm(form)
                }
            },
            Err(e) => {
                self.errors().report("fetchAddressDetails", &e).await;
                AddressState::NeedsForm(AddressForm::new(default_country.as_str()))
            }
        }
    }

    /// Save an address onto the shopper's profile.
    ///
    /// Best effort: a failure is reported to the error log and otherwise
    /// ignored. Returns whether the save succeeded.
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn save_address(&self, session: &Session, address: &Address) -> bool {
        let update = convert_address_update(address);
        match self
            .backend()
            .update_user_address(session.token(), &session.user.id, &update)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.errors().report("updateUserAddress", &e).await;
                false
            }
        }
    }
}
