//! Order assembly and submission.
//!
//! Submission is a fixed sequence with no rollback:
//!
//! 1. require a session and a non-empty cart
//! 2. validate and persist the address form, if it is showing
//! 3. assemble the order with a fresh identifier
//! 4. ask the backend to email a confirmation (failure is only logged)
//! 5. persist the order (failure aborts)
//! 6. empty the cart (failures are logged and reported)
//! 7. create the payment order and hand back its approval URL

use chrono::{DateTime, Utc};
use marketstall_core::{Money, OrderId, OrderStatus, ProductId, Quantity, ShippingTier, UserId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::address::AddressState;
use super::cart::CartLines;
use super::discount::AppliedDiscount;
use super::payment::PendingPayment;
use super::pricing::PriceSummary;
use super::Address;
use crate::api::conversions::convert_address_payload;
use crate::api::{OrderConfirmation, OrderItemPayload, OrderPayload, PaymentOrderRequest};
use crate::error::{CheckoutError, Result, add_breadcrumb};
use crate::models::Session;
use crate::state::Storefront;

/// One line of a placed order, priced at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    /// Unit price.
    pub price: Money,
}

/// An order as sent to the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub shipping_fee: Money,
    pub discount_code: Option<String>,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub shipping_address: Address,
}

impl Order {
    /// Build a pending order from the priced cart.
    #[must_use]
    pub fn assemble(
        user_id: UserId,
        cart: &CartLines,
        summary: &PriceSummary,
        discount: Option<&AppliedDiscount>,
        shipping_address: Address,
    ) -> Self {
        Self {
            order_id: OrderId::generate(),
            user_id,
            order_date: Utc::now(),
            items: cart
                .items()
                .iter()
                .map(|item| OrderItem {
                    product_id: item.product_id.clone(),
                    product_name: item.title.clone(),
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
            shipping_fee: summary.shipping_fee,
            discount_code: discount
                .filter(|d| d.rule.applies_to(cart))
                .map(|d| d.code.clone()),
            discount_amount: summary.discount_amount,
            total_amount: summary.total,
            status: OrderStatus::Pending,
            shipping_address,
        }
    }

    /// Wire form, with amounts in major units.
    #[must_use]
    pub fn to_payload(&self) -> OrderPayload {
        OrderPayload {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            order_date: self.order_date,
            total_amount: self.total_amount.to_major(),
            status: self.status,
            items: self
                .items
                .iter()
                .map(|item| OrderItemPayload {
                    product_id: item.product_id.clone(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity.get(),
                    price: item.price.to_major(),
                })
                .collect(),
            shipping_fee: self.shipping_fee.to_major(),
            discount_code: self.discount_code.clone(),
            discount_amount: self.discount_amount.to_major(),
            shipping_address: convert_address_payload(&self.shipping_address),
        }
    }
}

/// What the shopper is checking out.
#[derive(Debug, Clone, Copy)]
pub struct OrderDraft<'a> {
    pub cart: &'a CartLines,
    pub tier: ShippingTier,
    pub discount: Option<&'a AppliedDiscount>,
}

/// Runs the submission sequence against a storefront.
#[derive(Debug, Clone, Copy)]
pub struct OrderSubmitter<'a> {
    storefront: &'a Storefront,
}

impl<'a> OrderSubmitter<'a> {
    #[must_use]
    pub const fn new(storefront: &'a Storefront) -> Self {
        Self { storefront }
    }

    /// Place the order and start payment.
    ///
    /// If the address form is showing it is validated first; a valid form
    /// moves `address` to `Resolved` and is saved to the profile.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` without a session
    /// - `EmptyCart` when there is nothing to order
    /// - `InvalidAddress` / `AddressPending` when no usable address exists
    /// - `Api` when the order store rejects the order
    /// - `PaymentFailed` when the payment order cannot be created
    #[instrument(skip_all, fields(tier = %draft.tier, lines = draft.cart.len()))]
    pub async fn submit(
        &self,
        session: Option<&Session>,
        draft: OrderDraft<'_>,
        address: &mut AddressState,
    ) -> Result<PendingPayment> {
        let storefront = self.storefront;

        // 1. Preconditions
        let session = session.ok_or(CheckoutError::NotAuthenticated)?;
        if draft.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // 2. Address
        let shipping_address = match address.submit_form() {
            Ok(Some(fresh)) => {
                storefront.save_address(session, &fresh).await;
                fresh
            }
            Ok(None) => address
                .address()
                .cloned()
                .ok_or(CheckoutError::AddressPending)?,
            Err(errors) => return Err(CheckoutError::InvalidAddress(errors)),
        };

        // 3. Assemble
        let summary =
            PriceSummary::new(draft.cart, storefront.rates(), draft.tier, draft.discount);
        let mut order = Order::assemble(
            session.user.id.clone(),
            draft.cart,
            &summary,
            draft.discount,
            shipping_address,
        );
        add_breadcrumb(
            "checkout",
            "Submitting order",
            Some(&[("order_id", order.order_id.as_str())]),
        );

        // 4. Confirmation email
        let confirmation = OrderConfirmation {
            order_details: order.to_payload(),
            customer_email: session.user.email.clone(),
        };
        if let Err(e) = storefront
            .backend()
            .send_order_confirmation(session.token(), &confirmation)
            .await
        {
            storefront
                .errors()
                .report("sendOrderConfirmation", &e)
                .await;
        }

        // 5. Persist
        let created = match storefront
            .backend()
            .create_order(session.token(), &order.to_payload())
            .await
        {
            Ok(created) => created,
            Err(e) => return Err(storefront.reported("handleCheckout", e).await),
        };
        if let Some(issued) = created.issued_id() {
            order.order_id = issued.clone();
        }
        info!(order_id = %order.order_id, total = order.total_amount.minor(), "Order placed");

        // 6. Empty the cart
        let cart_cleared = storefront.clear_cart(session).await;
        if !cart_cleared.is_complete() {
            warn!(
                order_id = %order.order_id,
                failed = cart_cleared.failed().count(),
                "Cart was not fully cleared after ordering"
            );
        }

        // 7. Payment handoff
        let request = PaymentOrderRequest {
            order_id: order.order_id.clone(),
            total_amount: summary.total.minor(),
        };
        let payment = match storefront.backend().create_payment_order(&request).await {
            Ok(payment) => payment,
            Err(e) => {
                storefront.errors().report("handlePayment", &e).await;
                return Err(CheckoutError::PaymentFailed(e.to_string()));
            }
        };
        let Some(approval_url) = payment.approval_url.filter(|url| !url.is_empty()) else {
            let message = "Payment order has no approval URL";
            storefront.errors().report_message("handlePayment", message).await;
            return Err(CheckoutError::PaymentFailed(message.to_string()));
        };

        Ok(PendingPayment {
            order,
            approval_url,
            payment_order_id: payment.id,
            cart_cleared,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::checkout::LineItem;
    use crate::checkout::discount::{DiscountRule, LookupSource};
    use crate::checkout::pricing::ShippingRates;

    fn sample_cart() -> CartLines {
        CartLines::new(vec![LineItem {
            product_id: ProductId::new("p1"),
            cart_item_id: None,
            title: "Lamp".to_string(),
            description: None,
            image: None,
            unit_price: Money::from_minor(1250),
            quantity: Quantity::new(2).unwrap(),
        }])
    }

    fn sample_address() -> Address {
        Address {
            name: "An".to_string(),
            street: "12 Hang Bac".to_string(),
            phone: "0912345678".to_string(),
            country: "Vietnam".to_string(),
        }
    }

    #[test]
    fn test_assemble_copies_priced_cart() {
        let cart = sample_cart();
        let discount = AppliedDiscount {
            code: "SAVE10".to_string(),
            rule: DiscountRule::PercentOffOrder(Decimal::TEN),
            source: LookupSource::Static,
        };
        let rates = ShippingRates::new(Money::from_minor(500));
        let summary = PriceSummary::new(&cart, &rates, ShippingTier::Express, Some(&discount));
        let order = Order::assemble(
            UserId::new("u1"),
            &cart,
            &summary,
            Some(&discount),
            sample_address(),
        );

        assert!(order.order_id.is_client_generated());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, Money::from_minor(1250));
        assert_eq!(order.discount_code.as_deref(), Some("SAVE10"));
        assert_eq!(order.discount_amount, Money::from_minor(250));
        assert_eq!(order.total_amount, Money::from_minor(2500 - 250 + 500));
    }

    #[test]
    fn test_assemble_drops_lapsed_product_code() {
        let cart = sample_cart();
        let discount = AppliedDiscount {
            code: "MUG50".to_string(),
            rule: DiscountRule::PercentOffProduct {
                product_id: ProductId::new("p2"),
                percent: Decimal::from(50),
            },
            source: LookupSource::Remote,
        };
        let rates = ShippingRates::new(Money::ZERO);
        let summary = PriceSummary::new(&cart, &rates, ShippingTier::Standard, Some(&discount));
        let order = Order::assemble(
            UserId::new("u1"),
            &cart,
            &summary,
            Some(&discount),
            sample_address(),
        );

        assert!(order.discount_code.is_none());
        assert_eq!(order.discount_amount, Money::ZERO);
        assert_eq!(order.total_amount, Money::from_minor(2500));
    }

    #[test]
    fn test_payload_uses_major_units() {
        let cart = sample_cart();
        let summary = PriceSummary::new(
            &cart,
            &ShippingRates::new(Money::ZERO),
            ShippingTier::Standard,
            None,
        );
        let payload =
            Order::assemble(UserId::new("u1"), &cart, &summary, None, sample_address()).to_payload();

        assert_eq!(payload.total_amount, Decimal::new(2500, 2));
        assert_eq!(payload.items[0].price, Decimal::new(1250, 2));
        assert_eq!(payload.items[0].quantity, 2);
        assert!(payload.discount_code.is_none());
        assert_eq!(payload.shipping_address.address, "12 Hang Bac");
    }
}
