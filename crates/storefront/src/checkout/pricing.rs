//! Checkout pricing: subtotal, shipping, discount and total.
//!
//! All arithmetic is on integer minor units. The total is computed in one
//! place, [`PriceSummary::new`], as `subtotal - discount + shipping`.

use marketstall_core::{Money, ShippingTier};
use serde::Serialize;

use super::cart::CartLines;
use super::discount::AppliedDiscount;

/// Flat shipping fee per tier, independent of cart contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingRates {
    pub standard: Money,
    pub express: Money,
}

impl ShippingRates {
    /// Standard shipping is free; express costs `express_fee`.
    #[must_use]
    pub const fn new(express_fee: Money) -> Self {
        Self {
            standard: Money::ZERO,
            express: express_fee,
        }
    }

    #[must_use]
    pub const fn fee(&self, tier: ShippingTier) -> Money {
        match tier {
            ShippingTier::Standard => self.standard,
            ShippingTier::Express => self.express,
        }
    }
}

/// Sum of `unit_price * quantity` over every line.
#[must_use]
pub fn subtotal(cart: &CartLines) -> Money {
    cart.items().iter().map(super::LineItem::line_total).sum()
}

/// The numbers shown in the order summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    /// Total units across every line.
    pub item_count: u64,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount_amount: Money,
    pub total: Money,
}

impl PriceSummary {
    /// Price a cart for a shipping tier and an optional discount.
    ///
    /// The discount amount is derived from the current lines every time, so
    /// it always reflects the cart as it is now. A free-shipping discount
    /// zeroes the fee whatever the tier.
    #[must_use]
    pub fn new(
        cart: &CartLines,
        rates: &ShippingRates,
        tier: ShippingTier,
        discount: Option<&AppliedDiscount>,
    ) -> Self {
        let subtotal = subtotal(cart);
        let discount_amount = discount.map_or(Money::ZERO, |d| d.rule.amount(cart));
        let shipping_fee = if discount.is_some_and(|d| d.rule.waives_shipping()) {
            Money::ZERO
        } else {
            rates.fee(tier)
        };

        Self {
            item_count: cart.item_count(),
            subtotal,
            shipping_fee,
            discount_amount,
            total: subtotal - discount_amount + shipping_fee,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{ProductId, Quantity};
    use rust_decimal::Decimal;

    use super::*;
    use crate::checkout::discount::{DiscountRule, LookupSource};
    use crate::checkout::LineItem;

    fn cart(lines: &[(&str, i64, i64)]) -> CartLines {
        CartLines::new(
            lines
                .iter()
                .map(|&(id, price, qty)| LineItem {
                    product_id: ProductId::new(id),
                    cart_item_id: None,
                    title: id.to_string(),
                    description: None,
                    image: None,
                    unit_price: Money::from_minor(price),
                    quantity: Quantity::new(qty).unwrap(),
                })
                .collect(),
        )
    }

    fn applied(rule: DiscountRule) -> AppliedDiscount {
        AppliedDiscount {
            code: "TEST".to_string(),
            rule,
            source: LookupSource::Static,
        }
    }

    const RATES: ShippingRates = ShippingRates::new(Money::from_minor(500));

    #[test]
    fn test_standard_and_express_fees() {
        let cart = cart(&[("a", 1000, 2), ("b", 500, 1)]);
        let standard = PriceSummary::new(&cart, &RATES, ShippingTier::Standard, None);
        assert_eq!(standard.subtotal, Money::from_minor(2500));
        assert_eq!(standard.shipping_fee, Money::ZERO);
        assert_eq!(standard.total, Money::from_minor(2500));
        assert_eq!(standard.item_count, 3);

        let express = PriceSummary::new(&cart, &RATES, ShippingTier::Express, None);
        assert_eq!(express.shipping_fee, Money::from_minor(500));
        assert_eq!(express.total, Money::from_minor(3000));
    }

    #[test]
    fn test_shipping_fee_ignores_cart_contents() {
        let small = cart(&[("a", 1, 1)]);
        let large = cart(&[("a", 100_000, 50), ("b", 1, 1)]);
        for tier in [ShippingTier::Standard, ShippingTier::Express] {
            assert_eq!(
                PriceSummary::new(&small, &RATES, tier, None).shipping_fee,
                PriceSummary::new(&large, &RATES, tier, None).shipping_fee
            );
        }
    }

    #[test]
    fn test_percent_discount_reduces_total() {
        let cart = cart(&[("a", 1000, 2), ("b", 500, 1)]);
        let discount = applied(DiscountRule::PercentOffOrder(Decimal::TEN));
        let summary = PriceSummary::new(&cart, &RATES, ShippingTier::Standard, Some(&discount));
        assert_eq!(summary.discount_amount, Money::from_minor(250));
        assert_eq!(summary.total, Money::from_minor(2250));
    }

    #[test]
    fn test_free_shipping_overrides_express() {
        let cart = cart(&[("a", 1000, 1)]);
        let discount = applied(DiscountRule::FreeShipping);
        let summary = PriceSummary::new(&cart, &RATES, ShippingTier::Express, Some(&discount));
        assert_eq!(summary.shipping_fee, Money::ZERO);
        assert_eq!(summary.discount_amount, Money::ZERO);
        assert_eq!(summary.total, Money::from_minor(1000));
    }

    #[test]
    fn test_empty_cart_prices_to_shipping_only() {
        let summary = PriceSummary::new(&CartLines::default(), &RATES, ShippingTier::Express, None);
        assert_eq!(summary.subtotal, Money::ZERO);
        assert_eq!(summary.total, Money::from_minor(500));
    }
}
