//! Discount code resolution.
//!
//! # Architecture
//!
//! - [`DiscountSource`] looks a code up and says what it found
//! - [`RemoteCoupons`] asks the coupon service; [`StaticCoupons`] knows a
//!   fixed set of codes
//! - [`FallbackPolicy`] tries a primary source and consults a fallback when
//!   the primary rejects the code or cannot be reached
//! - [`DiscountResolver`] turns a found coupon into a [`DiscountRule`] that
//!   fits the current cart
//!
//! A rule stores the percentage, never an amount; pricing derives the amount
//! from the cart each time so it cannot go stale when quantities change.

use std::sync::Arc;

use async_trait::async_trait;
use marketstall_core::{Money, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::cart::CartLines;
use crate::api::{ApiError, CouponVerification, StoreBackend};
use crate::services::ErrorLog;

/// Code that grants free shipping instead of a percentage.
pub const FREE_SHIPPING_CODE: &str = "FREESHIP";

const EMPTY_CODE_MESSAGE: &str = "Please enter a discount code";
const INVALID_CODE_MESSAGE: &str = "Invalid discount code";
const UNAVAILABLE_MESSAGE: &str = "An error occurred while applying the discount code";
pub(crate) const NOT_IN_CART_MESSAGE: &str = "Discount code does not apply to any product in your cart";

// =============================================================================
// Rules
// =============================================================================

/// What an applied discount does to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRule {
    /// A percentage off the whole subtotal.
    PercentOffOrder(Decimal),
    /// A percentage off one product's line subtotal.
    PercentOffProduct {
        product_id: ProductId,
        percent: Decimal,
    },
    /// Shipping is free; no amount comes off the items.
    FreeShipping,
}

impl DiscountRule {
    /// The amount taken off for the given cart, in minor units.
    ///
    /// A product discount whose product has left the cart is worth nothing.
    #[must_use]
    pub fn amount(&self, cart: &CartLines) -> Money {
        match self {
            Self::PercentOffOrder(percent) => percent_of(super::pricing::subtotal(cart), *percent),
            Self::PercentOffProduct {
                product_id,
                percent,
            } => cart
                .find(product_id)
                .map_or(Money::ZERO, |item| percent_of(item.line_total(), *percent)),
            Self::FreeShipping => Money::ZERO,
        }
    }

    /// Whether the rule still has something to act on in `cart`.
    ///
    /// Only a product discount can lapse, when its product leaves the cart.
    #[must_use]
    pub fn applies_to(&self, cart: &CartLines) -> bool {
        match self {
            Self::PercentOffProduct { product_id, .. } => cart.find(product_id).is_some(),
            Self::PercentOffOrder(_) | Self::FreeShipping => true,
        }
    }

    /// Whether the shipping fee is waived.
    #[must_use]
    pub const fn waives_shipping(&self) -> bool {
        matches!(self, Self::FreeShipping)
    }
}

fn percent_of(base: Money, percent: Decimal) -> Money {
    base.percent(percent).unwrap_or(Money::ZERO)
}

// =============================================================================
// Sources
// =============================================================================

/// A coupon as known to a discount source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    pub code: String,
    pub percent: Decimal,
    /// Restricts the coupon to one product.
    pub product_id: Option<ProductId>,
}

/// Which source supplied an applied discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    Remote,
    Static,
}

/// Result of looking a code up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found {
        coupon: Coupon,
        source: LookupSource,
    },
    /// The source knows the code is not valid, optionally saying why.
    Rejected(Option<String>),
    /// The source could not be consulted.
    Unavailable,
}

/// Something that can look discount codes up.
#[async_trait]
pub trait DiscountSource: Send + Sync {
    /// Look up an already normalized (trimmed, upper-case) code.
    async fn lookup(&self, code: &str) -> Lookup;
}

/// The coupon verification service.
pub struct RemoteCoupons {
    backend: Arc<dyn StoreBackend>,
    errors: ErrorLog,
}

impl RemoteCoupons {
    #[must_use]
    pub fn new(backend: Arc<dyn StoreBackend>, errors: ErrorLog) -> Self {
        Self { backend, errors }
    }
}

#[async_trait]
impl DiscountSource for RemoteCoupons {
    #[instrument(skip(self))]
    async fn lookup(&self, code: &str) -> Lookup {
        match self.backend.verify_coupon(code).await {
            Ok(verification) => interpret_verification(verification),
            Err(e) => {
                let lookup = lookup_from_error(&e);
                if lookup == Lookup::Unavailable {
                    self.errors.report("applyDiscountCode", &e).await;
                }
                lookup
            }
        }
    }
}

fn interpret_verification(verification: CouponVerification) -> Lookup {
    match verification {
        CouponVerification {
            success: true,
            coupon: Some(coupon),
            ..
        } => Lookup::Found {
            coupon: Coupon {
                code: coupon.code.trim().to_uppercase(),
                percent: coupon.discount_percent,
                product_id: coupon.product_id,
            },
            source: LookupSource::Remote,
        },
        CouponVerification { message, .. } => Lookup::Rejected(message),
    }
}

/// A fixed table of codes.
#[derive(Debug, Clone)]
pub struct StaticCoupons {
    coupons: Vec<Coupon>,
}

impl StaticCoupons {
    #[must_use]
    pub const fn new(coupons: Vec<Coupon>) -> Self {
        Self { coupons }
    }
}

impl Default for StaticCoupons {
    /// `SAVE10`, `SAVE20` and `FREESHIP`.
    fn default() -> Self {
        let whole_order = |code: &str, percent: i64| Coupon {
            code: code.to_string(),
            percent: Decimal::from(percent),
            product_id: None,
        };
        Self::new(vec![
            whole_order("SAVE10", 10),
            whole_order("SAVE20", 20),
            whole_order(FREE_SHIPPING_CODE, 0),
        ])
    }
}

#[async_trait]
impl DiscountSource for StaticCoupons {
    async fn lookup(&self, code: &str) -> Lookup {
        self.coupons
            .iter()
            .find(|coupon| coupon.code == code)
            .map_or(Lookup::Rejected(None), |coupon| Lookup::Found {
                coupon: coupon.clone(),
                source: LookupSource::Static,
            })
    }
}

/// Try `primary`, then `fallback` when the primary does not find the code.
///
/// When both miss, the primary's answer stands so its rejection message
/// reaches the shopper.
pub struct FallbackPolicy {
    primary: Arc<dyn DiscountSource>,
    fallback: Arc<dyn DiscountSource>,
}

impl FallbackPolicy {
    #[must_use]
    pub fn new(primary: Arc<dyn DiscountSource>, fallback: Arc<dyn DiscountSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl DiscountSource for FallbackPolicy {
    async fn lookup(&self, code: &str) -> Lookup {
        let primary = self.primary.lookup(code).await;
        if matches!(primary, Lookup::Found { .. }) {
            return primary;
        }

        match self.fallback.lookup(code).await {
            found @ Lookup::Found { .. } => {
                warn!(code, "Discount code resolved by fallback source");
                found
            }
            Lookup::Rejected(_) | Lookup::Unavailable => primary,
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A discount currently applied to the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub rule: DiscountRule,
    pub source: LookupSource,
}

/// What applying a code produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountOutcome {
    Applied {
        discount: AppliedDiscount,
        message: String,
    },
    /// No discount applies; any previous discount is cleared.
    Invalid { message: String },
}

impl DiscountOutcome {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Applied { message, .. } | Self::Invalid { message } => message,
        }
    }
}

/// Applies discount codes to a cart.
#[derive(Clone)]
pub struct DiscountResolver {
    source: Arc<dyn DiscountSource>,
}

impl DiscountResolver {
    #[must_use]
    pub fn new(source: Arc<dyn DiscountSource>) -> Self {
        Self { source }
    }

    /// The coupon service with the static codes as fallback.
    #[must_use]
    pub fn remote_with_static_fallback(backend: Arc<dyn StoreBackend>, errors: ErrorLog) -> Self {
        Self::new(Arc::new(FallbackPolicy::new(
            Arc::new(RemoteCoupons::new(backend, errors)),
            Arc::new(StaticCoupons::default()),
        )))
    }

    /// Look a code up and fit it to the cart.
    #[instrument(skip(self, cart))]
    pub async fn apply(&self, code: &str, cart: &CartLines) -> DiscountOutcome {
        let code = normalize_code(code);
        if code.is_empty() {
            return DiscountOutcome::invalid(EMPTY_CODE_MESSAGE);
        }

        let (coupon, source) = match self.source.lookup(&code).await {
            Lookup::Found { coupon, source } => (coupon, source),
            Lookup::Rejected(message) => {
                return DiscountOutcome::invalid(
                    message.unwrap_or_else(|| INVALID_CODE_MESSAGE.to_string()),
                );
            }
            Lookup::Unavailable => return DiscountOutcome::invalid(UNAVAILABLE_MESSAGE),
        };

        if coupon.percent < Decimal::ZERO || coupon.percent > Decimal::ONE_HUNDRED {
            warn!(code = %code, percent = %coupon.percent, "Rejecting coupon with out-of-range percent");
            return DiscountOutcome::invalid(INVALID_CODE_MESSAGE);
        }

        let percent = coupon.percent.normalize();
        let (rule, message) = match coupon.product_id {
            Some(product_id) => {
                let Some(item) = cart.find(&product_id) else {
                    return DiscountOutcome::invalid(NOT_IN_CART_MESSAGE);
                };
                let message = format!("{percent}% off {}", item.title);
                (
                    DiscountRule::PercentOffProduct {
                        product_id,
                        percent,
                    },
                    message,
                )
            }
            None if coupon.code == FREE_SHIPPING_CODE => {
                (DiscountRule::FreeShipping, "Free shipping!".to_string())
            }
            None => (
                DiscountRule::PercentOffOrder(percent),
                format!("{percent}% off your order!"),
            ),
        };

        debug!(code = %code, ?rule, ?source, "Discount applied");
        DiscountOutcome::Applied {
            discount: AppliedDiscount { code, rule, source },
            message,
        }
    }
}

/// Trim and upper-case a code as typed by the shopper.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A 4xx means the service said no; anything else means it was unreachable.
fn lookup_from_error(error: &ApiError) -> Lookup {
    if error.is_rejection() {
        Lookup::Rejected(error.server_message().map(String::from))
    } else {
        Lookup::Unavailable
    }
}
