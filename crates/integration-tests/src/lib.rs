//! Integration tests for Marketstall.
//!
//! The storefront talks to the marketplace only through
//! [`StoreBackend`], so these tests drive it against [`FakeBackend`]: an
//! in-memory marketplace that keeps a cart, answers coupon lookups, records
//! every call in order and fails on demand.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = FakeBackend::new()
//!     .with_product("p1", "Lamp", 1000)
//!     .with_cart_line("p1", 2)
//!     .failing_nth(Endpoint::RemoveCartItem, 2, Fault::Unavailable);
//! let storefront = storefront(&backend);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use marketstall_core::{PayerId, PaymentOrderId, ProductId, UserId};
use marketstall_storefront::api::{
    ApiError, CaptureConfirmation, CartEntry, CartEnvelope, CartLineRequest, CartPayload,
    CouponPayload, CouponVerification, CreatedOrder, MeResponse, OrderConfirmation,
    OrderPayload, PaymentOrder, PaymentOrderRequest, Populated, Product, ProductSummary,
    StoreBackend, UserAddressUpdate, UserProfile,
};
use marketstall_storefront::{CurrentUser, Session, Storefront, StorefrontConfig};
use rust_decimal::Decimal;
use secrecy::SecretString;

/// Approval URL handed out by the fake payment processor.
pub const APPROVAL_URL: &str = "https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T";

/// Document `_id` the fake order store gives every stored order.
pub const ORDER_DOCUMENT_ID: &str = "66b2c0ffee0000000000beef";

/// Processor order ID handed out by the fake payment processor.
pub const PAYMENT_ORDER_ID: &str = "5O190127TN364715T";

// =============================================================================
// Faults
// =============================================================================

/// A backend endpoint, as recorded in the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListProducts,
    GetProduct,
    FetchCart,
    AddCartItem,
    UpdateCartItem,
    RemoveCartItem,
    FetchMe,
    UpdateUserAddress,
    VerifyCoupon,
    SendOrderConfirmation,
    CreateOrder,
    CreatePaymentOrder,
    CapturePayment,
    ConfirmCapture,
}

/// How an endpoint should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// 401: the token was refused.
    Unauthorized,
    /// A 4xx with a message.
    Rejected(u16, String),
    /// A 503 from an unavailable service.
    Unavailable,
}

impl Fault {
    fn to_error(&self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized,
            Self::Rejected(status, message) => ApiError::Status {
                status: *status,
                message: message.clone(),
            },
            Self::Unavailable => ApiError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct FaultRule {
    endpoint: Endpoint,
    /// 1-based call number to fail; `None` fails every call.
    nth: Option<usize>,
    fault: Fault,
}

// =============================================================================
// Fake Backend
// =============================================================================

#[derive(Debug, Default)]
struct FakeState {
    products: Vec<Product>,
    cart: Vec<(ProductId, u32)>,
    profile: Option<UserProfile>,
    coupons: HashMap<String, CouponPayload>,
    issued_order_id: Option<String>,
    approval_url: Option<String>,
    faults: Vec<FaultRule>,
    counts: HashMap<Endpoint, usize>,
    calls: Vec<Endpoint>,
    address_updates: Vec<(UserId, UserAddressUpdate)>,
    confirmations: Vec<OrderConfirmation>,
    orders: Vec<OrderPayload>,
    payment_requests: Vec<PaymentOrderRequest>,
    captures: Vec<(PaymentOrderId, PayerId)>,
}

/// An in-memory marketplace.
#[derive(Debug)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                approval_url: Some(APPROVAL_URL.to_string()),
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Setup =====

    /// Add a catalog product priced in minor units.
    #[must_use]
    pub fn with_product(self, id: &str, title: &str, price: i64) -> Self {
        self.state().products.push(Product {
            id: ProductId::new(id),
            title: title.to_string(),
            description: None,
            price,
            image: None,
            images: Vec::new(),
            condition: None,
            seller: None,
        });
        self
    }

    /// Put a catalog product in the cart.
    #[must_use]
    pub fn with_cart_line(self, id: &str, quantity: u32) -> Self {
        self.state().cart.push((ProductId::new(id), quantity));
        self
    }

    /// Set the profile returned by `GET /auth/me`.
    #[must_use]
    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.state().profile = Some(profile);
        self
    }

    /// Teach the coupon service a whole-order coupon.
    #[must_use]
    pub fn with_coupon(self, code: &str, percent: Decimal) -> Self {
        self.with_coupon_payload(CouponPayload {
            code: code.to_string(),
            discount_percent: percent,
            product_id: None,
        })
    }

    /// Teach the coupon service an arbitrary coupon.
    #[must_use]
    pub fn with_coupon_payload(self, coupon: CouponPayload) -> Self {
        self.state()
            .coupons
            .insert(coupon.code.to_uppercase(), coupon);
        self
    }

    /// Have the order store answer with only its own document ID instead of
    /// echoing the client's `order_id`.
    #[must_use]
    pub fn issuing_order_id(self, id: &str) -> Self {
        self.state().issued_order_id = Some(id.to_string());
        self
    }

    /// Have the payment processor omit the approval URL.
    #[must_use]
    pub fn without_approval_url(self) -> Self {
        self.state().approval_url = None;
        self
    }

    /// Fail every call to `endpoint`.
    #[must_use]
    pub fn failing(self, endpoint: Endpoint, fault: Fault) -> Self {
        self.state().faults.push(FaultRule {
            endpoint,
            nth: None,
            fault,
        });
        self
    }

    /// Fail only the `nth` (1-based) call to `endpoint`.
    #[must_use]
    pub fn failing_nth(self, endpoint: Endpoint, nth: usize, fault: Fault) -> Self {
        self.state().faults.push(FaultRule {
            endpoint,
            nth: Some(nth),
            fault,
        });
        self
    }

    // ===== Inspection =====

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Endpoint> {
        self.state().calls.clone()
    }

    /// Number of calls made to `endpoint`.
    #[must_use]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state().counts.get(&endpoint).copied().unwrap_or_default()
    }

    /// Position of the first call to `endpoint` in the journal.
    #[must_use]
    pub fn first_call(&self, endpoint: Endpoint) -> Option<usize> {
        self.state().calls.iter().position(|call| *call == endpoint)
    }

    /// Product IDs still in the cart.
    #[must_use]
    pub fn cart_product_ids(&self) -> Vec<String> {
        self.state()
            .cart
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Quantity of a product in the cart.
    #[must_use]
    pub fn cart_quantity(&self, id: &str) -> Option<u32> {
        self.state()
            .cart
            .iter()
            .find(|(product_id, _)| product_id.as_str() == id)
            .map(|(_, quantity)| *quantity)
    }

    #[must_use]
    pub fn orders(&self) -> Vec<OrderPayload> {
        self.state().orders.clone()
    }

    #[must_use]
    pub fn confirmations(&self) -> Vec<OrderConfirmation> {
        self.state().confirmations.clone()
    }

    #[must_use]
    pub fn payment_requests(&self) -> Vec<PaymentOrderRequest> {
        self.state().payment_requests.clone()
    }

    #[must_use]
    pub fn address_updates(&self) -> Vec<(UserId, UserAddressUpdate)> {
        self.state().address_updates.clone()
    }

    #[must_use]
    pub fn captures(&self) -> Vec<(PaymentOrderId, PayerId)> {
        self.state().captures.clone()
    }

    /// Journal the call and return the injected fault, if any.
    fn enter(&self, endpoint: Endpoint) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        state.calls.push(endpoint);
        let count = state.counts.entry(endpoint).or_default();
        *count += 1;
        let count = *count;

        let fault = state
            .faults
            .iter()
            .find(|rule| rule.endpoint == endpoint && rule.nth.is_none_or(|nth| nth == count))
            .map(|rule| rule.fault.to_error());
        match fault {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl FakeState {
    fn summary(&self, id: &ProductId) -> Populated<ProductSummary, ProductId> {
        self.products.iter().find(|p| &p.id == id).map_or_else(
            || Populated::Id(id.clone()),
            |product| {
                Populated::Document(ProductSummary {
                    id: product.id.clone(),
                    title: product.title.clone(),
                    description: product.description.clone(),
                    price: product.price,
                    image: product.image.clone(),
                })
            },
        )
    }
}

#[async_trait]
impl StoreBackend for FakeBackend {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let state = self.enter(Endpoint::ListProducts)?;
        Ok(state.products.clone())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let state = self.enter(Endpoint::GetProduct)?;
        state
            .products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
    }

    async fn fetch_cart(&self, _token: &SecretString) -> Result<CartEnvelope, ApiError> {
        let state = self.enter(Endpoint::FetchCart)?;
        let products = state
            .cart
            .iter()
            .map(|(id, quantity)| CartEntry {
                id: None,
                product: Some(state.summary(id)),
                quantity: i64::from(*quantity),
            })
            .collect();
        Ok(CartEnvelope {
            cart: Some(CartPayload { products }),
        })
    }

    async fn add_cart_item(
        &self,
        _token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::AddCartItem)?;
        if let Some((_, quantity)) = state.cart.iter_mut().find(|(id, _)| id == &line.product_id) {
            *quantity += line.quantity;
        } else {
            state.cart.push((line.product_id.clone(), line.quantity));
        }
        Ok(())
    }

    async fn update_cart_item(
        &self,
        _token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::UpdateCartItem)?;
        let (_, quantity) = state
            .cart
            .iter_mut()
            .find(|(id, _)| id == &line.product_id)
            .ok_or_else(|| ApiError::NotFound("Item not in cart".to_string()))?;
        *quantity = line.quantity;
        Ok(())
    }

    async fn remove_cart_item(
        &self,
        _token: &SecretString,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::RemoveCartItem)?;
        state.cart.retain(|(id, _)| id != product_id);
        Ok(())
    }

    async fn fetch_me(&self, _token: &SecretString) -> Result<MeResponse, ApiError> {
        let state = self.enter(Endpoint::FetchMe)?;
        Ok(MeResponse {
            user: state.profile.clone(),
        })
    }

    async fn update_user_address(
        &self,
        _token: &SecretString,
        user_id: &UserId,
        update: &UserAddressUpdate,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::UpdateUserAddress)?;
        state.address_updates.push((user_id.clone(), update.clone()));
        Ok(())
    }

    async fn verify_coupon(&self, code: &str) -> Result<CouponVerification, ApiError> {
        let state = self.enter(Endpoint::VerifyCoupon)?;
        match state.coupons.get(&code.to_uppercase()) {
            Some(coupon) => Ok(CouponVerification {
                success: true,
                coupon: Some(coupon.clone()),
                message: None,
            }),
            None => Err(ApiError::NotFound("Coupon not found or expired".to_string())),
        }
    }

    async fn send_order_confirmation(
        &self,
        _token: &SecretString,
        confirmation: &OrderConfirmation,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::SendOrderConfirmation)?;
        state.confirmations.push(confirmation.clone());
        Ok(())
    }

    async fn create_order(
        &self,
        _token: &SecretString,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ApiError> {
        let mut state = self.enter(Endpoint::CreateOrder)?;
        state.orders.push(order.clone());
        let created = match &state.issued_order_id {
            Some(id) => CreatedOrder {
                id: Some(id.as_str().into()),
                order_id: None,
                order: None,
            },
            None => CreatedOrder {
                id: Some(ORDER_DOCUMENT_ID.into()),
                order_id: Some(order.order_id.clone()),
                order: None,
            },
        };
        Ok(created)
    }

    async fn create_payment_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> Result<PaymentOrder, ApiError> {
        let mut state = self.enter(Endpoint::CreatePaymentOrder)?;
        state.payment_requests.push(request.clone());
        Ok(PaymentOrder {
            id: Some(PaymentOrderId::new(PAYMENT_ORDER_ID)),
            approval_url: state.approval_url.clone(),
        })
    }

    async fn capture_payment(
        &self,
        order_id: &PaymentOrderId,
        payer_id: &PayerId,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Endpoint::CapturePayment)?;
        state.captures.push((order_id.clone(), payer_id.clone()));
        Ok(())
    }

    async fn confirm_capture(
        &self,
        order_id: &PaymentOrderId,
    ) -> Result<CaptureConfirmation, ApiError> {
        let _state = self.enter(Endpoint::ConfirmCapture)?;
        Ok(CaptureConfirmation {
            success: true,
            payment: Some(serde_json::json!({
                "orderId": order_id.as_str(),
                "amount": "22.50",
                "status": "COMPLETED",
            })),
            message: None,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// A storefront over `backend` with the default configuration.
#[must_use]
pub fn storefront(backend: &Arc<FakeBackend>) -> Storefront {
    Storefront::with_backend(StorefrontConfig::default(), Arc::clone(backend) as _)
}

/// A signed-in shopper.
#[must_use]
pub fn session() -> Session {
    Session::new(
        CurrentUser {
            id: UserId::new("65f0c0ffee"),
            fullname: Some("Nguyen Van An".to_string()),
            username: Some("an".to_string()),
            email: "an@example.com".parse().ok(),
        },
        SecretString::from("test-token"),
    )
}

/// A profile with a complete stored address.
#[must_use]
pub fn complete_profile() -> UserProfile {
    UserProfile {
        fullname: Some("Nguyen Van An".to_string()),
        username: Some("an".to_string()),
        phone: Some("0912345678".to_string()),
        address: Some(marketstall_storefront::api::StoredAddress {
            street: Some("12 Hang Bac".to_string()),
            zipcode: None,
            city: Some("Hanoi".to_string()),
            country: Some("Vietnam".to_string()),
        }),
    }
}

/// The usual two-product cart: 2 x 10.00 and 1 x 5.00.
#[must_use]
pub fn two_product_backend() -> FakeBackend {
    FakeBackend::new()
        .with_product("p1", "Lamp", 1000)
        .with_product("p2", "Mug", 500)
        .with_cart_line("p1", 2)
        .with_cart_line("p2", 1)
        .with_profile(complete_profile())
}
