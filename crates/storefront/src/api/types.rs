//! Wire types for the marketplace REST API.
//!
//! These mirror the JSON the backend sends and expects. Domain code works
//! with the normalized types in [`crate::checkout`]; conversion lives in
//! [`super::conversions`].

use chrono::{DateTime, Utc};
use marketstall_core::{CartItemId, Email, OrderId, PayerId, PaymentOrderId, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog
// =============================================================================

/// A reference that the backend may send either populated or as a bare ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Populated<T, Id> {
    /// The referenced document was joined into the response.
    Document(T),
    /// Only the identifier was sent.
    Id(Id),
}

/// Product fields embedded in a cart entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in minor currency units.
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub image: Option<String>,
}

/// Seller fields embedded in a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A catalog product as returned by `GET /products` and `GET /products/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in minor currency units.
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, rename = "sellerId")]
    pub seller: Option<Populated<SellerSummary, UserId>>,
}

impl Product {
    /// The seller's ID, whether or not the seller document was populated.
    #[must_use]
    pub fn seller_id(&self) -> Option<&UserId> {
        self.seller.as_ref().map(|seller| match seller {
            Populated::Document(s) => &s.id,
            Populated::Id(id) => id,
        })
    }

    /// Condition label, defaulting to "New".
    #[must_use]
    pub fn condition_label(&self) -> &str {
        self.condition.as_deref().unwrap_or("New")
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Response of `GET /cart`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartEnvelope {
    #[serde(default)]
    pub cart: Option<CartPayload>,
}

/// The cart document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub products: Vec<CartEntry>,
}

/// One entry of the cart document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(default, rename = "_id")]
    pub id: Option<CartItemId>,
    #[serde(rename = "productId")]
    pub product: Option<Populated<ProductSummary, ProductId>>,
    #[serde(default)]
    pub quantity: i64,
}

impl CartEntry {
    /// The product ID of this entry, whether or not the product was populated.
    #[must_use]
    pub fn product_id(&self) -> Option<&ProductId> {
        self.product.as_ref().map(|product| match product {
            Populated::Document(p) => &p.id,
            Populated::Id(id) => id,
        })
    }
}

impl CartEnvelope {
    /// The entries of the cart; empty when the backend sent no cart.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        self.cart.as_ref().map_or(&[], |cart| cart.products.as_slice())
    }
}

/// Body of `POST /cart/add` and `PUT /cart/update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineRequest {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub quantity: u32,
}

// =============================================================================
// Users
// =============================================================================

/// Response of `GET /auth/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// The authenticated user's stored profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<StoredAddress>,
}

/// Address as stored on the user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Body of `PUT /admin/users/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressUpdate {
    pub address: StoredAddress,
    pub phone: String,
}

// =============================================================================
// Coupons
// =============================================================================

/// Response of `GET /coupons/verify/:code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponVerification {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub coupon: Option<CouponPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A coupon as described by the coupon service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponPayload {
    pub code: String,
    #[serde(rename = "discountPercent", default)]
    pub discount_percent: Decimal,
    #[serde(rename = "productId", default)]
    pub product_id: Option<ProductId>,
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /admin/orders`; amounts are decimal major units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: marketstall_core::OrderStatus,
    pub items: Vec<OrderItemPayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_fee: Decimal,
    pub discount_code: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    pub shipping_address: AddressPayload,
}

/// One item of an order payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemPayload {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Shipping address as sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPayload {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub country: String,
}

/// Response of `POST /admin/orders`.
///
/// The order store may echo the order back, either at the top level or
/// nested under `order`. An echoed `order_id` wins over the document `_id`
/// so the shopper sees the same identifier the confirmation email quoted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedOrder {
    #[serde(default, rename = "_id")]
    pub id: Option<OrderId>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub order: Option<Box<CreatedOrder>>,
}

impl CreatedOrder {
    /// The identifier the order is known by in the store, if any.
    #[must_use]
    pub fn issued_id(&self) -> Option<&OrderId> {
        self.echoed_id().or_else(|| self.document_id())
    }

    fn echoed_id(&self) -> Option<&OrderId> {
        self.order_id
            .as_ref()
            .or_else(|| self.order.as_deref().and_then(Self::echoed_id))
    }

    fn document_id(&self) -> Option<&OrderId> {
        self.id
            .as_ref()
            .or_else(|| self.order.as_deref().and_then(Self::document_id))
    }
}

/// Body of `POST /email/send-order-confirmation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    #[serde(rename = "orderDetails")]
    pub order_details: OrderPayload,
    #[serde(rename = "customerEmail")]
    pub customer_email: Option<Email>,
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /paypal/create-order`; the total is in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrderRequest {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(rename = "totalAmount")]
    pub total_amount: i64,
}

/// Response of `POST /paypal/create-order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentOrder {
    #[serde(default)]
    pub id: Option<PaymentOrderId>,
    #[serde(default, rename = "approvalUrl")]
    pub approval_url: Option<String>,
}

/// Body of `POST /paypal/capture-payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "orderId")]
    pub order_id: PaymentOrderId,
    #[serde(rename = "payerId")]
    pub payer_id: PayerId,
}

/// Body of `POST /paypal/capture`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfirmRequest {
    #[serde(rename = "orderID")]
    pub order_id: PaymentOrderId,
}

/// Response of `POST /paypal/capture`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfirmation {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub payment: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_entry_accepts_populated_and_bare_product() {
        let json = r#"{
            "cart": {
                "products": [
                    {"_id": "c1", "productId": {"_id": "p1", "title": "Lamp", "price": 1000, "image": "lamp.png"}, "quantity": 2},
                    {"_id": "c2", "productId": "p2", "quantity": 1}
                ]
            }
        }"#;
        let envelope: CartEnvelope = serde_json::from_str(json).unwrap();
        let entries = envelope.entries();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].product, Some(Populated::Document(_))));
        assert_eq!(entries[1].product_id().map(ProductId::as_str), Some("p2"));
    }

    #[test]
    fn test_cart_envelope_without_cart_is_empty() {
        let envelope: CartEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.entries().is_empty());
    }

    #[test]
    fn test_coupon_percent_accepts_integer_and_fraction() {
        let json = r#"{"success": true, "coupon": {"code": "HALF", "discountPercent": 12.5}}"#;
        let verification: CouponVerification = serde_json::from_str(json).unwrap();
        let coupon = verification.coupon.unwrap();
        assert_eq!(coupon.discount_percent, Decimal::new(125, 1));
        assert!(coupon.product_id.is_none());
    }

    #[test]
    fn test_created_order_prefers_echoed_order_id() {
        let nested: CreatedOrder =
            serde_json::from_str(r#"{"order": {"_id": "66aa", "order_id": "ORD-1"}}"#).unwrap();
        assert_eq!(nested.issued_id().map(OrderId::as_str), Some("ORD-1"));

        let both: CreatedOrder =
            serde_json::from_str(r#"{"_id": "66aa", "order_id": "ORD-1"}"#).unwrap();
        assert_eq!(both.issued_id().map(OrderId::as_str), Some("ORD-1"));

        let document_only: CreatedOrder =
            serde_json::from_str(r#"{"order": {"_id": "66aa"}}"#).unwrap();
        assert_eq!(document_only.issued_id().map(OrderId::as_str), Some("66aa"));

        assert!(CreatedOrder::default().issued_id().is_none());
    }

    #[test]
    fn test_order_payload_amounts_serialize_as_numbers() {
        let payload = OrderPayload {
            order_id: OrderId::new("ORD-1"),
            user_id: UserId::new("u1"),
            order_date: DateTime::<Utc>::UNIX_EPOCH,
            total_amount: Decimal::new(2250, 2),
            status: marketstall_core::OrderStatus::Pending,
            items: vec![],
            shipping_fee: Decimal::ZERO,
            discount_code: Some("SAVE10".to_string()),
            discount_amount: Decimal::new(250, 2),
            shipping_address: AddressPayload {
                name: "An".to_string(),
                address: "1 Main St".to_string(),
                phone: "0912345678".to_string(),
                country: "Vietnam".to_string(),
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["total_amount"], serde_json::json!(22.5));
        assert_eq!(value["discount_amount"], serde_json::json!(2.5));
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn test_product_seller_id_from_bare_reference() {
        let product: Product =
            serde_json::from_str(r#"{"_id": "p1", "title": "Lamp", "price": 10, "sellerId": "s9"}"#)
                .unwrap();
        assert_eq!(product.seller_id().map(UserId::as_str), Some("s9"));
        assert_eq!(product.condition_label(), "New");
    }
}
