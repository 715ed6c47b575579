//! `reqwest` implementation of [`StoreBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use marketstall_core::{PayerId, PaymentOrderId, ProductId, UserId};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    CaptureConfirmRequest, CaptureConfirmation, CaptureRequest, CartEnvelope, CartLineRequest,
    CouponVerification, CreatedOrder, MeResponse, OrderConfirmation, OrderPayload, PaymentOrder,
    PaymentOrderRequest, Product, UserAddressUpdate,
};
use super::{ApiError, StoreBackend};
use crate::config::StorefrontConfig;

/// Characters of a response body kept in logs and error messages.
const BODY_PREVIEW: usize = 500;

/// Error body shape used by every backend route.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace REST API.
///
/// Cheap to clone. Product reads are cached for the configured TTL; carts,
/// profiles, coupons and orders are always fetched fresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    config: StorefrontConfig,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .user_agent(concat!("marketstall/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                config: config.clone(),
                cache,
            }),
        })
    }

    /// Build a request against an API path.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.config.endpoint(path)?;
        Ok(self.inner.client.request(method, url))
    }

    /// Build a request carrying the session's bearer token.
    fn authed(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(method, path)?.bearer_auth(token.expose_secret()))
    }

    /// Send a request and return the body of a successful response.
    async fn send(request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        tracing::error!(
            status = %status,
            body = %body.chars().take(BODY_PREVIEW).collect::<String>(),
            "Marketplace API returned non-success status"
        );

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.chars().take(200).collect());

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(message));
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Send a request and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(BODY_PREVIEW).collect::<String>(),
                "Failed to parse marketplace API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn send_empty(request: RequestBuilder) -> Result<(), ApiError> {
        Self::send(request).await.map(drop)
    }
}

#[async_trait]
impl StoreBackend for ApiClient {
    // =========================================================================
    // Catalog
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = Self::send_json(self.request(Method::GET, "products")?).await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let product: Product = Self::send_json(self.request(Method::GET, &path)?).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip_all)]
    async fn fetch_cart(&self, token: &SecretString) -> Result<CartEnvelope, ApiError> {
        Self::send_json(self.authed(Method::GET, "cart", token)?).await
    }

    #[instrument(skip(self, token), fields(product_id = %line.product_id, quantity = line.quantity))]
    async fn add_cart_item(
        &self,
        token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError> {
        Self::send_empty(self.authed(Method::POST, "cart/add", token)?.json(line)).await
    }

    #[instrument(skip(self, token), fields(product_id = %line.product_id, quantity = line.quantity))]
    async fn update_cart_item(
        &self,
        token: &SecretString,
        line: &CartLineRequest,
    ) -> Result<(), ApiError> {
        Self::send_empty(self.authed(Method::PUT, "cart/update", token)?.json(line)).await
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("cart/remove/{}", urlencoding::encode(product_id.as_str()));
        Self::send_empty(self.authed(Method::DELETE, &path, token)?).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[instrument(skip_all)]
    async fn fetch_me(&self, token: &SecretString) -> Result<MeResponse, ApiError> {
        Self::send_json(self.authed(Method::GET, "auth/me", token)?).await
    }

    #[instrument(skip(self, token, update), fields(user_id = %user_id))]
    async fn update_user_address(
        &self,
        token: &SecretString,
        user_id: &UserId,
        update: &UserAddressUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("admin/users/{}", urlencoding::encode(user_id.as_str()));
        Self::send_empty(self.authed(Method::PUT, &path, token)?.json(update)).await
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    #[instrument(skip(self))]
    async fn verify_coupon(&self, code: &str) -> Result<CouponVerification, ApiError> {
        let path = format!("coupons/verify/{}", urlencoding::encode(code));
        Self::send_json(self.request(Method::GET, &path)?).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    #[instrument(skip(self, token, confirmation), fields(order_id = %confirmation.order_details.order_id))]
    async fn send_order_confirmation(
        &self,
        token: &SecretString,
        confirmation: &OrderConfirmation,
    ) -> Result<(), ApiError> {
        let request = self
            .authed(Method::POST, "email/send-order-confirmation", token)?
            .json(confirmation);
        Self::send_empty(request).await
    }

    #[instrument(skip(self, token, order), fields(order_id = %order.order_id))]
    async fn create_order(
        &self,
        token: &SecretString,
        order: &OrderPayload,
    ) -> Result<CreatedOrder, ApiError> {
        let body = Self::send(self.authed(Method::POST, "admin/orders", token)?.json(order)).await?;

        // The order store is not consistent about echoing the order back.
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            debug!(error = %e, "Order store response carried no order document");
            CreatedOrder::default()
        }))
    }

    // =========================================================================
    // Payments
    // =========================================================================

    #[instrument(skip(self, request), fields(order_id = %request.order_id, total = request.total_amount))]
    async fn create_payment_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> Result<PaymentOrder, ApiError> {
        Self::send_json(self.request(Method::POST, "paypal/create-order")?.json(request)).await
    }

    #[instrument(skip(self))]
    async fn capture_payment(
        &self,
        order_id: &PaymentOrderId,
        payer_id: &PayerId,
    ) -> Result<(), ApiError> {
        let body = CaptureRequest {
            order_id: order_id.clone(),
            payer_id: payer_id.clone(),
        };
        Self::send_empty(self.request(Method::POST, "paypal/capture-payment")?.json(&body)).await
    }

    #[instrument(skip(self))]
    async fn confirm_capture(
        &self,
        order_id: &PaymentOrderId,
    ) -> Result<CaptureConfirmation, ApiError> {
        let body = CaptureConfirmRequest {
            order_id: order_id.clone(),
        };
        Self::send_json(self.request(Method::POST, "paypal/capture")?.json(&body)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_targets_api_prefix() {
        let client = ApiClient::new(&StorefrontConfig::default()).unwrap();
        let request = client
            .request(Method::GET, "coupons/verify/SAVE10")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5000/api/coupons/verify/SAVE10"
        );
    }

    #[test]
    fn test_authed_request_carries_bearer_token() {
        let client = ApiClient::new(&StorefrontConfig::default()).unwrap();
        let token = SecretString::from("tok-123");
        let request = client
            .authed(Method::GET, "cart", &token)
            .unwrap()
            .build()
            .unwrap();
        let header = request.headers().get("authorization").unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer tok-123");
    }

    #[test]
    fn test_error_body_message_is_optional() {
        let body: ErrorBody = serde_json::from_str(r#"{"message": "Invalid coupon"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Invalid coupon"));
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_none());
    }
}
