//! Integration tests for order submission and payment handoff.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use marketstall_core::{Money, OrderStatus, ShippingTier};
use marketstall_integration_tests::{
    APPROVAL_URL, Endpoint, Fault, FakeBackend, ORDER_DOCUMENT_ID, PAYMENT_ORDER_ID,
    complete_profile, session, storefront, two_product_backend,
};
use marketstall_storefront::api::ApiError;
use marketstall_storefront::checkout::AddressState;
use marketstall_storefront::{Checkout, CheckoutError};
use rust_decimal::Decimal;

fn three_product_backend() -> FakeBackend {
    FakeBackend::new()
        .with_product("p1", "Lamp", 1000)
        .with_product("p2", "Mug", 500)
        .with_product("p3", "Rug", 4000)
        .with_cart_line("p1", 1)
        .with_cart_line("p2", 1)
        .with_cart_line("p3", 1)
        .with_profile(complete_profile())
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn test_submit_runs_steps_in_order() {
    let backend = Arc::new(two_product_backend().with_coupon("SAVE10", Decimal::TEN));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    checkout.apply_discount("SAVE10").await;
    let pending = checkout.submit().await.unwrap();

    let email = backend.first_call(Endpoint::SendOrderConfirmation).unwrap();
    let create = backend.first_call(Endpoint::CreateOrder).unwrap();
    let remove = backend.first_call(Endpoint::RemoveCartItem).unwrap();
    let payment = backend.first_call(Endpoint::CreatePaymentOrder).unwrap();
    assert!(email < create);
    assert!(create < remove);
    assert!(remove < payment);

    assert_eq!(pending.approval_url, APPROVAL_URL);
    assert_eq!(
        pending.payment_order_id.as_ref().map(|id| id.as_str()),
        Some(PAYMENT_ORDER_ID)
    );
    assert!(pending.cart_cleared.is_complete());
    assert!(backend.cart_product_ids().is_empty());
}

#[tokio::test]
async fn test_submitted_order_carries_priced_cart() {
    let backend = Arc::new(two_product_backend().with_coupon("SAVE10", Decimal::TEN));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    checkout.apply_discount("SAVE10").await;
    checkout.submit().await.unwrap();

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert!(order.order_id.is_client_generated());
    assert_eq!(order.user_id.as_str(), "65f0c0ffee");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total_amount, Decimal::new(2250, 2));
    assert_eq!(order.discount_amount, Decimal::new(250, 2));
    assert_eq!(order.shipping_fee, Decimal::ZERO);
    assert_eq!(order.discount_code.as_deref(), Some("SAVE10"));
    assert_eq!(order.shipping_address.address, "12 Hang Bac");

    let confirmations = backend.confirmations();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(
        confirmations[0].customer_email.as_ref().map(|e| e.as_str()),
        Some("an@example.com")
    );

    let requests = backend.payment_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].order_id, order.order_id);
    assert_eq!(requests[0].total_amount, 2250);
}

#[tokio::test]
async fn test_express_fee_reaches_order_and_payment() {
    let backend = Arc::new(two_product_backend());
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    checkout.select_shipping(ShippingTier::Express);
    checkout.submit().await.unwrap();

    assert_eq!(backend.orders()[0].shipping_fee, Decimal::new(500, 2));
    assert_eq!(backend.payment_requests()[0].total_amount, 3000);
}

#[tokio::test]
async fn test_checkout_is_empty_after_order() {
    let backend = Arc::new(two_product_backend().with_coupon("SAVE10", Decimal::TEN));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    checkout.apply_discount("SAVE10").await;
    checkout.submit().await.unwrap();

    assert!(checkout.cart().is_empty());
    assert!(checkout.discount().is_none());
    assert!(checkout.discount_message().is_none());
    assert_eq!(checkout.summary().total, Money::ZERO);

    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(backend.count(Endpoint::CreateOrder), 1);
    assert_eq!(backend.count(Endpoint::CreatePaymentOrder), 1);
}

#[tokio::test]
async fn test_echoed_order_id_matches_confirmation_email() {
    let backend = Arc::new(two_product_backend());
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let pending = checkout.submit().await.unwrap();

    let emailed = backend.confirmations()[0].order_details.order_id.clone();
    assert!(emailed.is_client_generated());
    assert_eq!(pending.order.order_id, emailed);
    assert_ne!(pending.order.order_id.as_str(), ORDER_DOCUMENT_ID);
    assert_eq!(backend.payment_requests()[0].order_id, emailed);
}

#[tokio::test]
async fn test_server_issued_order_id_is_adopted() {
    let backend = Arc::new(two_product_backend().issuing_order_id("66a1f00dbabe"));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let pending = checkout.submit().await.unwrap();

    assert_eq!(pending.order.order_id.as_str(), "66a1f00dbabe");
    assert_eq!(
        backend.payment_requests()[0].order_id.as_str(),
        "66a1f00dbabe"
    );
}

// =============================================================================
// Preconditions
// =============================================================================

#[tokio::test]
async fn test_submit_without_session_redirects_to_sign_in() {
    let backend = Arc::new(two_product_backend());
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, None).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(err, CheckoutError::NotAuthenticated));
    assert_eq!(err.redirect(), Some("/auth"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_submit_with_empty_cart() {
    let backend = Arc::new(FakeBackend::new().with_profile(complete_profile()));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(backend.count(Endpoint::CreateOrder), 0);
}

#[tokio::test]
async fn test_address_form_blocks_until_valid() {
    let backend = Arc::new(two_product_backend().failing(Endpoint::FetchMe, Fault::Unavailable));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    assert!(checkout.address().is_form_active());

    let err = checkout.submit().await.unwrap_err();
    let CheckoutError::InvalidAddress(errors) = err else {
        panic!("expected form errors, got {err:?}");
    };
    assert_eq!(errors.name.as_deref(), Some("Please enter your full name"));
    assert_eq!(errors.phone.as_deref(), Some("Please enter your phone number"));
    assert_eq!(backend.count(Endpoint::SendOrderConfirmation), 0);

    {
        let form = checkout.address_mut().form_mut().unwrap();
        "An".clone_into(&mut form.name);
        "12 Hang Bac".clone_into(&mut form.street);
        "12345".clone_into(&mut form.phone);
    }
    let err = checkout.submit().await.unwrap_err();
    let CheckoutError::InvalidAddress(errors) = err else {
        panic!("expected a phone error, got {err:?}");
    };
    assert_eq!(
        errors.phone.as_deref(),
        Some("Invalid phone number (10-11 digits)")
    );
    assert!(errors.name.is_none());

    "0912345678".clone_into(&mut checkout.address_mut().form_mut().unwrap().phone);
    let pending = checkout.submit().await.unwrap();

    assert!(matches!(checkout.address(), AddressState::Resolved(_)));
    assert_eq!(pending.order.shipping_address.phone, "0912345678");
    let updates = backend.address_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.phone, "0912345678");
    assert_eq!(updates[0].1.address.street.as_deref(), Some("12 Hang Bac"));
}

#[tokio::test]
async fn test_failed_address_save_does_not_block_order() {
    let backend = Arc::new(
        two_product_backend()
            .failing(Endpoint::FetchMe, Fault::Unavailable)
            .failing(Endpoint::UpdateUserAddress, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    {
        let form = checkout.address_mut().form_mut().unwrap();
        "An".clone_into(&mut form.name);
        "12 Hang Bac".clone_into(&mut form.street);
        "09123456789".clone_into(&mut form.phone);
    }

    checkout.submit().await.unwrap();
    assert_eq!(backend.orders().len(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failed_email_does_not_block_order() {
    let backend = Arc::new(
        two_product_backend().failing(Endpoint::SendOrderConfirmation, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    checkout.submit().await.unwrap();

    assert_eq!(backend.orders().len(), 1);
    assert_eq!(backend.count(Endpoint::CreatePaymentOrder), 1);
}

#[tokio::test]
async fn test_rejected_order_stops_before_cart_and_payment() {
    let backend = Arc::new(two_product_backend().failing(
        Endpoint::CreateOrder,
        Fault::Rejected(400, "Invalid order".to_string()),
    ));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Api {
            context: "handleCheckout",
            ..
        }
    ));
    assert_eq!(err.user_message(), "An error occurred while placing your order");
    assert_eq!(backend.count(Endpoint::RemoveCartItem), 0);
    assert_eq!(backend.count(Endpoint::CreatePaymentOrder), 0);
    assert_eq!(backend.cart_product_ids().len(), 2);
}

#[tokio::test]
async fn test_expired_token_on_order_redirects() {
    let backend = Arc::new(two_product_backend().failing(Endpoint::CreateOrder, Fault::Unauthorized));
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Api {
            source: ApiError::Unauthorized,
            ..
        }
    ));
    assert_eq!(err.redirect(), Some("/auth"));
}

#[tokio::test]
async fn test_failed_deletion_does_not_stop_the_rest() {
    let backend = Arc::new(
        three_product_backend().failing_nth(Endpoint::RemoveCartItem, 2, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let pending = checkout.submit().await.unwrap();

    assert_eq!(backend.count(Endpoint::RemoveCartItem), 3);
    assert_eq!(backend.cart_product_ids(), vec!["p2".to_string()]);

    let report = &pending.cart_cleared;
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.succeeded().count(), 2);
    let failed: Vec<_> = report.failed().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["p2"]);
    assert!(!report.is_complete());
    assert_eq!(backend.count(Endpoint::CreatePaymentOrder), 1);
}

#[tokio::test]
async fn test_failed_cart_refetch_is_reported_not_fatal() {
    // Load is the first fetch; the re-read before clearing is the second.
    let backend = Arc::new(
        two_product_backend().failing_nth(Endpoint::FetchCart, 2, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let pending = checkout.submit().await.unwrap();

    assert!(pending.cart_cleared.fetch_error().is_some());
    assert_eq!(pending.cart_cleared.attempted(), 0);
    assert!(!pending.cart_cleared.is_complete());
    assert_eq!(backend.count(Endpoint::RemoveCartItem), 0);
}

#[tokio::test]
async fn test_missing_approval_url_fails_payment() {
    let backend = Arc::new(two_product_backend().without_approval_url());
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentFailed(_)));
    assert_eq!(backend.orders().len(), 1);
    assert!(backend.cart_product_ids().is_empty());
}

#[tokio::test]
async fn test_payment_service_failure() {
    let backend = Arc::new(
        two_product_backend().failing(Endpoint::CreatePaymentOrder, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    let mut checkout = Checkout::load(&storefront, Some(&session())).await;
    let err = checkout.submit().await.unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentFailed(_)));
    assert_eq!(err.user_message(), "Payment failed, please try again");
}
