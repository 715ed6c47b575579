//! Integration tests for the persisted session and cart operations.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use marketstall_core::{ProductId, Quantity};
use marketstall_integration_tests::{Endpoint, Fault, FakeBackend, session, storefront};
use marketstall_storefront::{CheckoutError, SessionStore};

fn temp_store() -> SessionStore {
    let dir = std::env::temp_dir().join(format!("marketstall-it-{}", uuid::Uuid::new_v4()));
    SessionStore::new(dir.join("session.json"))
}

#[tokio::test]
async fn test_stored_session_drives_cart() {
    let store = temp_store();
    store.save(&session()).unwrap();

    let backend = Arc::new(FakeBackend::new().with_product("p1", "Lamp", 1000));
    let storefront = storefront(&backend);
    let session = store.load().unwrap().unwrap();

    storefront
        .add_to_cart(&session, &ProductId::new("p1"), Quantity::new(2).unwrap())
        .await
        .unwrap();
    storefront
        .add_to_cart(&session, &ProductId::new("p1"), Quantity::ONE)
        .await
        .unwrap();

    assert_eq!(storefront.cart_count(Some(&session)).await, 1);
    assert_eq!(backend.cart_quantity("p1"), Some(3));

    let cart = storefront.load_cart(&session).await.unwrap();
    assert_eq!(cart.items()[0].title, "Lamp");

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_cart_count_is_zero_when_signed_out_or_failing() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_product("p1", "Lamp", 1000)
            .with_cart_line("p1", 1)
            .failing_nth(Endpoint::FetchCart, 2, Fault::Unavailable),
    );
    let storefront = storefront(&backend);

    assert_eq!(storefront.cart_count(None).await, 0);
    assert_eq!(storefront.cart_count(Some(&session())).await, 1);
    assert_eq!(storefront.cart_count(Some(&session())).await, 0);
}

#[tokio::test]
async fn test_expired_session_on_cart_load() {
    let backend = Arc::new(FakeBackend::new().failing(Endpoint::FetchCart, Fault::Unauthorized));
    let storefront = storefront(&backend);

    let err = storefront.load_cart(&session()).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Api {
            context: "fetchCartItems",
            ..
        }
    ));
    assert_eq!(err.redirect(), Some("/auth"));
}

#[tokio::test]
async fn test_catalog_search_by_title() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_product("p1", "Desk Lamp", 1000)
            .with_product("p2", "Mug", 500),
    );
    let storefront = storefront(&backend);

    let products = storefront.list_products().await.unwrap();
    let found = marketstall_storefront::catalog::search(&products, "lamp");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "p1");
    assert_eq!(backend.count(Endpoint::ListProducts), 1);
}

#[tokio::test]
async fn test_unknown_product() {
    let backend = Arc::new(FakeBackend::new());
    let storefront = storefront(&backend);

    let err = storefront
        .get_product(&ProductId::new("missing"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Api {
            context: "fetchProduct",
            ..
        }
    ));
}
