//! Cart commands.

use marketstall_core::{CurrencyCode, ProductId, Quantity};
use marketstall_storefront::checkout::pricing::subtotal;
use marketstall_storefront::checkout::CartLines;
use marketstall_storefront::{Session, Storefront};
use tracing::info;

use super::CommandError;

/// Print cart lines with their totals.
pub fn print_lines(cart: &CartLines, currency: CurrencyCode) {
    for item in cart.items() {
        println!(
            "{:<26} {:>3} x {:>10} = {:>10}  {}",
            item.product_id,
            item.quantity,
            item.unit_price.display(currency),
            item.line_total().display(currency),
            item.title
        );
    }
}

/// Show the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be fetched.
pub async fn show(storefront: &Storefront, session: &Session) -> Result<(), CommandError> {
    let currency = storefront.config().currency;
    let cart = storefront.load_cart(session).await?;

    if cart.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }
    print_lines(&cart, currency);
    println!(
        "{} item(s), subtotal {}",
        cart.item_count(),
        subtotal(&cart).display(currency)
    );
    Ok(())
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error for a quantity below 1 or if the backend refuses.
pub async fn add(
    storefront: &Storefront,
    session: &Session,
    id: &str,
    quantity: i64,
) -> Result<(), CommandError> {
    let quantity =
        Quantity::new(quantity).map_err(|e| CommandError::Invalid(format!("Quantity: {e}")))?;
    let product_id = ProductId::new(id);
    storefront
        .add_to_cart(session, &product_id, quantity)
        .await?;

    info!(product_id = %product_id, quantity = quantity.get(), "Added to cart");
    let count = storefront.cart_count(Some(session)).await;
    println!("Added. Cart now holds {count} product(s).");
    Ok(())
}

/// Set a product's quantity.
///
/// # Errors
///
/// Returns an error for a quantity below 1 or if the backend refuses.
pub async fn update(
    storefront: &Storefront,
    session: &Session,
    id: &str,
    quantity: i64,
) -> Result<(), CommandError> {
    let quantity = storefront
        .update_quantity(session, &ProductId::new(id), quantity)
        .await?;
    println!("Quantity set to {quantity}.");
    Ok(())
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Returns an error if the backend refuses.
pub async fn remove(
    storefront: &Storefront,
    session: &Session,
    id: &str,
) -> Result<(), CommandError> {
    storefront
        .remove_from_cart(session, &ProductId::new(id))
        .await?;
    println!("Removed.");
    Ok(())
}
