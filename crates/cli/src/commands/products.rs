//! Catalog browsing.

use marketstall_core::{Money, ProductId};
use marketstall_storefront::Storefront;
use marketstall_storefront::catalog::search;
use tracing::info;

use super::CommandError;

/// List products, optionally filtered by title.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn list(storefront: &Storefront, query: Option<&str>) -> Result<(), CommandError> {
    let currency = storefront.config().currency;
    let products = storefront.list_products().await?;
    let matches = search(&products, query.unwrap_or_default());

    info!(total = products.len(), shown = matches.len(), "Listed products");

    if matches.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in matches {
        println!(
            "{:<26} {:>10}  {}",
            product.id,
            Money::from_minor(product.price).display(currency),
            product.title
        );
    }
    Ok(())
}

/// Show one product.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched.
pub async fn show(storefront: &Storefront, id: &str) -> Result<(), CommandError> {
    let currency = storefront.config().currency;
    let product = storefront.get_product(&ProductId::new(id)).await?;

    println!("{}", product.title);
    println!("  ID:        {}", product.id);
    println!(
        "  Price:     {}",
        Money::from_minor(product.price).display(currency)
    );
    println!("  Condition: {}", product.condition_label());
    if let Some(seller) = product.seller_id() {
        println!("  Seller:    {seller}");
    }
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{description}");
    }
    Ok(())
}
