//! Product catalog reads and search.

use marketstall_core::ProductId;
use tracing::instrument;

use crate::api::Product;
use crate::error::Result;
use crate::state::Storefront;

impl Storefront {
    /// All products, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` if the catalog cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        match self.backend().list_products().await {
            Ok(products) => Ok(products),
            Err(e) => Err(self.reported("fetchProducts", e).await),
        }
    }

    /// One product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` if the product is missing or the fetch
    /// fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        match self.backend().get_product(id).await {
            Ok(product) => Ok(product),
            Err(e) => Err(self.reported("fetchProduct", e).await),
        }
    }
}

/// Products whose title contains `query`, ignoring case.
///
/// An empty or blank query matches everything.
#[must_use]
pub fn search<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }
    products
        .iter()
        .filter(|product| product.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn products() -> Vec<Product> {
        serde_json::from_str(
            r#"[
                {"_id": "p1", "title": "Brass Desk Lamp", "price": 4500},
                {"_id": "p2", "title": "Ceramic Mug", "price": 900},
                {"_id": "p3", "title": "Floor lamp", "price": 12000}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let products = products();
        let hits: Vec<_> = search(&products, "LAMP").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(hits, ["p1", "p3"]);
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let products = products();
        assert_eq!(search(&products, "  ").len(), 3);
        assert!(search(&products, "sofa").is_empty());
    }
}
