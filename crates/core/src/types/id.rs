//! Newtype IDs for type-safe entity references.
//!
//! The marketplace backend issues opaque string identifiers (document IDs),
//! so every ID wraps a `String`. Use the `define_id!` macro to create wrappers
//! that prevent accidentally mixing IDs from different entity types.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use marketstall_core::define_id;
/// define_id!(SellerId);
/// define_id!(ReviewId);
///
/// let seller = SellerId::new("65f0c0ffee");
/// let review = ReviewId::new("65f0c0ffee");
///
/// // These are different types, so this won't compile:
/// // let _: SellerId = review;
/// assert_eq!(seller.as_str(), review.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(PaymentOrderId);
define_id!(PayerId);

impl OrderId {
    /// Prefix for identifiers generated on the client.
    pub const CLIENT_PREFIX: &'static str = "ORD-";

    /// Generate a provisional client-side order reference.
    ///
    /// Uses a random v4 UUID so references do not collide across sessions.
    /// The order store may replace it with its own identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Self::CLIENT_PREFIX,
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Whether this identifier was generated locally rather than issued by the backend.
    #[must_use]
    pub fn is_client_generated(&self) -> bool {
        self.0.starts_with(Self::CLIENT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = ProductId::new("p-1");
        assert_eq!(id.as_str(), "p-1");
        assert_eq!(id.to_string(), "p-1");
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = UserId::from("u-42");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"u-42\""));
    }

    #[test]
    fn test_generated_order_ids_are_distinct() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert_ne!(a, b);
        assert!(a.is_client_generated());
        assert!(a.as_str().len() > OrderId::CLIENT_PREFIX.len() + 16);
    }

    #[test]
    fn test_server_issued_order_id_is_not_client_generated() {
        assert!(!OrderId::new("66a1b2c3d4").is_client_generated());
    }
}
