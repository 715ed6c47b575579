//! Line item quantity.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at one.
    #[error("quantity must be at least 1 (got {0})")]
    BelowOne(i64),
    /// The value does not fit in a `u32`.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// Number of units of one product in a cart or order. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity from a signed count.
    ///
    /// # Errors
    ///
    /// Returns an error if the count is below one or exceeds `u32::MAX`.
    pub fn new(count: i64) -> Result<Self, QuantityError> {
        if count < 1 {
            return Err(QuantityError::BelowOne(count));
        }
        let count = u32::try_from(count).map_err(|_| QuantityError::TooLarge(count))?;
        NonZeroU32::new(count)
            .map(Self)
            .ok_or(QuantityError::BelowOne(0))
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(count: i64) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(QuantityError::BelowOne(0)));
        assert_eq!(Quantity::new(-3), Err(QuantityError::BelowOne(-3)));
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(matches!(
            Quantity::new(i64::from(u32::MAX) + 1),
            Err(QuantityError::TooLarge(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Quantity>("2").is_ok());
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Quantity::ONE).ok();
        assert_eq!(json.as_deref(), Some("1"));
    }
}
