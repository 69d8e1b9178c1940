//! Cart line items.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity must be at least one.
    #[error("quantity must be a positive integer")]
    Zero,
}

/// A positive number of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] when `units == 0`.
    pub fn new(units: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(units).map(Self).ok_or(QuantityError::Zero)
    }

    /// The number of units.
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

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cart line as stored in local storage.
///
/// Field names match the persisted JSON exactly:
/// `{"id":"1","name":"Test","price":10,"quantity":1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Number of units, always at least one.
    pub quantity: Quantity,
}

impl CartItem {
    /// Create a new cart line.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_quantity_rejects_zero() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_cart_item_json_shape() {
        let item = CartItem::new(
            "1",
            "Test",
            Price::new(Decimal::from(10)).unwrap(),
            Quantity::ONE,
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["name"], "Test");
        assert_eq!(json["price"], 10.0);
        assert_eq!(json["quantity"], 1);
    }

    #[test]
    fn test_parses_stored_entry() {
        let item: CartItem =
            serde_json::from_str(r#"{"id":"1","name":"Test","price":10,"quantity":1}"#).unwrap();
        assert_eq!(item.id.as_str(), "1");
        assert_eq!(item.quantity, Quantity::ONE);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let item: CartItem = serde_json::from_str(
            r#"{"id":"1","name":"Test Product","price":29.99,"quantity":1,"image":"/test-image.jpg"}"#,
        )
        .unwrap();
        assert_eq!(item.name, "Test Product");
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new(
            "1",
            "Socks",
            Price::new(Decimal::new(499, 2)).unwrap(),
            Quantity::new(3).unwrap(),
        );
        assert_eq!(item.line_total().amount(), Decimal::new(1497, 2));
    }
}
