//! Shopping cart lines and their merge-by-key semantics.
//!
//! A line is identified by `(product id, size)`: adding the same product in
//! the same size merges quantities, a different size is a separate line.
//! Quantities are always at least one; driving a line to zero removes it.
//!
//! This type holds no storage handle. The storefront wraps it in a store that
//! persists the serialized lines after every mutation.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: String,
}

impl CartKey {
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
        }
    }
}

/// One product in one size with a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product snapshot taken when the line was added.
    pub product: Product,
    pub size: String,
    pub quantity: NonZeroU32,
}

impl CartLine {
    fn matches(&self, product_id: ProductId, size: &str) -> bool {
        self.product.id == product_id && self.size == size
    }

    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product.id, self.size.clone())
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.unit_price().times(self.quantity.get())
    }
}

/// An ordered collection of cart lines, at most one per [`CartKey`].
///
/// Serializes as a plain JSON array of lines. Deserializing merges any
/// duplicate keys so a hand-edited payload cannot break the invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product, line.size, line.quantity);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId, size: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(product_id, size))
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId, size: &str) -> bool {
        self.get(product_id, size).is_some()
    }

    /// Add `quantity` of `product` in `size`.
    ///
    /// Merges into an existing line with the same key, otherwise appends.
    /// There is no upper bound and no stock check. Quantities saturate at
    /// `u32::MAX` rather than wrapping.
    pub fn add(&mut self, product: Product, size: impl Into<String>, quantity: NonZeroU32) {
        let size = size.into();
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product.id, &size))
        {
            line.quantity = line.quantity.saturating_add(quantity.get());
            return;
        }
        self.lines.push(CartLine {
            product,
            size,
            quantity,
        });
    }

    /// Remove the line with this key. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId, size: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(product_id, size));
        self.lines.len() != before
    }

    /// Replace a line's quantity. Zero or negative removes the line.
    ///
    /// Returns whether the cart changed. Setting a quantity on a key that is
    /// not in the cart is a no-op.
    pub fn set_quantity(&mut self, product_id: ProductId, size: &str, quantity: i64) -> bool {
        let Some(quantity) = u32::try_from(quantity.max(0))
            .ok()
            .and_then(NonZeroU32::new)
        else {
            return self.remove(product_id, size);
        };

        match self
            .lines
            .iter_mut()
            .find(|line| line.matches(product_id, size))
        {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total_amount(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(price: i64) -> Product {
        Product {
            id: ProductId::random(),
            name: "Dashiki".to_string(),
            description: None,
            price: Decimal::from(price),
            images: vec![],
            sizes: vec!["M".to_string(), "L".to_string()],
            stock_quantity: Some(3),
            category_id: None,
            category: None,
            is_active: Some(true),
            created_at: None,
        }
    }

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_add_merges_same_key() {
        let p = product(1_000);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(1));
        cart.add(p.clone(), "M", qty(2));
        cart.add(p.clone(), "M", qty(4));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.get(p.id, "M").unwrap().quantity.get(), 7);
    }

    #[test]
    fn test_add_different_size_is_new_line() {
        let p = product(1_000);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(1));
        cart.add(p.clone(), "L", qty(1));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].key(), CartKey::new(p.id, "M"));
        assert_eq!(cart.lines()[1].key(), CartKey::new(p.id, "L"));
    }

    #[test]
    fn test_add_ignores_stock_quantity() {
        let p = product(1_000);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(10));
        assert_eq!(cart.total_items(), 10);
    }

    #[test]
    fn test_add_saturates() {
        let p = product(1);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(u32::MAX));
        cart.add(p.clone(), "M", qty(5));
        assert_eq!(cart.get(p.id, "M").unwrap().quantity.get(), u32::MAX);
    }

    #[test]
    fn test_set_quantity_replaces() {
        let p = product(1_000);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(5));
        assert!(cart.set_quantity(p.id, "M", 2));
        assert_eq!(cart.get(p.id, "M").unwrap().quantity.get(), 2);
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        let p = product(1_000);
        let mut cart = Cart::new();
        cart.add(p.clone(), "M", qty(1));
        cart.add(p.clone(), "L", qty(1));

        assert!(cart.set_quantity(p.id, "M", 0));
        assert!(!cart.contains(p.id, "M"));

        assert!(cart.set_quantity(p.id, "L", -5));
        assert!(!cart.contains(p.id, "L"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_key_is_noop() {
        let p = product(1_000);
        let mut cart = Cart::new();
        assert!(!cart.set_quantity(p.id, "M", 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.remove(ProductId::random(), "M"));
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        cart.add(product(1_000), "M", qty(2));
        cart.add(product(500), "L", qty(3));

        assert_eq!(cart.total_amount().amount, Decimal::from(3_500));
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn test_deserialize_merges_duplicate_keys() {
        let p = product(1_000);
        let line = CartLine {
            product: p.clone(),
            size: "M".to_string(),
            quantity: qty(2),
        };
        let payload = serde_json::to_string(&vec![line.clone(), line]).unwrap();
        let cart: Cart = serde_json::from_str(&payload).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.get(p.id, "M").unwrap().quantity.get(), 4);
    }

    #[test]
    fn test_rejects_zero_quantity_payload() {
        let p = product(1_000);
        let mut value = serde_json::to_value(Cart {
            lines: vec![CartLine {
                product: p,
                size: "M".to_string(),
                quantity: qty(1),
            }],
        })
        .unwrap();
        value[0]["quantity"] = serde_json::json!(0);
        assert!(serde_json::from_value::<Cart>(value).is_err());
    }
}
