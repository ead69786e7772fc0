//! Persistent cart store.
//!
//! Wraps the core [`Cart`] and mirrors it to [`LocalStorage`] under
//! [`CART_STORAGE_KEY`] after every mutation. Loading never fails: an
//! unreadable or corrupt payload starts an empty cart.

use std::num::NonZeroU32;

use thiserror::Error;
use tracing::{instrument, warn};

use dowslakers_core::{Cart, CartLine, Price, Product, ProductId};

use crate::storage::LocalStorage;

/// Storage key holding the serialized cart lines.
pub const CART_STORAGE_KEY: &str = "dowslakers-cart";

/// Rejected cart input. Nothing is changed when these are returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("{product} is not available in size {size}")]
    UnavailableSize { product: String, size: String },
}

/// A cart bound to its durable storage.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
}

impl<S: LocalStorage> CartStore<S> {
    /// Load the cart persisted in `storage`, or start empty.
    #[instrument(skip(storage))]
    pub async fn load(storage: S) -> Self {
        let cart = match storage.get(CART_STORAGE_KEY).await {
            Ok(Some(payload)) => match serde_json::from_str::<Cart>(&payload) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt cart payload");
                    if let Err(e) = storage.remove(CART_STORAGE_KEY).await {
                        warn!(error = %e, "Failed to remove corrupt cart payload");
                    }
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart");
                Cart::new()
            }
        };
        Self { storage, cart }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.cart.total_items()
    }

    #[must_use]
    pub fn total_amount(&self) -> Price {
        self.cart.total_amount()
    }

    /// Add `quantity` of `product` in `size`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for zero and
    /// [`CartError::UnavailableSize`] when the product lists sizes and
    /// `size` is not one of them.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&mut self, product: Product, size: &str, quantity: u32) -> Result<(), CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::InvalidQuantity)?;
        if !product.offers_size(size) {
            return Err(CartError::UnavailableSize {
                product: product.name,
                size: size.to_string(),
            });
        }
        self.cart.add(product, size, quantity);
        self.persist().await;
        Ok(())
    }

    /// Remove a line. Absent keys are ignored.
    #[instrument(skip(self))]
    pub async fn remove_item(&mut self, product_id: ProductId, size: &str) {
        if self.cart.remove(product_id, size) {
            self.persist().await;
        }
    }

    /// Replace a line's quantity; zero or below removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(&mut self, product_id: ProductId, size: &str, quantity: i64) {
        if self.cart.set_quantity(product_id, size, quantity) {
            self.persist().await;
        }
    }

    #[instrument(skip(self))]
    pub async fn clear(&mut self) {
        self.cart.clear();
        self.persist().await;
    }

    /// Write the full line list. The in-memory cart stays authoritative if
    /// the write fails.
    async fn persist(&self) {
        let payload = match serde_json::to_string(&self.cart) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "Failed to serialize cart");
                return;
            }
        };
        if let Err(error) = self.storage.set(CART_STORAGE_KEY, &payload).await {
            tracing::error!(%error, "Failed to persist cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rust_decimal::Decimal;

    fn product(price: i64, sizes: &[&str]) -> Product {
        Product {
            id: ProductId::random(),
            name: "Adire Shirt".to_string(),
            description: None,
            price: Decimal::from(price),
            images: vec!["https://cdn.dowslakers.com/adire.jpg".to_string()],
            sizes: sizes.iter().map(ToString::to_string).collect(),
            stock_quantity: Some(4),
            category_id: None,
            category: None,
            is_active: Some(true),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_mutations_are_persisted_and_reloaded() {
        let storage = MemoryStorage::new();
        let shirt = product(1_000, &["M", "L"]);
        let cap = product(500, &[]);

        let mut store = CartStore::load(storage.clone()).await;
        store.add_item(shirt.clone(), "M", 2).await.unwrap();
        store.add_item(cap.clone(), "One Size", 3).await.unwrap();
        store.add_item(shirt.clone(), "L", 1).await.unwrap();
        store.remove_item(shirt.id, "L").await;

        let reloaded = CartStore::load(storage).await;
        assert_eq!(reloaded.cart(), store.cart());
        assert_eq!(reloaded.total_items(), 5);
        assert_eq!(reloaded.total_amount().amount, Decimal::from(3_500));
    }

    #[tokio::test]
    async fn test_corrupt_payload_starts_empty_and_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "{not json").await.unwrap();

        let store = CartStore::load(storage.clone()).await;
        assert!(store.is_empty());
        assert_eq!(storage.get(CART_STORAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_zero_quantity_and_unknown_size() {
        let mut store = CartStore::load(MemoryStorage::new()).await;
        let shirt = product(1_000, &["M"]);

        assert_eq!(
            store.add_item(shirt.clone(), "M", 0).await,
            Err(CartError::InvalidQuantity)
        );
        assert!(matches!(
            store.add_item(shirt, "XS", 1).await,
            Err(CartError::UnavailableSize { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_to_zero_removes_and_persists() {
        let storage = MemoryStorage::new();
        let shirt = product(1_000, &["M"]);
        let mut store = CartStore::load(storage.clone()).await;
        store.add_item(shirt.clone(), "M", 2).await.unwrap();

        store.update_quantity(shirt.id, "M", -5).await;
        assert!(store.is_empty());
        assert!(CartStore::load(storage).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_storage_payload() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone()).await;
        store.add_item(product(1_000, &[]), "M", 1).await.unwrap();
        store.clear().await;
        assert_eq!(storage.get(CART_STORAGE_KEY).await.unwrap().as_deref(), Some("[]"));
    }
}
