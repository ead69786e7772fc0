//! Cache types for catalog responses.

use std::sync::Arc;

use dowslakers_core::{Category, Product, ProductId, SewingStyle, SewingStyleId};

use super::ProductFilter;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products(ProductFilter),
    Categories,
    SewingStyle(SewingStyleId),
    SewingStyles,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
    SewingStyle(Box<SewingStyle>),
    SewingStyles(Arc<Vec<SewingStyle>>),
}
