//! Catalog snapshots: products, categories, and sewing styles.
//!
//! These mirror the rows served by the hosted data store. Optional arrays come
//! back as `null` for older rows, so they deserialize to empty vectors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{CategoryId, Price, ProductId, SewingStyleId};

/// A ready-to-wear product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in whole naira.
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The unit price as a [`Price`].
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::naira(self.price)
    }

    /// Whether `size` is one of the sizes this product is offered in.
    ///
    /// Products without a size list are one-size and accept any label.
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.is_empty() || self.sizes.iter().any(|s| s == size)
    }

    /// First image, used as the thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A product / style category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// A garment style offered for custom sewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SewingStyle {
    pub id: SewingStyleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    /// Starting price shown as "From ₦…"; absent for quote-only styles.
    #[serde(default)]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl SewingStyle {
    /// "From ₦25,000" style label, if the style has a base price.
    #[must_use]
    pub fn price_label(&self) -> Option<String> {
        self.base_price
            .map(|amount| format!("From {}", Price::naira(amount)))
    }
}

/// Keep only styles in `category`, or all styles when no category is chosen.
#[must_use]
pub fn filter_styles(styles: &[SewingStyle], category: Option<CategoryId>) -> Vec<&SewingStyle> {
    styles
        .iter()
        .filter(|style| category.is_none_or(|c| style.category_id == Some(c)))
        .collect()
}

/// Deserialize a missing or `null` array as an empty vector.
///
/// # Errors
///
/// Propagates errors from the element deserializer.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_tolerates_null_arrays() {
        let product: Product = serde_json::from_value(json!({
            "id": "0b9a2f4e-8a41-4c8e-9f43-2b1f0d2f6c11",
            "name": "Ankara Kaftan",
            "price": 12000,
            "images": null,
            "sizes": null,
        }))
        .unwrap();
        assert!(product.images.is_empty());
        assert!(product.sizes.is_empty());
        assert!(product.offers_size("XL"));
        assert_eq!(product.unit_price().display(), "₦12,000");
    }

    #[test]
    fn test_offers_size_checks_list() {
        let product: Product = serde_json::from_value(json!({
            "id": "0b9a2f4e-8a41-4c8e-9f43-2b1f0d2f6c11",
            "name": "Senator Set",
            "price": "45000.00",
            "sizes": ["M", "L"],
        }))
        .unwrap();
        assert!(product.offers_size("M"));
        assert!(!product.offers_size("S"));
    }

    #[test]
    fn test_filter_styles_by_category() {
        let agbada = CategoryId::random();
        let style = |name: &str, category| SewingStyle {
            id: SewingStyleId::random(),
            name: name.to_string(),
            description: None,
            images: vec![],
            base_price: Some(Decimal::from(25_000)),
            category_id: category,
            category: None,
            is_active: Some(true),
        };
        let styles = vec![style("Grand Agbada", Some(agbada)), style("Kaftan", None)];

        assert_eq!(filter_styles(&styles, None).len(), 2);
        let only = filter_styles(&styles, Some(agbada));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "Grand Agbada");
        assert_eq!(styles[0].price_label().as_deref(), Some("From ₦25,000"));
    }
}
