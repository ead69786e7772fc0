//! Request and response shapes exchanged with the storefront API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dowslakers_core::catalog::null_as_empty;
use dowslakers_core::{
    DeliveryMethod, Email, OrderDetailId, OrderId, OrderItemId, OrderStatus, OrderType, Product,
    ProductId, SewingStyle, SewingStyleId, UserId, UserRole, WishlistEntryId,
};

// =============================================================================
// Auth
// =============================================================================

/// Bearer token issued by the API on sign in or sign up.
///
/// `Debug` is redacted so the token never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// An account as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// "First Last", falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.to_string()
        } else {
            name
        }
    }
}

/// Response body of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: AccessToken,
}

/// Sign-in request.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Sign-up request.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Query parameters accepted by `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Category slug.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ProductFilter {
    /// Drop blank values so `?search=` behaves like no search.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            category: clean(self.category),
            search: clean(self.search),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// An order with whatever line items or sewing details the API embeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_contact: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub order_items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sewing_order_details: Vec<SewingOrderDetail>,
}

impl Order {
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        self.status.label()
    }

    /// Total quantity across line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.order_items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }
}

/// One purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<OrderItemId>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub product: Option<Product>,
}

/// Style and sizing attached to a sewing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SewingOrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    #[serde(default)]
    pub sewing_style_id: Option<SewingStyleId>,
    #[serde(default)]
    pub size_option: Option<String>,
    #[serde(default)]
    pub measurements: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub sewing_style: Option<SewingStyle>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_type: OrderType,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<DeliveryMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewOrder {
    /// A sewing order carries only the owner and optional notes; pricing is
    /// quoted by the tailor later.
    #[must_use]
    pub fn sewing(user_id: UserId, notes: Option<&str>) -> Self {
        Self {
            user_id,
            order_type: OrderType::Sewing,
            total_amount: None,
            delivery_method: None,
            delivery_address: None,
            delivery_contact: None,
            notes: notes.map(str::to_string),
        }
    }
}

/// One element of the `POST /order-items` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    /// Unit price at the time of purchase.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Body of `POST /sewing-order-details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSewingDetail {
    pub order_id: OrderId,
    pub sewing_style_id: SewingStyleId,
    /// A chart size such as `"M"`, or `"custom"`.
    pub size_option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

// =============================================================================
// Wishlist & newsletter
// =============================================================================

/// A saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: WishlistEntryId,
    pub product_id: ProductId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewWishlistEntry {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewSubscriber<'a> {
    pub email: &'a str,
}
