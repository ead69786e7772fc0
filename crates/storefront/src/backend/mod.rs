//! Storefront API collaborators.
//!
//! # Architecture
//!
//! - The hosted REST API is the source of truth for catalog, orders,
//!   wishlists, accounts and newsletter subscribers
//! - Each concern is a trait so services can be exercised against fakes
//! - [`ApiClient`] implements every trait over `reqwest`
//! - Failures are classified once, here, into [`BackendError`]; callers match
//!   on variants instead of inspecting error bodies
//!
//! # Example
//!
//! ```rust,ignore
//! use dowslakers_storefront::backend::{ApiClient, ProductCatalog, ProductFilter};
//!
//! let client = ApiClient::new(&config.api)?;
//! let dresses = client
//!     .products(&ProductFilter { category: Some("dresses".into()), search: None })
//!     .await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{ApiClient, ClientError};
pub use types::*;

use std::future::Future;

use thiserror::Error;

use dowslakers_core::{Category, Email, OrderId, Product, ProductId, SewingStyle, SewingStyleId};

/// Outcome of a failed call, resolved from the HTTP status and error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// A uniqueness constraint rejected the write.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// The resource does not exist or is not visible to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bearer token is missing, expired, or lacks access.
    #[error("unauthorized")]
    Unauthorized,

    /// The API refused the request as invalid.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure, timeout, rate limit, server error or unreadable body.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transient("request timed out".to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

/// Read access to products, categories and sewing styles.
pub trait ProductCatalog: Send + Sync {
    fn products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    fn product(&self, id: ProductId) -> impl Future<Output = Result<Product, BackendError>> + Send;

    fn categories(&self) -> impl Future<Output = Result<Vec<Category>, BackendError>> + Send;

    fn sewing_styles(&self) -> impl Future<Output = Result<Vec<SewingStyle>, BackendError>> + Send;

    fn sewing_style(
        &self,
        id: SewingStyleId,
    ) -> impl Future<Output = Result<SewingStyle, BackendError>> + Send;
}

/// Order creation and history, scoped to the token's owner.
pub trait OrderStore: Send + Sync {
    fn create_order(
        &self,
        token: &AccessToken,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, BackendError>> + Send;

    fn create_order_items(
        &self,
        token: &AccessToken,
        items: &[NewOrderItem],
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn create_sewing_detail(
        &self,
        token: &AccessToken,
        detail: &NewSewingDetail,
    ) -> impl Future<Output = Result<SewingOrderDetail, BackendError>> + Send;

    fn user_orders(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Order>, BackendError>> + Send;

    fn order(
        &self,
        token: &AccessToken,
        id: OrderId,
    ) -> impl Future<Output = Result<Order, BackendError>> + Send;
}

/// Saved products, scoped to the token's owner.
pub trait WishlistStore: Send + Sync {
    fn list(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<WishlistEntry>, BackendError>> + Send;

    /// Fails with [`BackendError::Duplicate`] when the product is already saved.
    fn insert(
        &self,
        token: &AccessToken,
        product_id: ProductId,
    ) -> impl Future<Output = Result<WishlistEntry, BackendError>> + Send;

    fn delete(
        &self,
        token: &AccessToken,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Account sign in, sign up and token validation.
pub trait AuthProvider: Send + Sync {
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    fn sign_up(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// Resolve the account behind `token`.
    fn current_user(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<User, BackendError>> + Send;
}

/// Newsletter sign-ups.
pub trait NewsletterStore: Send + Sync {
    /// Fails with [`BackendError::Duplicate`] when already subscribed.
    fn subscribe(&self, email: &Email) -> impl Future<Output = Result<(), BackendError>> + Send;
}
