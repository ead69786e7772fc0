//! Cart route handlers.
//!
//! The cart belongs to the visitor, not the account, so none of these
//! require sign in. Every mutation returns the updated cart.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use dowslakers_core::{CartLine, ProductId};

use crate::backend::ProductCatalog;
use crate::error::{Result, add_breadcrumb};
use crate::services::CartStore;
use crate::state::AppState;
use crate::storage::LocalStorage;

/// One cart line with display prices.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub unit_price: String,
    pub line_total: String,
}

/// The cart as returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_items: u64,
    pub total_amount: String,
}

impl<S: LocalStorage> From<&CartStore<S>> for CartView {
    fn from(store: &CartStore<S>) -> Self {
        Self {
            lines: store
                .lines()
                .iter()
                .map(|line| CartLineView {
                    unit_price: line.product.unit_price().display(),
                    line_total: line.line_total().display(),
                    line: line.clone(),
                })
                .collect(),
            total_items: store.total_items(),
            total_amount: store.total_amount().display(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    pub size: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    pub product_id: ProductId,
    pub size: String,
    /// Zero or negative removes the line.
    pub quantity: i64,
}

/// GET /api/cart
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let shopper = state.shopper(&session).await?;
    let cart = shopper.cart.lock().await;
    Ok(Json(CartView::from(&*cart)))
}

/// POST /api/cart/items
///
/// The product is re-read from the catalog so the line carries a current
/// snapshot, never one supplied by the client.
#[instrument(skip(state, session), fields(product_id = %item.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(item): Json<AddItem>,
) -> Result<Json<CartView>> {
    let product = state.api().product(item.product_id).await?;
    let shopper = state.shopper(&session).await?;
    let mut cart = shopper.cart.lock().await;
    cart.add_item(product, item.size.trim(), item.quantity).await?;

    let product_id = item.product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(CartView::from(&*cart)))
}

/// PATCH /api/cart/items
#[instrument(skip(state, session), fields(product_id = %item.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(item): Json<UpdateItem>,
) -> Result<Json<CartView>> {
    let shopper = state.shopper(&session).await?;
    let mut cart = shopper.cart.lock().await;
    cart.update_quantity(item.product_id, item.size.trim(), item.quantity).await;
    Ok(Json(CartView::from(&*cart)))
}

/// DELETE /api/cart/items/{product_id}/{size}
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path((product_id, size)): Path<(ProductId, String)>,
) -> Result<Json<CartView>> {
    let shopper = state.shopper(&session).await?;
    let mut cart = shopper.cart.lock().await;
    cart.remove_item(product_id, size.trim()).await;
    Ok(Json(CartView::from(&*cart)))
}

/// DELETE /api/cart
#[instrument(skip_all)]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let shopper = state.shopper(&session).await?;
    let mut cart = shopper.cart.lock().await;
    cart.clear().await;
    Ok(Json(CartView::from(&*cart)))
}
