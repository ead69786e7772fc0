//! Order history.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use dowslakers_core::OrderId;

use crate::backend::{Order, OrderStore};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// An order with its display label and item count.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: &'static str,
    pub item_count: u64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            status_label: order.status_label(),
            item_count: order.item_count(),
            order,
        }
    }
}

/// GET /api/orders
#[instrument(skip_all, fields(user_id = %identity.user_id()))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.api().user_orders(&identity.token).await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// GET /api/orders/{id}
#[instrument(skip(state, identity), fields(user_id = %identity.user_id()))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = state.api().order(&identity.token, id).await?;
    Ok(Json(order.into()))
}
