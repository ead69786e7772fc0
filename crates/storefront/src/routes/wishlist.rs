//! Wishlist route handlers.
//!
//! Each request first syncs the visitor's copy with the signed-in identity,
//! so a different account never sees the previous one's entries.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use dowslakers_core::ProductId;

use crate::backend::WishlistEntry;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::services::WishlistError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub entries: Vec<WishlistEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AddEntry {
    pub product_id: ProductId,
}

/// GET /api/wishlist
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Json<WishlistView>> {
    if auth.identity().is_none() {
        return Err(WishlistError::AuthRequired.into());
    }
    let shopper = state.shopper(&session).await?;
    shopper.wishlist.sync(auth.identity()).await?;
    Ok(Json(WishlistView {
        entries: shopper.wishlist.entries(),
    }))
}

/// POST /api/wishlist
#[instrument(skip(state, session, auth), fields(product_id = %entry.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(entry): Json<AddEntry>,
) -> Result<(StatusCode, Json<WishlistEntry>)> {
    let shopper = state.shopper(&session).await?;
    if let Err(e) = shopper.wishlist.sync(auth.identity()).await {
        tracing::warn!(error = %e, "Wishlist sync failed before add");
    }
    let saved = shopper.wishlist.add(auth.identity(), entry.product_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /api/wishlist/{product_id}
#[instrument(skip(state, session, auth))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    let shopper = state.shopper(&session).await?;
    if let Err(e) = shopper.wishlist.sync(auth.identity()).await {
        tracing::warn!(error = %e, "Wishlist sync failed before remove");
    }
    shopper.wishlist.remove(auth.identity(), product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
