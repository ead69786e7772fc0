//! Product, category and sewing style listings.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dowslakers_core::catalog::filter_styles;
use dowslakers_core::{Category, CategoryId, Product, ProductId, SewingStyle, SewingStyleId};

use crate::backend::{ProductCatalog, ProductFilter};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/products?category=&search=
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let products = state.api().products(&filter.normalized()).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn product(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Product>> {
    Ok(Json(state.api().product(id).await?))
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.api().categories().await?))
}

#[derive(Debug, Deserialize)]
pub struct StyleQuery {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// A sewing style with its "From ₦…" label.
#[derive(Debug, Serialize)]
pub struct StyleView {
    #[serde(flatten)]
    pub style: SewingStyle,
    pub price_label: Option<String>,
}

impl From<SewingStyle> for StyleView {
    fn from(style: SewingStyle) -> Self {
        Self {
            price_label: style.price_label(),
            style,
        }
    }
}

/// GET /api/sewing-styles?category_id=
#[instrument(skip(state))]
pub async fn sewing_styles(
    State(state): State<AppState>,
    Query(query): Query<StyleQuery>,
) -> Result<Json<Vec<StyleView>>> {
    let styles = state.api().sewing_styles().await?;
    let views = filter_styles(&styles, query.category_id)
        .into_iter()
        .cloned()
        .map(StyleView::from)
        .collect();
    Ok(Json(views))
}

/// GET /api/sewing-styles/{id}
#[instrument(skip(state))]
pub async fn sewing_style(
    State(state): State<AppState>,
    Path(id): Path<SewingStyleId>,
) -> Result<Json<StyleView>> {
    Ok(Json(state.api().sewing_style(id).await?.into()))
}
