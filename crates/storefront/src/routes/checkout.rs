//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use dowslakers_core::checkout::FormattedTotal;
use dowslakers_core::{CheckoutForm, CheckoutTotal, OrderId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub total: CheckoutTotal,
    pub formatted: FormattedTotal,
}

impl From<CheckoutTotal> for QuoteView {
    fn from(total: CheckoutTotal) -> Self {
        Self {
            formatted: total.formatted(),
            total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlacedOrderView {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub quote: QuoteView,
}

/// POST /api/checkout/quote
///
/// Totals for the current cart under the chosen delivery method. No
/// validation; the order summary updates as the form is filled in.
#[instrument(skip_all, fields(delivery_method = %form.delivery_method))]
pub async fn quote(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<QuoteView>> {
    let shopper = state.shopper(&session).await?;
    let cart = shopper.cart.lock().await;
    Ok(Json(state.checkout().quote(&cart, &form).into()))
}

/// POST /api/checkout
///
/// The cart lock is held until the order settles, so a double submit finds
/// an empty cart.
#[instrument(skip_all, fields(delivery_method = %form.delivery_method))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<PlacedOrderView>)> {
    let shopper = state.shopper(&session).await?;
    let mut cart = shopper.cart.lock().await;
    let placed = state
        .checkout()
        .place_order(auth.identity(), &mut cart, &form)
        .await?;

    let order_id = placed.order_id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok((
        StatusCode::CREATED,
        Json(PlacedOrderView {
            order_id: placed.order_id,
            quote: placed.total.into(),
        }),
    ))
}
