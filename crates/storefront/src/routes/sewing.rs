//! Custom sewing wizard route handlers.
//!
//! The draft is per visitor and held in memory. Editing and stepping through
//! the wizard works signed out; submitting requires sign in.

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use dowslakers_core::sewing::STANDARD_SIZES;
use dowslakers_core::{MeasurementField, OrderId, SewingDraft, SewingStyleId, SizeOption, WizardStep};

use crate::backend::{ProductCatalog, SewingOrderDetail};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeasurementView {
    pub field: MeasurementField,
    pub label: &'static str,
    pub value: String,
}

/// The draft plus what the wizard needs to render the current step.
#[derive(Debug, Serialize)]
pub struct DraftView {
    #[serde(flatten)]
    pub draft: SewingDraft,
    pub step_number: u8,
    pub can_advance: bool,
    pub standard_sizes: [&'static str; 6],
    pub measurement_fields: Vec<MeasurementView>,
}

impl From<&SewingDraft> for DraftView {
    fn from(draft: &SewingDraft) -> Self {
        Self {
            step_number: draft.step().number(),
            can_advance: draft.step() != WizardStep::Review && draft.can_advance(draft.step()),
            standard_sizes: STANDARD_SIZES,
            measurement_fields: MeasurementField::ALL
                .iter()
                .map(|&field| MeasurementView {
                    field,
                    label: field.label(),
                    value: draft.measurements().get(field).unwrap_or_default().to_string(),
                })
                .collect(),
            draft: draft.clone(),
        }
    }
}

/// Partial edit of the draft. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct DraftUpdate {
    #[serde(default)]
    pub style_id: Option<SewingStyleId>,
    #[serde(default)]
    pub size_option: Option<SizeOption>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub measurements: Option<BTreeMap<MeasurementField, String>>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedView {
    pub order_id: OrderId,
    pub detail: SewingOrderDetail,
}

/// GET /api/sewing/draft
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<DraftView>> {
    let shopper = state.shopper(&session).await?;
    let draft = shopper.sewing.lock().await;
    Ok(Json(DraftView::from(&*draft)))
}

/// PATCH /api/sewing/draft
///
/// Fields apply in wizard order; the first rejected one aborts the rest.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(update): Json<DraftUpdate>,
) -> Result<Json<DraftView>> {
    let style = match update.style_id {
        Some(id) => Some(state.api().sewing_style(id).await?),
        None => None,
    };

    let shopper = state.shopper(&session).await?;
    let mut draft = shopper.sewing.lock().await;
    if let Some(style) = style {
        draft.select_style(style)?;
    }
    if let Some(option) = update.size_option {
        draft.set_size_option(option)?;
    }
    if let Some(size) = update.size {
        draft.select_size(size.trim())?;
    }
    for (field, value) in update.measurements.unwrap_or_default() {
        draft.set_measurement(field, value)?;
    }
    if let Some(text) = update.special_instructions {
        draft.set_special_instructions(text)?;
    }
    Ok(Json(DraftView::from(&*draft)))
}

/// POST /api/sewing/draft/next
#[instrument(skip_all)]
pub async fn next(State(state): State<AppState>, session: Session) -> Result<Json<DraftView>> {
    let shopper = state.shopper(&session).await?;
    let mut draft = shopper.sewing.lock().await;
    draft.advance()?;
    Ok(Json(DraftView::from(&*draft)))
}

/// POST /api/sewing/draft/back
#[instrument(skip_all)]
pub async fn back(State(state): State<AppState>, session: Session) -> Result<Json<DraftView>> {
    let shopper = state.shopper(&session).await?;
    let mut draft = shopper.sewing.lock().await;
    draft.back();
    Ok(Json(DraftView::from(&*draft)))
}

/// POST /api/sewing/draft/reset
#[instrument(skip_all)]
pub async fn reset(State(state): State<AppState>, session: Session) -> Result<Json<DraftView>> {
    let shopper = state.shopper(&session).await?;
    let mut draft = shopper.sewing.lock().await;
    draft.reset();
    Ok(Json(DraftView::from(&*draft)))
}

/// POST /api/sewing/submit
///
/// The draft stays locked until both writes settle, so a double submit
/// finds it already submitted.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<(StatusCode, Json<SubmittedView>)> {
    let shopper = state.shopper(&session).await?;
    let mut draft = shopper.sewing.lock().await;
    let detail = state.sewing().submit(auth.identity(), &mut draft).await?;

    let order_id = detail.order_id.to_string();
    add_breadcrumb("sewing", "Sewing request submitted", Some(&[("order_id", order_id.as_str())]));
    Ok((
        StatusCode::CREATED,
        Json(SubmittedView {
            order_id: detail.order_id,
            detail,
        }),
    ))
}
