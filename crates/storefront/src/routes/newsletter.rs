//! Newsletter subscription.
//!
//! An address that is already subscribed gets a distinct `already_subscribed`
//! status instead of an error.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dowslakers_core::Email;

use crate::backend::{BackendError, NewsletterStore};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeStatus {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Debug, Serialize)]
pub struct SubscribeView {
    pub status: SubscribeStatus,
    pub email: String,
}

/// POST /api/newsletter
#[instrument(skip(state, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(form): Json<SubscribeForm>,
) -> Result<Json<SubscribeView>> {
    let email = Email::parse(&form.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))?;

    let status = match state.api().subscribe(&email).await {
        Ok(()) => SubscribeStatus::Subscribed,
        Err(BackendError::Duplicate(_)) => {
            tracing::info!("Email already subscribed");
            SubscribeStatus::AlreadySubscribed
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SubscribeView {
        status,
        email: email.as_str().to_string(),
    }))
}
