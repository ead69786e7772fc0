//! Sign in, sign up, sign out and session refresh.
//!
//! Every identity change re-syncs the visitor's wishlist. Signing out, by
//! request or by token expiry, also discards an unsent sewing draft; signing
//! in keeps the draft but drops a retry order left by another account. The
//! cart is kept.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dowslakers_core::Email;

use crate::backend::{Credentials, Registration, User};
use crate::error::Result;
use crate::services::{AuthError, Identity, SessionGate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Who is signed in, as returned to the client.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: Option<User>,
    pub is_admin: bool,
}

impl From<Option<Identity>> for SessionView {
    fn from(identity: Option<Identity>) -> Self {
        let is_admin = identity.as_ref().is_some_and(Identity::is_admin);
        Self {
            user: identity.map(|identity| identity.user),
            is_admin,
        }
    }
}

/// Bring the visitor's wishlist and sewing draft in line with a new
/// identity. Wishlist failures only log; the next wishlist request retries.
async fn switch_identity(state: &AppState, gate: &SessionGate, identity: Option<&Identity>) -> Result<()> {
    let shopper = state.shopper(gate.session()).await?;
    if let Err(e) = shopper.wishlist.load(identity).await {
        tracing::warn!(error = %e, "Wishlist reload after identity change failed");
    }
    let mut draft = shopper.sewing.lock().await;
    match identity {
        Some(identity) => {
            if let Some(order_id) = draft.retain_pending_order_for(identity.user_id()) {
                tracing::info!(%order_id, "Dropped another account's pending sewing order");
            }
        }
        None => draft.reset(),
    }
    Ok(())
}

/// POST /api/auth/login
#[instrument(skip(state, gate, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    gate: SessionGate,
    Json(form): Json<LoginForm>,
) -> Result<Json<SessionView>> {
    let email = Email::parse(&form.email).map_err(AuthError::from)?;
    let credentials = Credentials {
        email: email.as_str().to_string(),
        password: form.password,
    };
    let identity = gate.sign_in(state.api(), &credentials).await?;
    switch_identity(&state, &gate, Some(&identity)).await?;
    tracing::info!(user_id = %identity.user_id(), "Signed in");
    Ok(Json(Some(identity).into()))
}

/// POST /api/auth/register
#[instrument(skip(state, gate, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    gate: SessionGate,
    Json(form): Json<RegisterForm>,
) -> Result<Json<SessionView>> {
    let email = Email::parse(&form.email).map_err(AuthError::from)?;
    let registration = Registration {
        email: email.as_str().to_string(),
        password: form.password,
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
    };
    let identity = gate.sign_up(state.api(), &registration).await?;
    switch_identity(&state, &gate, Some(&identity)).await?;
    tracing::info!(user_id = %identity.user_id(), "Account created");
    Ok(Json(Some(identity).into()))
}

/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, gate: SessionGate) -> Result<Json<SessionView>> {
    gate.sign_out().await?;
    switch_identity(&state, &gate, None).await?;
    Ok(Json(None.into()))
}

/// GET /api/auth/me
///
/// Re-validates the stored token. An expired token signs the session out.
#[instrument(skip_all)]
pub async fn me(State(state): State<AppState>, gate: SessionGate) -> Result<Json<SessionView>> {
    match gate.refresh(state.api()).await {
        Ok(identity) => Ok(Json(identity.into())),
        Err(AuthError::SessionExpired) => {
            switch_identity(&state, &gate, None).await?;
            Err(AuthError::SessionExpired.into())
        }
        Err(e) => Err(e.into()),
    }
}
