//! Authentication extractors.
//!
//! Both read the [`Identity`] stored by [`SessionGate`]. Handlers that can
//! serve signed-out visitors take [`OptionalAuth`] and let the service return
//! its own auth-required error.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::services::{Identity, SessionGate};

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn orders(RequireAuth(identity): RequireAuth) -> impl IntoResponse {
///     format!("Orders for {}", identity.user.email)
/// }
/// ```
pub struct RequireAuth(pub Identity);

/// Rejection for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    /// Page requests go to the sign-in page.
    RedirectToLogin,
    /// `/api/` requests get a JSON 401.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "auth_required",
                    "message": "Please sign in to continue",
                })),
            )
                .into_response(),
        }
    }
}

async fn identity_from(parts: &Parts) -> Option<Identity> {
    let session = parts.extensions.get::<Session>()?.clone();
    SessionGate::new(session).identity().await
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from(parts).await.map(Self).ok_or_else(|| {
            // Nested routers see a stripped URI.
            let path = parts
                .extensions
                .get::<OriginalUri>()
                .map_or_else(|| parts.uri.path(), |uri| uri.path());
            if path.starts_with("/api/") {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<Identity>);

impl OptionalAuth {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(identity_from(parts).await))
    }
}
