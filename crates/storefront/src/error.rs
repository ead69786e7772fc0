//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Responses are JSON: `{"error": "<code>", "message": "<text>"}`, plus
//! `order_id` when an order was created but a later write failed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use dowslakers_core::{OrderId, ValidationError, WizardError};

use crate::backend::BackendError;
use crate::services::{AuthError, CartError, CheckoutError, SubmitError, WishlistError};

const UNAVAILABLE_MESSAGE: &str = "The store is temporarily unavailable. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Hosted API call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Sewing request error: {0}")]
    Sewing(#[from] SubmitError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
}

/// Status, code and client-safe message for one error.
struct Outcome {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Outcome {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn invalid(message: impl ToString) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid", message.to_string())
    }

    fn auth_required(message: impl ToString) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "auth_required", message.to_string())
    }

    fn backend(err: &BackendError) -> Self {
        match err {
            BackendError::Duplicate(_) => Self::new(StatusCode::CONFLICT, "duplicate", "Already exists"),
            BackendError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", "Not found"),
            BackendError::Unauthorized => {
                Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "Please sign in again")
            }
            BackendError::Rejected { message, .. } => Self::invalid(message),
            BackendError::Transient(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "unavailable", UNAVAILABLE_MESSAGE)
            }
        }
    }
}

impl AppError {
    fn outcome(&self) -> Outcome {
        match self {
            Self::Backend(err) => Outcome::backend(err),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => Outcome::invalid("Invalid email address"),
                AuthError::InvalidCredentials => {
                    Outcome::new(StatusCode::UNAUTHORIZED, "invalid_credentials", "Invalid credentials")
                }
                AuthError::AccountExists => Outcome::new(
                    StatusCode::CONFLICT,
                    "duplicate",
                    "An account with this email already exists",
                ),
                AuthError::Rejected(message) => Outcome::invalid(message),
                AuthError::SessionExpired => {
                    Outcome::auth_required("Session expired, please sign in again")
                }
                AuthError::Backend(err) => Outcome::backend(err),
                AuthError::Session(_) => Self::internal(),
            },
            Self::Cart(err) => Outcome::new(StatusCode::BAD_REQUEST, "invalid", err.to_string()),
            Self::Wishlist(err) => match err {
                WishlistError::AuthRequired => Outcome::auth_required(err),
                WishlistError::AlreadySaved => {
                    Outcome::new(StatusCode::CONFLICT, "duplicate", err.to_string())
                }
                WishlistError::Busy => Outcome::new(StatusCode::CONFLICT, "busy", err.to_string()),
                WishlistError::AddFailed(e)
                | WishlistError::RemoveFailed(e)
                | WishlistError::LoadFailed(e) => Outcome::backend(e),
            },
            Self::Checkout(err) => match err {
                CheckoutError::AuthRequired => Outcome::auth_required(err),
                CheckoutError::Invalid(e) => Outcome::invalid(e),
                CheckoutError::OrderFailed(e) => Outcome::backend(e),
                CheckoutError::ItemsFailed { .. } => Outcome::new(
                    StatusCode::BAD_GATEWAY,
                    "partial_failure",
                    "Your order was created but its items could not be saved. Please contact us with your order number.",
                ),
            },
            Self::Sewing(err) => match err {
                SubmitError::AuthRequired => Outcome::auth_required(err),
                SubmitError::Invalid(e) => Outcome::new(StatusCode::BAD_REQUEST, "invalid", e.to_string()),
                SubmitError::OrderFailed(e) => Outcome::backend(e),
                SubmitError::DetailFailed { .. } => Outcome::new(
                    StatusCode::BAD_GATEWAY,
                    "partial_failure",
                    "Your order was created but the sewing details could not be saved. Submit again to retry.",
                ),
            },
            Self::Wizard(err) => Outcome::new(StatusCode::BAD_REQUEST, "invalid", err.to_string()),
            Self::Validation(err) => Outcome::invalid(err),
            Self::Session(_) | Self::Internal(_) => Self::internal(),
            Self::NotFound(what) => Outcome::new(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
            Self::Unauthorized(message) => Outcome::auth_required(message),
            Self::BadRequest(message) => Outcome::new(StatusCode::BAD_REQUEST, "bad_request", message.clone()),
        }
    }

    fn internal() -> Outcome {
        Outcome::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error")
    }

    /// Order left behind by a partially failed write, if any.
    #[must_use]
    pub const fn partial_order(&self) -> Option<OrderId> {
        match self {
            Self::Checkout(CheckoutError::ItemsFailed { order_id, .. })
            | Self::Sewing(SubmitError::DetailFailed { order_id, .. }) => Some(*order_id),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let outcome = self.outcome();

        // Capture server errors to Sentry
        if outcome.status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %outcome.status, "Request rejected");
        }

        let body = ErrorBody {
            error: outcome.code,
            message: outcome.message,
            order_id: self.partial_order(),
        };
        (outcome.status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "5f0c...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product".to_string());
        assert_eq!(err.to_string(), "Not found: product");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_backend_status_codes() {
        assert_eq!(status(BackendError::Duplicate("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(BackendError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(BackendError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(BackendError::Rejected {
                status: 400,
                message: "bad".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(BackendError::Transient("timeout".into())), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_service_status_codes() {
        assert_eq!(status(WishlistError::AuthRequired), StatusCode::UNAUTHORIZED);
        assert_eq!(status(WishlistError::AlreadySaved), StatusCode::CONFLICT);
        assert_eq!(status(WishlistError::Busy), StatusCode::CONFLICT);
        assert_eq!(status(CheckoutError::AuthRequired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(ValidationError::MissingPhone),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(CartError::InvalidQuantity), StatusCode::BAD_REQUEST);
        assert_eq!(status(WizardError::NoStyleSelected), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::AccountExists), StatusCode::CONFLICT);
        assert_eq!(
            status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_partial_failure_body_carries_order_id() {
        let order_id = OrderId::random();
        let response = AppError::from(CheckoutError::ItemsFailed {
            order_id,
            source: BackendError::Transient("timeout".into()),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "partial_failure");
        assert_eq!(body["order_id"], order_id.to_string());
    }

    #[tokio::test]
    async fn test_transient_details_not_exposed() {
        let response = AppError::from(BackendError::Transient(
            "connect error: 10.0.0.4:5000".into(),
        ))
        .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.4"));
    }
}
