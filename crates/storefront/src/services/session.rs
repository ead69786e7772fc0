//! Session gate: who is signed in.
//!
//! The signed-in [`Identity`] (account plus bearer token) lives in the
//! visitor's `tower-sessions` session. User-scoped services take an
//! `Option<&Identity>` and refuse to call the backend when it is `None`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use dowslakers_core::{EmailError, UserId};

use crate::backend::{AccessToken, AuthProvider, AuthSession, BackendError, Credentials, Registration, User};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};

/// Session keys.
pub mod keys {
    /// The signed-in [`super::Identity`].
    pub const IDENTITY: &str = "identity";

    /// Anonymous visitor id owning the cart and wizard state.
    pub const VISITOR_ID: &str = "visitor_id";
}

/// A signed-in account and the token that authorizes its calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: User,
    pub token: AccessToken,
}

impl Identity {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

impl From<AuthSession> for Identity {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user,
            token: session.token,
        }
    }
}

/// Errors from sign in, sign up and token refresh.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    AccountExists,

    #[error("{0}")]
    Rejected(String),

    #[error("session expired")]
    SessionExpired,

    #[error("auth backend error: {0}")]
    Backend(BackendError),

    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized | BackendError::NotFound(_) => Self::InvalidCredentials,
            BackendError::Duplicate(_) => Self::AccountExists,
            BackendError::Rejected { message, .. } => Self::Rejected(message),
            BackendError::Transient(_) => Self::Backend(err),
        }
    }
}

/// Read and change the signed-in identity of one visitor session.
#[derive(Debug, Clone)]
pub struct SessionGate {
    session: Session,
}

impl SessionGate {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The signed-in identity, if any.
    ///
    /// An unreadable session value counts as signed out.
    pub async fn identity(&self) -> Option<Identity> {
        self.session
            .get::<Identity>(keys::IDENTITY)
            .await
            .ok()
            .flatten()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.identity().await.is_some()
    }

    pub async fn is_admin(&self) -> bool {
        self.identity().await.is_some_and(|identity| identity.is_admin())
    }

    /// Sign in and store the identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the backend refuses the
    /// credentials, or a session/backend error.
    #[instrument(skip(self, auth, credentials), fields(email = %credentials.email))]
    pub async fn sign_in<A: AuthProvider>(
        &self,
        auth: &A,
        credentials: &Credentials,
    ) -> Result<Identity, AuthError> {
        let identity = Identity::from(auth.sign_in(credentials).await?);
        self.establish(&identity).await?;
        Ok(identity)
    }

    /// Create an account and store the identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountExists`] for a taken email, or
    /// [`AuthError::Rejected`] with the backend's message.
    #[instrument(skip(self, auth, registration), fields(email = %registration.email))]
    pub async fn sign_up<A: AuthProvider>(
        &self,
        auth: &A,
        registration: &Registration,
    ) -> Result<Identity, AuthError> {
        let identity = Identity::from(auth.sign_up(registration).await?);
        self.establish(&identity).await?;
        Ok(identity)
    }

    /// Forget the identity. The visitor keeps their cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.session.remove::<Identity>(keys::IDENTITY).await?;
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        Ok(())
    }

    /// Re-validate the stored token against the backend.
    ///
    /// Returns `Ok(None)` when signed out. A rejected token signs the
    /// session out.
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionExpired`] when the token is no longer valid;
    /// backend failures are passed through and keep the session.
    #[instrument(skip(self, auth))]
    pub async fn refresh<A: AuthProvider>(&self, auth: &A) -> Result<Option<Identity>, AuthError> {
        let Some(mut identity) = self.identity().await else {
            return Ok(None);
        };
        match auth.current_user(&identity.token).await {
            Ok(user) => {
                identity.user = user;
                self.session.insert(keys::IDENTITY, &identity).await?;
                Ok(Some(identity))
            }
            Err(BackendError::Unauthorized) => {
                self.sign_out().await?;
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(AuthError::Backend(e)),
        }
    }

    async fn establish(&self, identity: &Identity) -> Result<(), AuthError> {
        // New id on privilege change.
        self.session.cycle_id().await?;
        self.session.insert(keys::IDENTITY, identity).await?;
        set_sentry_user(&identity.user.id, Some(identity.user.email.as_str()));
        add_breadcrumb("auth", "Signed in", None);
        Ok(())
    }
}

impl<S> FromRequestParts<S> for SessionGate
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self::new)
    }
}
