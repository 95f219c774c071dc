use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::auth::store::StoreError;

/// Closed set of auth workflow failures. Messages are stable and user-safe;
/// store and hasher detail is logged, never serialized.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already exists")]
    EmailExists,
    /// Covers both unknown email and wrong password so callers cannot
    /// enumerate accounts.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    AccountDeactivated,
    #[error("Email not verified")]
    EmailNotVerified,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Current password is incorrect")]
    IncorrectCurrentPassword,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Validation(&'static str),
    #[error("Service temporarily unavailable")]
    Store(#[from] StoreError),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::EmailExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::InvalidOrExpiredToken
            | AuthError::IncorrectCurrentPassword => StatusCode::UNAUTHORIZED,
            AuthError::AccountDeactivated | AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound | AuthError::Store(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Store(e) => error!(error = ?e, "store failure"),
            AuthError::Internal(e) => error!(error = ?e, "internal failure"),
            AuthError::UserNotFound => error!("store inconsistency: user row missing"),
            _ => {}
        }
        (self.status(), self.to_string()).into_response()
    }
}
