use axum::{
    extract::{FromRef, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::auth::{
    dto::PublicUser, error::AuthError, extractors::BearerToken, session::SessionManager,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub user: PublicUser,
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_logins: i64,
    pub last_login: Option<OffsetDateTime>,
    pub account_created: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[instrument(skip(state, token))]
async fn dashboard(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<DashboardData>, AuthError> {
    let sessions = SessionManager::from_ref(&state);
    let Some((user, _)) = sessions.lookup(&token).await? else {
        return Err(AuthError::InvalidOrExpiredToken);
    };

    let total_logins = state.sessions.count_for_user(user.id).await?;
    // The most recent session is the current login; the one before it is the
    // "last login" shown to the user.
    let recent = state.sessions.recent_created_at(user.id, 2).await?;
    let last_login = recent.get(1).copied();

    Ok(Json(DashboardData {
        stats: DashboardStats {
            total_logins,
            last_login,
            account_created: user.created_at,
        },
        user: PublicUser::from(&user),
    }))
}
