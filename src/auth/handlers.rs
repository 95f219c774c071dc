use axum::{
    extract::{FromRef, State},
    routing::{get, patch, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::auth::{
    dto::{
        AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, SignupRequest,
        SuccessResponse, UpdateProfileRequest,
    },
    error::AuthError,
    extractors::BearerToken,
    service::AuthService,
};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(current_user))
        .route("/me/profile", patch(update_profile))
        .route("/me/password", post(change_password))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    if !is_valid_email(&payload.email) {
        warn!("signup with malformed email");
        return Err(AuthError::Validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation("Password too short"));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AuthError::Validation("Name must not be empty"));
    }

    let service = AuthService::from_ref(&state);
    let response = service
        .signup(
            &payload.email,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
        )
        .await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    if !is_valid_email(&payload.email) {
        warn!("login with malformed email");
        return Err(AuthError::Validation("Invalid email"));
    }

    let service = AuthService::from_ref(&state);
    let response = service.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

#[instrument(skip(state, token))]
async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<SuccessResponse>, AuthError> {
    let service = AuthService::from_ref(&state);
    service.logout(&token).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, token))]
async fn current_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<Option<PublicUser>>, AuthError> {
    let service = AuthService::from_ref(&state);
    let user = service.current_user(&token).await?;
    Ok(Json(user))
}

#[instrument(skip(state, token, payload))]
async fn update_profile(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    if matches!(&payload.first_name, Some(name) if name.trim().is_empty())
        || matches!(&payload.last_name, Some(name) if name.trim().is_empty())
    {
        return Err(AuthError::Validation("Name must not be empty"));
    }

    let service = AuthService::from_ref(&state);
    let user = service
        .update_profile(&token, payload.first_name, payload.last_name)
        .await?;
    Ok(Json(user))
}

#[instrument(skip(state, token, payload))]
async fn change_password(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation("Password too short"));
    }

    let service = AuthService::from_ref(&state);
    service
        .change_password(&token, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
