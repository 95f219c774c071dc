use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Boundary access gate: was a bearer token supplied at all. Token freshness
/// and identity are checked inside each workflow against the session store,
/// not here.
#[derive(Debug)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Authentication token required".to_string(),
            ))?;

        let token = auth.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Authentication token required".to_string(),
        ))?;

        Ok(BearerToken(token.to_string()))
    }
}
