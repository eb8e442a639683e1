use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::authz::CurrentSession;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Hands page code the caller's bearer token for direct backend calls.
#[utoipa::path(
    get,
    path = "/auth/token",
    tag = "Auth",
    responses(
        (status = 200, description = "Bearer token for the current session", body = TokenResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn token(CurrentSession(session): CurrentSession) -> AppResult<Json<TokenResponse>> {
    Ok(Json(TokenResponse {
        token: session.token,
        expires_at: session.expires_at,
    }))
}
