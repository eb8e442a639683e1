use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub profile_store_ok: bool,
    pub profile_store_error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    match state.gatekeeper.profiles().ping().await {
        Ok(()) => Ok(Json(HealthResponse { status: "ok", profile_store_ok: true, profile_store_error: None })),
        Err(e) => Ok(Json(HealthResponse { status: "ok", profile_store_ok: false, profile_store_error: Some(e.to_string()) })),
    }
}
