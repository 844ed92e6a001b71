//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{Envelope, HealthResponse},
};

/// GET /api/health
///
/// Reports the process as up together with the storage backend's own check
pub async fn health_check(
    State(state): State<ApiState>,
) -> ApiResult<Json<Envelope<HealthResponse>>> {
    let storage = state.storage.health_check().await?;
    let status = if storage.healthy { "ok" } else { "degraded" };

    Ok(Json(Envelope::ok(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage: storage.message,
    })))
}
