//! Monitor configuration endpoints

use axum::{Json, extract::State};
use serde_json::Value;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::Envelope,
};
use crate::source::{ConfigUpdate, ConfigView};

/// GET /api/config
///
/// Persisted config plus the monitor list the next cycle will use
pub async fn get_config(State(state): State<ApiState>) -> ApiResult<Json<Envelope<ConfigView>>> {
    let view = state.config.view().await?;
    Ok(Json(Envelope::ok(view)))
}

/// POST /api/config
///
/// Partial update of `fetch_interval_minutes` and/or `monitor_list`
pub async fn update_config(
    State(state): State<ApiState>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<Envelope<ConfigView>>> {
    let Some(Json(body)) = body else {
        return Err(ApiError::InvalidRequest(
            "request body must be a JSON object".to_string(),
        ));
    };
    if !body.is_object() {
        return Err(ApiError::InvalidRequest(
            "request body must be a JSON object".to_string(),
        ));
    }

    let update = ConfigUpdate::from_json(&body)?;
    let view = state.config.update(update).await?;
    Ok(Json(Envelope::with_message("configuration updated", view)))
}
