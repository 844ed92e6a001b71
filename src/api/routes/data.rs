//! Administrative deletion of snapshots

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{DeleteResult, Envelope},
};
use crate::storage::DeleteFilter;

/// JSON body of `POST /api/data/delete`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteBody {
    bv_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Query of `DELETE /api/data/delete`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    bv_id: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day which is ignored.
fn parse_date(field: &str, value: Option<String>) -> ApiResult<Option<NaiveDate>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let date_part = value.trim().split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ApiError::InvalidRequest(format!("{field} is not a date: {value:?}")))
}

async fn run_delete(
    state: &ApiState,
    filter: DeleteFilter,
) -> ApiResult<Json<Envelope<DeleteResult>>> {
    if filter.is_empty() {
        return Err(ApiError::InvalidRequest(
            "at least one of bv_id, start date or end date is required".to_string(),
        ));
    }

    let deleted_count = state.storage.delete(&filter).await?;
    info!("deleted {deleted_count} snapshots matching {filter:?}");

    Ok(Json(Envelope::with_message(
        format!("deleted {deleted_count} rows"),
        DeleteResult { deleted_count },
    )))
}

/// POST /api/data/delete
pub async fn delete_by_body(
    State(state): State<ApiState>,
    body: Option<Json<DeleteBody>>,
) -> ApiResult<Json<Envelope<DeleteResult>>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let filter = DeleteFilter::new(
        body.bv_id,
        parse_date("start_date", body.start_date)?,
        parse_date("end_date", body.end_date)?,
    );
    run_delete(&state, filter).await
}

/// DELETE /api/data/delete
pub async fn delete_by_query(
    State(state): State<ApiState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<Envelope<DeleteResult>>> {
    let filter = DeleteFilter::new(
        query.bv_id,
        parse_date("start_time", query.start_time)?,
        parse_date("end_time", query.end_time)?,
    );
    run_delete(&state, filter).await
}
