//! Read access to the snapshot time series

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{Envelope, StatsRow, VideoInfo},
};

/// Upper bound for any requested history length
const MAX_LIMIT: usize = 10_000;

const DEFAULT_STATS_LIMIT: usize = 100;
const DEFAULT_COMPARE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Max rows (default: 100)
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma separated video ids
    bv_ids: Option<String>,

    /// Max rows per video (default: 50)
    limit: Option<usize>,
}

/// GET /api/video/:id/stats
///
/// Most recent snapshots of one video, oldest first
pub async fn get_video_stats(
    State(state): State<ApiState>,
    Path(bv_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Envelope<Vec<StatsRow>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_STATS_LIMIT).min(MAX_LIMIT);
    let history = state.storage.history(&bv_id, limit).await?;
    Ok(Json(Envelope::ok(
        history.into_iter().map(StatsRow::from).collect(),
    )))
}

/// GET /api/video/:id/latest
pub async fn get_latest(
    State(state): State<ApiState>,
    Path(bv_id): Path<String>,
) -> ApiResult<Json<Envelope<StatsRow>>> {
    match state.storage.latest(&bv_id).await? {
        Some(snapshot) => Ok(Json(Envelope::ok(StatsRow::from(snapshot)))),
        None => Err(ApiError::NotFound("No data found".to_string())),
    }
}

/// GET /api/videos
///
/// Every video with at least one stored snapshot, sorted by id
pub async fn list_videos(State(state): State<ApiState>) -> ApiResult<Json<Envelope<Vec<String>>>> {
    let mut targets = state.storage.list_targets().await?;
    targets.sort();
    Ok(Json(Envelope::ok(targets)))
}

/// GET /api/videos/info
pub async fn list_videos_info(
    State(state): State<ApiState>,
) -> ApiResult<Json<Envelope<Vec<VideoInfo>>>> {
    let mut infos: Vec<VideoInfo> = state
        .storage
        .targets_with_titles()
        .await?
        .into_iter()
        .map(VideoInfo::from)
        .collect();
    infos.sort_by(|a, b| a.bv_id.cmp(&b.bv_id));
    Ok(Json(Envelope::ok(infos)))
}

/// GET /api/videos/compare?bv_ids=a,b
///
/// History of several videos side by side
pub async fn compare_videos(
    State(state): State<ApiState>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<Json<Envelope<BTreeMap<String, Vec<StatsRow>>>>> {
    let ids: Vec<&str> = query
        .bv_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(ApiError::InvalidRequest(
            "bv_ids must name at least one video".to_string(),
        ));
    }

    let limit = query.limit.unwrap_or(DEFAULT_COMPARE_LIMIT).min(MAX_LIMIT);
    let mut result = BTreeMap::new();
    for id in ids {
        let history = state.storage.history(id, limit).await?;
        result.insert(
            id.to_string(),
            history.into_iter().map(StatsRow::from).collect(),
        );
    }

    Ok(Json(Envelope::ok(result)))
}
