//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Read endpoints return the envelope with the stored series
//! - Missing data and bad parameters map to 404 and 400
//! - Deletes through both verbs honor their filters
//! - Config updates are validated and persisted

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use bilitrack::api::{ApiConfig, ApiState, spawn_api_server};
use bilitrack::source::FileConfigSource;
use bilitrack::storage::StorageBackend;
use bilitrack::storage::memory::MemoryBackend;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

use crate::helpers::{snapshot, write_config, write_list};

struct TestApi {
    addr: SocketAddr,
    store: Arc<MemoryBackend>,
    dir: TempDir,
    client: reqwest::Client,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.delete(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }
}

async fn spawn_test_api() -> TestApi {
    let dir = tempdir().unwrap();
    let config_path = write_config(
        dir.path(),
        json!({"fetch_interval_minutes": 10, "bv_id": "BV1", "api_port": 5000}),
    );
    let list_path = write_list(dir.path(), "BV1\nBV2\n");

    let store = Arc::new(MemoryBackend::new());
    for (day, views) in [(1, 10), (2, 20), (3, 30)] {
        let captured = Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap();
        store.append(snapshot("BV1", captured, views)).await.unwrap();
    }
    let mut untitled = snapshot("BV2", Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap(), 5);
    untitled.title = None;
    store.append(untitled).await.unwrap();

    let state = ApiState::new(
        store.clone(),
        Arc::new(FileConfigSource::new(config_path, list_path)),
    );
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
    };
    let addr = spawn_api_server(config, state).await.unwrap();

    TestApi {
        addr,
        store,
        dir,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health() {
    let api = spawn_test_api().await;
    let (status, body) = api.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_video_stats_oldest_first_with_limit() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/video/BV1/stats?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);

    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["view"], 20);
    assert_eq!(rows[1]["view"], 30);
    assert_eq!(rows[1]["timestamp"], "2026-01-03 12:00:00");

    let (_, body) = api.get("/api/video/BV1/stats").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_latest_and_not_found() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/video/BV1/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["view"], 30);

    let (status, body) = api.get("/api/video/BVnone/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_list_videos_and_titles() {
    let api = spawn_test_api().await;

    let (_, body) = api.get("/api/videos").await;
    assert_eq!(body["data"], json!(["BV1", "BV2"]));

    let (_, body) = api.get("/api/videos/info").await;
    assert_eq!(
        body["data"],
        json!([
            {"bv_id": "BV1", "title": "video BV1"},
            {"bv_id": "BV2", "title": "BV2"}
        ])
    );
}

#[tokio::test]
async fn test_compare_videos() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/videos/compare?bv_ids=BV1,%20BV2,&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["BV1"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["BV1"][0]["view"], 30);
    assert_eq!(body["data"]["BV2"][0]["view"], 5);

    let (status, body) = api.get("/api/videos/compare?bv_ids=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1);
}

#[tokio::test]
async fn test_delete_by_body_date_range() {
    let api = spawn_test_api().await;

    let (status, body) = api
        .post(
            "/api/data/delete",
            json!({"bv_id": "BV1", "start_date": "2026-01-01", "end_date": "2026-01-02"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted_count"], 2);

    let remaining = api.store.history("BV1", 10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].views, 30);
    assert!(api.store.latest("BV2").await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_by_query_target() {
    let api = spawn_test_api().await;

    let (status, body) = api.delete("/api/data/delete?bv_id=BV2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted_count"], 1);

    let (_, body) = api.delete("/api/data/delete?bv_id=BV2").await;
    assert_eq!(body["data"]["deleted_count"], 0);
}

#[tokio::test]
async fn test_delete_rejects_empty_filter() {
    let api = spawn_test_api().await;

    let (status, body) = api.post("/api/data/delete", json!({"bv_id": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1);
    assert_eq!(api.store.history("BV1", 10).await.unwrap().len(), 3);

    let (status, _) = api
        .post("/api/data/delete", json!({"start_date": "last week"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_config() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fetch_interval_minutes"], 10);
    assert_eq!(body["data"]["api_port"], 5000);
    assert_eq!(body["data"]["monitor_list"], json!(["BV1", "BV2"]));
}

#[tokio::test]
async fn test_update_config() {
    let api = spawn_test_api().await;

    let (status, body) = api
        .post(
            "/api/config",
            json!({"fetch_interval_minutes": 5, "monitor_list": ["BV9", ""]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fetch_interval_minutes"], 5);
    assert_eq!(body["data"]["monitor_list"], json!(["BV9"]));

    let list = std::fs::read_to_string(api.dir.path().join("monitor.list")).unwrap();
    assert!(list.starts_with('#'));
    assert!(list.contains("BV9"));
}

#[tokio::test]
async fn test_update_config_rejects_bad_values() {
    let api = spawn_test_api().await;

    let (status, body) = api
        .post("/api/config", json!({"fetch_interval_minutes": 0}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1);

    let (status, _) = api
        .post("/api/config", json!({"monitor_list": "BV1"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(
            "/api/config",
            json!({"fetch_interval_minutes": 200_000_000_000_000_000i64}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = api.get("/api/config").await;
    assert_eq!(body["data"]["fetch_interval_minutes"], 10);
}
