//! Integration tests for failure handling
//!
//! These tests verify that:
//! - Unreachable or slow remotes only fail the affected target
//! - A broken config file empties a cycle instead of ending the run
//! - Duplicate list entries are fetched twice

use std::sync::Arc;
use std::time::Duration;

use bilitrack::fetcher::{BilibiliClient, MetricsFetcher};
use bilitrack::scheduler::{RunMode, Scheduler};
use bilitrack::source::{FileConfigSource, StaticConfigSource};
use bilitrack::storage::StorageBackend;
use bilitrack::storage::memory::MemoryBackend;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    VIEW_PATH, client_for, fast_options, mount_online, mount_video, write_config, write_list,
};

#[tokio::test]
async fn test_unreachable_remote_fails_every_target() {
    let client = BilibiliClient::with_base_url("http://127.0.0.1:9", Duration::from_millis(300))
        .unwrap();
    let store = Arc::new(MemoryBackend::new());
    let scheduler = Scheduler::with_options(
        Arc::new(StaticConfigSource::with_targets(["A", "B"])),
        Arc::new(client),
        store.clone(),
        fast_options(),
    );

    let summary = scheduler.run(RunMode::Once).await;

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.fetch_failures, 2);
    assert!(store.list_targets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_timeout_is_a_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VIEW_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = BilibiliClient::with_base_url(server.uri(), Duration::from_millis(200)).unwrap();
    let failure = client.fetch("BV1").await.unwrap_err();
    assert!(failure.cause.is_network());
}

#[tokio::test]
async fn test_broken_config_yields_empty_cycle() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, "{ not json").unwrap();
    let list_path = write_list(dir.path(), "A\n");

    let server = MockServer::start().await;
    let store = Arc::new(MemoryBackend::new());
    let scheduler = Scheduler::with_options(
        Arc::new(FileConfigSource::new(&config_path, &list_path)),
        Arc::new(client_for(&server)),
        store.clone(),
        fast_options(),
    );

    let summary = scheduler.run(RunMode::Burst { count: 2 }).await;
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.attempted, 0);
}

#[tokio::test]
async fn test_duplicate_entries_are_fetched_twice() {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path(), json!({"fetch_interval_minutes": 1}));
    let list_path = write_list(dir.path(), "# list\nA\nbad line here\nA\n");

    let server = MockServer::start().await;
    mount_video(&server, "A", 1, 10).await;
    mount_online(&server, json!(0)).await;

    let store = Arc::new(MemoryBackend::new());
    let scheduler = Scheduler::with_options(
        Arc::new(FileConfigSource::new(&config_path, &list_path)),
        Arc::new(client_for(&server)),
        store.clone(),
        fast_options(),
    );

    let summary = scheduler.run(RunMode::Once).await;
    assert_eq!(summary.attempted, 2);
    assert_eq!(store.history("A", 10).await.unwrap().len(), 2);
}
