//! Integration tests for hot reload of the monitor configuration
//!
//! These tests verify that:
//! - List edits between cycles take effect without a restart
//! - Updates through the config source reach the next cycle
//! - A missing list file is created and yields an empty cycle

use std::sync::Arc;

use bilitrack::scheduler::{RunMode, Scheduler};
use bilitrack::source::{ConfigSource, ConfigUpdate, FileConfigSource};
use bilitrack::storage::StorageBackend;
use bilitrack::storage::memory::MemoryBackend;
use serde_json::json;
use tempfile::tempdir;
use wiremock::MockServer;

use crate::helpers::{client_for, fast_options, mount_online, mount_video, write_config, write_list};

#[tokio::test]
async fn test_list_edit_between_cycles() {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path(), json!({"fetch_interval_minutes": 1}));
    let list_path = write_list(dir.path(), "A\n");

    let server = MockServer::start().await;
    mount_video(&server, "A", 1, 10).await;
    mount_video(&server, "B", 2, 20).await;
    mount_online(&server, json!(5)).await;

    let store = Arc::new(MemoryBackend::new());
    let scheduler = Scheduler::with_options(
        Arc::new(FileConfigSource::new(&config_path, &list_path)),
        Arc::new(client_for(&server)),
        store.clone(),
        fast_options(),
    );

    scheduler.run(RunMode::Once).await;
    assert!(store.latest("B").await.unwrap().is_none());

    write_list(dir.path(), "A\nB\n");
    let summary = scheduler.run(RunMode::Once).await;

    assert_eq!(summary.stored, 2);
    assert_eq!(store.history("A", 10).await.unwrap().len(), 2);
    assert_eq!(store.history("B", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_reaches_next_cycle() {
    let dir = tempdir().unwrap();
    let config_path = write_config(
        dir.path(),
        json!({"fetch_interval_minutes": 10, "api_port": 5001}),
    );
    let list_path = write_list(dir.path(), "A\n");
    let source = Arc::new(FileConfigSource::new(&config_path, &list_path));

    let server = MockServer::start().await;
    mount_video(&server, "A", 1, 10).await;
    mount_video(&server, "C", 3, 30).await;
    mount_online(&server, json!(5)).await;

    source
        .update(ConfigUpdate {
            fetch_interval_minutes: Some(3),
            monitor_list: Some(vec!["C".into(), "  ".into()]),
        })
        .await
        .unwrap();

    let store = Arc::new(MemoryBackend::new());
    let scheduler = Scheduler::with_options(
        source.clone(),
        Arc::new(client_for(&server)),
        store.clone(),
        fast_options(),
    );
    scheduler.run(RunMode::Once).await;

    assert_eq!(store.list_targets().await.unwrap(), vec!["C"]);

    let view = source.view().await.unwrap();
    assert_eq!(view.config.fetch_interval_minutes, 3);
    assert_eq!(view.config.api_port, 5001);
    assert_eq!(view.monitor_list, vec!["C"]);
}

#[tokio::test]
async fn test_missing_list_creates_template() {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path(), json!({}));
    let list_path = dir.path().join("monitor.list");

    let server = MockServer::start().await;
    let scheduler = Scheduler::with_options(
        Arc::new(FileConfigSource::new(&config_path, &list_path)),
        Arc::new(client_for(&server)),
        Arc::new(MemoryBackend::new()),
        fast_options(),
    );

    let summary = scheduler.run(RunMode::Once).await;

    assert_eq!(summary.attempted, 0);
    let template = std::fs::read_to_string(&list_path).unwrap();
    assert!(template.lines().all(|line| line.is_empty() || line.starts_with('#')));
}
