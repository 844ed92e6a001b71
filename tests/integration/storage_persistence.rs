//! Integration tests for storage persistence
//!
//! These tests verify that:
//! - Snapshots survive closing and reopening the database
//! - Ingestion timestamps stay monotonic across restarts
//! - Filtered deletes and retention pruning remove the right rows
//! - A full cycle lands in SQLite

use std::sync::Arc;

use bilitrack::config::StorageConfig;
use bilitrack::scheduler::{RunMode, Scheduler};
use bilitrack::source::StaticConfigSource;
use bilitrack::storage::sqlite::SqliteBackend;
use bilitrack::storage::{DeleteFilter, StorageBackend, open_backend};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use wiremock::MockServer;

use crate::helpers::{client_for, fast_options, mount_online, mount_video, snapshot};

#[tokio::test]
async fn test_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("data.db");

    let first_stamp = {
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        backend
            .append(snapshot("BV1", Utc::now(), 1))
            .await
            .unwrap();
        let stored = backend
            .append(snapshot("BV1", Utc::now(), 2))
            .await
            .unwrap();
        backend.close().await.unwrap();
        stored.ingested_at.unwrap()
    };

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let history = backend.history("BV1", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].views, 2);
    assert_eq!(history[1].title.as_deref(), Some("video BV1"));

    let next = backend
        .append(snapshot("BV1", Utc::now(), 3))
        .await
        .unwrap();
    assert!(next.ingested_at.unwrap() >= first_stamp);
    assert_eq!(backend.latest("BV1").await.unwrap().unwrap().views, 3);
}

#[tokio::test]
async fn test_history_is_newest_suffix_in_ascending_order() {
    let dir = tempdir().unwrap();
    let backend = SqliteBackend::new(dir.path().join("data.db")).await.unwrap();

    for views in 0..10 {
        backend
            .append(snapshot("BV1", Utc::now(), views))
            .await
            .unwrap();
    }
    backend
        .append(snapshot("BV2", Utc::now(), 99))
        .await
        .unwrap();

    let history = backend.history("BV1", 3).await.unwrap();
    let views: Vec<u64> = history.iter().map(|s| s.views).collect();
    assert_eq!(views, vec![7, 8, 9]);
}

#[tokio::test]
async fn test_delete_by_inclusive_date_range() {
    let dir = tempdir().unwrap();
    let backend = SqliteBackend::new(dir.path().join("data.db")).await.unwrap();

    for day in 1..=5 {
        let captured = Utc.with_ymd_and_hms(2026, 1, day, 23, 59, 59).unwrap();
        backend.append(snapshot("BV1", captured, 0)).await.unwrap();
    }
    let other = Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap();
    backend.append(snapshot("BV2", other, 0)).await.unwrap();

    let filter = DeleteFilter::new(
        Some("BV1".into()),
        NaiveDate::from_ymd_opt(2026, 1, 2),
        NaiveDate::from_ymd_opt(2026, 1, 4),
    );
    assert_eq!(backend.delete(&filter).await.unwrap(), 3);

    let remaining: Vec<u32> = backend
        .history("BV1", 10)
        .await
        .unwrap()
        .iter()
        .map(|s| chrono::Datelike::day(&s.captured_at))
        .collect();
    assert_eq!(remaining, vec![1, 5]);
    assert!(backend.latest("BV2").await.unwrap().is_some());

    assert_eq!(backend.delete(&DeleteFilter::default()).await.unwrap(), 0);
    assert_eq!(backend.history("BV1", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_prune_removes_only_old_rows() {
    let dir = tempdir().unwrap();
    let backend = SqliteBackend::new(dir.path().join("data.db")).await.unwrap();

    let old = Utc::now() - Duration::days(40);
    let mut aged = snapshot("BV1", old, 1);
    aged.ingested_at = Some(old);
    backend.append(aged).await.unwrap();
    backend
        .append(snapshot("BV1", Utc::now(), 2))
        .await
        .unwrap();

    assert_eq!(backend.prune(30).await.unwrap(), 1);
    let history = backend.history("BV1", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].views, 2);
}

#[tokio::test]
async fn test_cycle_persists_to_sqlite() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::Sqlite {
        path: dir.path().join("data.db"),
        retention_days: None,
    };
    let store = open_backend(&config).await.unwrap();

    let server = MockServer::start().await;
    mount_video(&server, "BV1", 1, 1234).await;
    mount_online(&server, json!("1.2万+")).await;

    let scheduler = Scheduler::with_options(
        Arc::new(StaticConfigSource::with_targets(["BV1"])),
        Arc::new(client_for(&server)),
        store.clone(),
        fast_options(),
    );
    scheduler.run(RunMode::Once).await;

    let stored = store.latest("BV1").await.unwrap().unwrap();
    assert_eq!(stored.views, 1234);
    assert_eq!(stored.online_count, 12_000);

    let health = store.health_check().await.unwrap();
    assert!(health.healthy);
}
