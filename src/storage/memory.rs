//! In-memory storage backend (no persistence)
//!
//! Snapshots live in an ordered map keyed by
//! `(target_id, ingested_at, sequence)`, which gives the same logarithmic
//! lookups the SQLite index provides. Useful for:
//! - Testing without database dependencies
//! - Running without a `storage` section in the config
//!
//! All data is lost on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::clock::IngestClock;
use super::error::StorageResult;
use super::schema::DeleteFilter;
use crate::Snapshot;

type RowKey = (String, DateTime<Utc>, u64);

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryBackend {
    rows: RwLock<BTreeMap<RowKey, Snapshot>>,
    sequence: AtomicU64,
    clock: IngestClock,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    fn target_range(target_id: &str) -> std::ops::RangeInclusive<RowKey> {
        (target_id.to_string(), DateTime::<Utc>::MIN_UTC, 0)
            ..=(target_id.to_string(), DateTime::<Utc>::MAX_UTC, u64::MAX)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn append(&self, mut snapshot: Snapshot) -> StorageResult<Snapshot> {
        let ingested_at = self.clock.stamp(snapshot.ingested_at);
        snapshot.ingested_at = Some(ingested_at);

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let key = (snapshot.target_id.clone(), ingested_at, sequence);

        debug!("in-memory append for {} at {}", snapshot.target_id, ingested_at);
        self.rows.write().await.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    async fn latest(&self, target_id: &str) -> StorageResult<Option<Snapshot>> {
        let rows = self.rows.read().await;
        Ok(rows
            .range(Self::target_range(target_id))
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }

    async fn history(&self, target_id: &str, limit: usize) -> StorageResult<Vec<Snapshot>> {
        let rows = self.rows.read().await;
        let mut history: Vec<Snapshot> = rows
            .range(Self::target_range(target_id))
            .rev()
            .take(limit)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();
        // Selected newest first, returned oldest first
        history.reverse();
        Ok(history)
    }

    async fn list_targets(&self) -> StorageResult<Vec<String>> {
        let rows = self.rows.read().await;
        let targets: BTreeSet<&String> = rows.keys().map(|(target, _, _)| target).collect();
        Ok(targets.into_iter().cloned().collect())
    }

    async fn delete(&self, filter: &DeleteFilter) -> StorageResult<usize> {
        if filter.is_empty() {
            debug!("refusing delete without filters");
            return Ok(0);
        }

        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, snapshot| !filter.matches(snapshot));
        Ok(before - rows.len())
    }

    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut rows = self.rows.write().await;
        let count = rows.len();
        rows.retain(|(_, ingested_at, _), _| *ingested_at >= before);
        let deleted = count - rows.len();
        debug!("in-memory cleanup removed {} rows", deleted);
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let total = self.rows.read().await.len();
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_snapshots".to_string(), total.to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let rows = self.rows.read().await;
        let targets: BTreeSet<&String> = rows.keys().map(|(target, _, _)| target).collect();
        Ok(format!(
            "In-Memory: {} snapshots across {} videos",
            rows.len(),
            targets.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
