//! Storage backend trait definition
//!
//! This module defines the `StorageBackend` trait, the append-only
//! time-series store every backend implements.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::error::StorageResult;
use super::schema::DeleteFilter;
use crate::{Snapshot, TargetInfo};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Append-only store of snapshots
///
/// ## Ordering
///
/// Every row receives an `ingested_at` timestamp on append. Backends must
/// keep it non-decreasing across inserts, so for any single target
/// `ingested_at` orders its history. Ties are broken by insertion order.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the scheduler writes while the
/// API layer reads from the same instance.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert one snapshot
    ///
    /// Never updates or merges existing rows. If `ingested_at` is unset it is
    /// assigned here. Returns the snapshot as stored.
    async fn append(&self, snapshot: Snapshot) -> StorageResult<Snapshot>;

    /// Most recently ingested snapshot for a target
    async fn latest(&self, target_id: &str) -> StorageResult<Option<Snapshot>>;

    /// Up to `limit` most recent snapshots for a target, oldest first
    ///
    /// The result is always a suffix of the target's full chronological
    /// history, which is what charting consumers rely on.
    async fn history(&self, target_id: &str, limit: usize) -> StorageResult<Vec<Snapshot>>;

    /// Distinct target ids present in the store, in no particular order
    async fn list_targets(&self) -> StorageResult<Vec<String>>;

    /// Delete rows matching every provided filter
    ///
    /// An empty filter deletes nothing and returns `0`.
    async fn delete(&self, filter: &DeleteFilter) -> StorageResult<usize>;

    /// Delete rows ingested before `before`
    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable statistics (row count, time range, ...)
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;

    /// Delete rows ingested more than `retention_days` days ago
    ///
    /// Housekeeping only; the fetch pipeline never calls this. A retention
    /// reaching past the earliest representable date deletes nothing.
    async fn prune(&self, retention_days: u32) -> StorageResult<usize> {
        let cutoff = Duration::try_days(i64::from(retention_days))
            .and_then(|retention| Utc::now().checked_sub_signed(retention));
        match cutoff {
            Some(cutoff) => self.cleanup_before(cutoff).await,
            None => Ok(0),
        }
    }

    /// Every known target paired with the title of its latest snapshot
    ///
    /// Targets without a title fall back to their id.
    async fn targets_with_titles(&self) -> StorageResult<Vec<TargetInfo>> {
        let mut infos = Vec::new();
        for target_id in self.list_targets().await? {
            if let Some(latest) = self.latest(&target_id).await? {
                infos.push(TargetInfo {
                    title: latest.display_title().to_string(),
                    target_id,
                });
            }
        }
        Ok(infos)
    }
}
