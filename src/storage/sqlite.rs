//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers (the API) are not blocked by the scheduler's writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Limitations
//!
//! - **Single writer**: one scheduler process per database file
//! - **Replication**: No built-in replication (file-level backups only)

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Arguments, Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::clock::IngestClock;
use super::error::{StorageError, StorageResult};
use super::schema::{DeleteFilter, SnapshotRow};
use crate::Snapshot;

const SNAPSHOT_COLUMNS: &str = "target_id, title, views, likes, coins, favorites, shares, \
                                online_count, captured_at, ingested_at";

/// SQLite storage backend
///
/// Stores snapshots in a local SQLite database file.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
    clock: IngestClock,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for WAL mode
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use bilitrack::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./data.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations complete");

        // Resume the ingestion clock from the newest stored row
        let newest: Option<i64> = sqlx::query_scalar("SELECT MAX(ingested_at) FROM snapshots")
            .fetch_one(&pool)
            .await?;
        let clock = IngestClock::starting_at(newest.and_then(DateTime::from_timestamp_millis));

        Ok(Self {
            pool,
            db_path: db_path_str,
            clock,
        })
    }

    fn row_to_snapshot(row: SqliteRow) -> StorageResult<Snapshot> {
        SnapshotRow {
            target_id: row.try_get("target_id")?,
            title: row.try_get("title")?,
            views: row.try_get("views")?,
            likes: row.try_get("likes")?,
            coins: row.try_get("coins")?,
            favorites: row.try_get("favorites")?,
            shares: row.try_get("shares")?,
            online_count: row.try_get("online_count")?,
            captured_at: row.try_get("captured_at")?,
            ingested_at: row.try_get("ingested_at")?,
        }
        .into_snapshot()
    }

    fn bind_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::QueryFailed(format!("failed to bind parameter: {e}"))
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, snapshot), fields(target = %snapshot.target_id))]
    async fn append(&self, mut snapshot: Snapshot) -> StorageResult<Snapshot> {
        let ingested_at = self.clock.stamp(snapshot.ingested_at);
        let row = SnapshotRow::from_snapshot(&snapshot, ingested_at);

        let result = sqlx::query(&format!(
            "INSERT INTO snapshots ({SNAPSHOT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&row.target_id)
        .bind(&row.title)
        .bind(row.views)
        .bind(row.likes)
        .bind(row.coins)
        .bind(row.favorites)
        .bind(row.shares)
        .bind(row.online_count)
        .bind(row.captured_at)
        .bind(row.ingested_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StorageError::WriteRejected(format!(
                "expected one inserted row, got {}",
                result.rows_affected()
            )));
        }

        debug!("stored snapshot ingested at {}", ingested_at);
        snapshot.ingested_at = Some(ingested_at);
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn latest(&self, target_id: &str) -> StorageResult<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM snapshots
            WHERE target_id = ?
            ORDER BY ingested_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_snapshot).transpose()
    }

    #[instrument(skip(self))]
    async fn history(&self, target_id: &str, limit: usize) -> StorageResult<Vec<Snapshot>> {
        debug!("querying latest {} snapshots for {}", limit, target_id);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM snapshots
            WHERE target_id = ?
            ORDER BY ingested_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(target_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut results = rows
            .into_iter()
            .map(Self::row_to_snapshot)
            .collect::<StorageResult<Vec<_>>>()?;
        // Reverse to get chronological order (oldest first)
        results.reverse();
        debug!("query returned {} snapshots", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_targets(&self) -> StorageResult<Vec<String>> {
        let targets: Vec<String> = sqlx::query_scalar("SELECT DISTINCT target_id FROM snapshots")
            .fetch_all(&self.pool)
            .await?;
        Ok(targets)
    }

    #[instrument(skip(self))]
    async fn delete(&self, filter: &DeleteFilter) -> StorageResult<usize> {
        if filter.is_empty() {
            warn!("refusing delete without filters");
            return Ok(0);
        }

        let mut conditions = Vec::new();
        let mut arguments = SqliteArguments::default();

        if let Some(target_id) = &filter.target_id {
            conditions.push("target_id = ?");
            arguments.add(target_id.clone()).map_err(Self::bind_error)?;
        }

        let (lower, upper) = filter.captured_bounds();
        if let Some(lower) = lower {
            conditions.push("captured_at >= ?");
            arguments.add(lower.timestamp()).map_err(Self::bind_error)?;
        }
        if let Some(upper) = upper {
            conditions.push("captured_at < ?");
            arguments.add(upper.timestamp()).map_err(Self::bind_error)?;
        }

        let sql = format!("DELETE FROM snapshots WHERE {}", conditions.join(" AND "));
        let result = sqlx::query_with(&sql, arguments)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} snapshots", deleted);
        Ok(deleted)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up snapshots ingested before {}", before);

        let result = sqlx::query("DELETE FROM snapshots WHERE ingested_at < ?")
            .bind(before.timestamp_millis())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old snapshots", deleted);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (total_rows, targets, oldest, newest): (i64, i64, Option<i64>, Option<i64>) =
            sqlx::query_as(
                "SELECT COUNT(*), COUNT(DISTINCT target_id), MIN(ingested_at), MAX(ingested_at) \
                 FROM snapshots",
            )
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        let time_range = match (
            oldest.and_then(DateTime::from_timestamp_millis),
            newest.and_then(DateTime::from_timestamp_millis),
        ) {
            (Some(old), Some(new)) => {
                format!("{} to {}", old.format("%Y-%m-%d"), new.format("%Y-%m-%d"))
            }
            _ => "no data".to_string(),
        };

        Ok(format!(
            "SQLite: {} rows for {} videos, {:.2} MB on disk, time range: {}",
            total_rows, targets, file_size_mb, time_range
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
