//! Row layout and filters for the snapshot table
//!
//! Snapshots are stored one row per fetch. Counters are plain integer
//! columns; the two timestamps are stored as integers so range scans on the
//! `(target_id, ingested_at)` index stay cheap:
//!
//! - `captured_at`: unix seconds, assigned by the fetcher
//! - `ingested_at`: unix milliseconds, assigned by the store on append

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use super::error::{StorageError, StorageResult};
use crate::Snapshot;

/// A snapshot flattened into database column types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub target_id: String,
    pub title: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub coins: i64,
    pub favorites: i64,
    pub shares: i64,
    pub online_count: i64,
    pub captured_at: i64,
    pub ingested_at: i64,
}

impl SnapshotRow {
    /// Flatten a snapshot for insertion, stamped with `ingested_at`.
    pub fn from_snapshot(snapshot: &Snapshot, ingested_at: DateTime<Utc>) -> Self {
        Self {
            target_id: snapshot.target_id.clone(),
            title: snapshot.title.clone(),
            views: counter_to_column(snapshot.views),
            likes: counter_to_column(snapshot.likes),
            coins: counter_to_column(snapshot.coins),
            favorites: counter_to_column(snapshot.favorites),
            shares: counter_to_column(snapshot.shares),
            online_count: counter_to_column(snapshot.online_count),
            captured_at: snapshot.captured_at.timestamp(),
            ingested_at: ingested_at.timestamp_millis(),
        }
    }

    /// Rebuild the snapshot this row was written from.
    pub fn into_snapshot(self) -> StorageResult<Snapshot> {
        let captured_at = DateTime::from_timestamp(self.captured_at, 0).ok_or_else(|| {
            StorageError::InvalidRow(format!("captured_at out of range: {}", self.captured_at))
        })?;
        let ingested_at = DateTime::from_timestamp_millis(self.ingested_at).ok_or_else(|| {
            StorageError::InvalidRow(format!("ingested_at out of range: {}", self.ingested_at))
        })?;

        Ok(Snapshot {
            target_id: self.target_id,
            title: self.title,
            views: column_to_counter(self.views),
            likes: column_to_counter(self.likes),
            coins: column_to_counter(self.coins),
            favorites: column_to_counter(self.favorites),
            shares: column_to_counter(self.shares),
            online_count: column_to_counter(self.online_count),
            captured_at,
            ingested_at: Some(ingested_at),
        })
    }
}

fn counter_to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn column_to_counter(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Filters for a targeted delete
///
/// Provided filters are combined with AND. The captured-date range is
/// inclusive on both ends and evaluated in UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteFilter {
    pub target_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DeleteFilter {
    /// Build a filter, treating blank target ids as absent.
    pub fn new(
        target_id: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            target_id: target_id.filter(|id| !id.trim().is_empty()),
            start_date,
            end_date,
        }
    }

    pub fn for_target(target_id: impl Into<String>) -> Self {
        Self::new(Some(target_id.into()), None, None)
    }

    /// `true` when no filter is set; such a delete must not touch any row.
    pub fn is_empty(&self) -> bool {
        self.target_id.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }

    /// Inclusive lower and exclusive upper bound on `captured_at`.
    pub fn captured_bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let lower = self.start_date.map(start_of_day);
        let upper = self
            .end_date
            .map(|date| date.checked_add_days(Days::new(1)).map(start_of_day))
            .map(|next| next.unwrap_or(DateTime::<Utc>::MAX_UTC));
        (lower, upper)
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if let Some(target_id) = &self.target_id
            && snapshot.target_id != *target_id
        {
            return false;
        }

        let (lower, upper) = self.captured_bounds();
        if lower.is_some_and(|lower| snapshot.captured_at < lower) {
            return false;
        }
        if upper.is_some_and(|upper| snapshot.captured_at >= upper) {
            return false;
        }
        true
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
