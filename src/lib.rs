#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod fetcher;
pub mod scheduler;
pub mod source;
pub mod storage;
pub mod util;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One set of statistics for one video at one point in time.
///
/// A snapshot is only ever produced by a successful core-info lookup. The
/// online count is best-effort and falls back to `0` when its own lookup
/// fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Platform-assigned identifier of the video (BV id)
    pub target_id: String,

    /// Last known display title
    pub title: Option<String>,

    pub views: u64,
    pub likes: u64,
    pub coins: u64,
    pub favorites: u64,
    pub shares: u64,

    /// Concurrent viewers at capture time (best-effort)
    pub online_count: u64,

    /// When the statistics were fetched (second precision)
    pub captured_at: DateTime<Utc>,

    /// When the store accepted the row; `None` until persisted
    pub ingested_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Create an empty snapshot for `target_id` captured at `captured_at`.
    ///
    /// Sub-second precision is dropped from the capture time.
    pub fn new(target_id: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            target_id: target_id.into(),
            title: None,
            views: 0,
            likes: 0,
            coins: 0,
            favorites: 0,
            shares: 0,
            online_count: 0,
            captured_at: captured_at.trunc_subsecs(0),
            ingested_at: None,
        }
    }

    /// Title for display, falling back to the target id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.target_id)
    }
}

/// A target paired with the title of its most recent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub target_id: String,
    pub title: String,
}
