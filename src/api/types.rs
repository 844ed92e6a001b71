//! Response bodies of the query/administration API
//!
//! Every endpoint answers with an [`Envelope`]; `code == 0` means success.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Snapshot, TargetInfo};

/// Timestamp layout the dashboard expects for capture times
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `{code, message, data}` wrapper around every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message("success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// One snapshot in the shape the dashboard charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRow {
    pub bv_id: String,
    pub title: Option<String>,
    pub view: u64,
    pub like: u64,
    pub coin: u64,
    pub favorite: u64,
    pub share: u64,
    pub online: u64,

    /// Capture time, `YYYY-MM-DD HH:MM:SS` in UTC
    pub timestamp: String,

    /// Ingestion time, RFC 3339 with milliseconds
    pub created_at: Option<String>,
}

impl From<Snapshot> for StatsRow {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            timestamp: snapshot.captured_at.format(TIMESTAMP_FORMAT).to_string(),
            created_at: snapshot.ingested_at.map(format_ingested),
            bv_id: snapshot.target_id,
            title: snapshot.title,
            view: snapshot.views,
            like: snapshot.likes,
            coin: snapshot.coins,
            favorite: snapshot.favorites,
            share: snapshot.shares,
            online: snapshot.online_count,
        }
    }
}

fn format_ingested(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A known video and its last title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub bv_id: String,
    pub title: String,
}

impl From<TargetInfo> for VideoInfo {
    fn from(info: TargetInfo) -> Self {
        Self {
            bv_id: info.target_id,
            title: info.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}
