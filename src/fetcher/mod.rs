//! Remote metrics lookup
//!
//! A [`MetricsFetcher`] turns one target id into one [`Snapshot`]. The
//! production implementation is [`bilibili::BilibiliClient`], which composes
//! two remote calls:
//!
//! ```text
//! view lookup (title, counters, aid/cid) ──► online lookup (aid, cid) ──► Snapshot
//!        │ failure: no snapshot                  │ failure: online_count = 0
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::Snapshot;

pub mod bilibili;
pub mod response;

pub use bilibili::BilibiliClient;

/// Produces one normalized snapshot per target
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn fetch(&self, target_id: &str) -> Result<Snapshot, FetchFailure>;
}

/// Why a single remote call failed
#[derive(Debug)]
pub enum FetchError {
    /// The call did not complete within its time budget
    Timeout,

    /// Connection refused, reset, DNS failure, ...
    Network(reqwest::Error),

    /// The remote answered with a non-success HTTP status
    HttpStatus(reqwest::StatusCode),

    /// The remote answered but reported a non-zero application code
    RemoteApi { code: i64, message: String },

    /// The body was not the expected shape
    Malformed(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }

    /// Transport-level failure (timeout or network)
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::Network(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::Network(err) => write!(f, "network error: {}", err),
            FetchError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            FetchError::RemoteApi { code, message } => {
                write!(f, "remote API error {}: {}", code, message)
            }
            FetchError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Network(err) => Some(err),
            _ => None,
        }
    }
}

/// A target whose core lookup failed; no snapshot was produced
#[derive(Debug)]
pub struct FetchFailure {
    pub target_id: String,
    pub cause: FetchError,
}

impl FetchFailure {
    pub fn new(target_id: impl Into<String>, cause: FetchError) -> Self {
        Self {
            target_id: target_id.into(),
            cause,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to fetch {}: {}", self.target_id, self.cause)
    }
}

impl std::error::Error for FetchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
