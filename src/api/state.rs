//! API shared state

use std::sync::Arc;

use crate::source::ConfigSource;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Snapshot store, shared with the scheduler when both run in one process
    pub storage: Arc<dyn StorageBackend>,

    /// Interval and monitor list as seen by the next cycle
    pub config: Arc<dyn ConfigSource>,
}

impl ApiState {
    pub fn new(storage: Arc<dyn StorageBackend>, config: Arc<dyn ConfigSource>) -> Self {
        Self { storage, config }
    }
}
