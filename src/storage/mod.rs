//! Storage backends for snapshot persistence
//!
//! This module provides a trait-based abstraction over the append-only
//! snapshot log.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` allows swapping implementations
//! - **Async**: All operations are async so the scheduler and API can share one backend
//! - **Append-only**: rows are never updated, only deleted by filter or retention
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database file
//! - **In-Memory**: No persistence, for testing or ad-hoc runs
//!
//! ## Usage
//!
//! ```no_run
//! use bilitrack::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./data.db").await?;
//!     let history = backend.history("BV1xx411c7XZ", 100).await?;
//!     println!("{} snapshots", history.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

pub mod backend;
pub mod clock;
pub mod error;
pub mod memory;
pub mod retention;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use retention::spawn_retention_task;
pub use schema::{DeleteFilter, SnapshotRow};

use crate::config::StorageConfig;

/// Open the backend described by the storage section of the config.
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory storage, snapshots will not survive a restart");
            Ok(Arc::new(memory::MemoryBackend::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path, .. } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::ConnectionFailed(
            "built without the storage-sqlite feature".to_string(),
        )),
    }
}
