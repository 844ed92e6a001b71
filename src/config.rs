use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Snapshots ingested longer ago than this are pruned by housekeeping
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention_days: Option<u32>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: None,
        }
    }
}

impl StorageConfig {
    pub fn retention_days(&self) -> Option<u32> {
        match self {
            StorageConfig::None => None,
            StorageConfig::Sqlite { retention_days, .. } => *retention_days,
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./data.db")
}

/// The persisted configuration record (`config.json`)
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// unchanged on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_interval")]
    pub fetch_interval_minutes: u64,

    /// Target monitored when no list file exists yet
    #[serde(rename = "bv_id", default = "default_target")]
    pub default_target: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_interval_minutes: default_interval(),
            default_target: default_target(),
            api_port: default_api_port(),
            storage: StorageConfig::default(),
            extra: Map::new(),
        }
    }
}

/// Longest accepted fetch interval, one year
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Check that a fetch interval lies within `1..=MAX_INTERVAL_MINUTES`.
pub fn validate_interval(minutes: u64) -> Result<(), ConfigError> {
    if minutes < 1 {
        return Err(ConfigError::Invalid(
            "fetch_interval_minutes must be at least 1".to_string(),
        ));
    }
    if minutes > MAX_INTERVAL_MINUTES {
        return Err(ConfigError::Invalid(format!(
            "fetch_interval_minutes must be at most {MAX_INTERVAL_MINUTES}"
        )));
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.fetch_interval_minutes)
    }
}

fn default_interval() -> u64 {
    10
}

fn default_target() -> String {
    String::from("BV1xx411c7XZ")
}

fn default_api_port() -> u16 {
    5000
}

/// Errors raised while reading or writing configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid configuration record
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The values are well-formed but not acceptable
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to access {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid configuration file {}: {}", path.display(), source)
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

pub async fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::io(path, e))?;
    let config: Config = serde_json::from_str(&file_content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

pub async fn write_config_file(path: impl AsRef<Path>, config: &Config) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ConfigError::io(path, e))
}
