//! Monitor configuration sources
//!
//! The scheduler asks its [`ConfigSource`] for fresh settings at the start of
//! every cycle and keeps nothing between cycles, so edits to the list file or
//! updates through the API take effect on the next cycle without a restart.
//!
//! ## Monitor list format
//!
//! ```text
//! # Bilibili video monitor list
//! BV1xx411c7XZ
//! BV1JHLUz4EUy
//! ```
//!
//! One id per line. Blank lines and lines starting with `#` are ignored.
//! Duplicates are kept and simply fetched twice.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::{
    Config, ConfigError, read_config_file, validate_interval, write_config_file,
};

const LIST_HEADER: &str = "# Bilibili video monitor list\n\
                           # One BV id per line, lines starting with # are comments\n";

/// Settings the scheduler needs for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval_minutes: u64,
    pub targets: Vec<String>,
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1).saturating_mul(60))
    }
}

/// Current configuration as reported to administrators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigView {
    #[serde(flatten)]
    pub config: Config,
    pub monitor_list: Vec<String>,
}

/// A partial configuration update
///
/// Absent fields are left untouched. A present `monitor_list` replaces the
/// whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub fetch_interval_minutes: Option<u64>,
    pub monitor_list: Option<Vec<String>>,
}

impl ConfigUpdate {
    /// Validate an update received as loosely typed JSON.
    pub fn from_json(body: &Value) -> Result<Self, ConfigError> {
        let fetch_interval_minutes = match body.get("fetch_interval_minutes") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let minutes = value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                    .ok_or_else(|| {
                        ConfigError::Invalid("fetch_interval_minutes must be an integer".into())
                    })?;
                let minutes = u64::try_from(minutes).map_err(|_| {
                    ConfigError::Invalid("fetch_interval_minutes must be at least 1".into())
                })?;
                validate_interval(minutes)?;
                Some(minutes)
            }
        };

        let monitor_list = match body.get("monitor_list") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            ConfigError::Invalid("monitor_list must be an array of strings".into())
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => {
                return Err(ConfigError::Invalid(
                    "monitor_list must be an array of strings".into(),
                ));
            }
        };

        Ok(Self {
            fetch_interval_minutes,
            monitor_list,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.fetch_interval_minutes {
            Some(minutes) => validate_interval(minutes),
            None => Ok(()),
        }
    }
}

/// Supplies the interval and the ordered target list
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fresh settings for the next cycle
    async fn reload(&self) -> Result<MonitorSettings, ConfigError>;

    /// Current configuration for display
    async fn view(&self) -> Result<ConfigView, ConfigError>;

    /// Persist an update; the next `reload` observes it
    async fn update(&self, update: ConfigUpdate) -> Result<ConfigView, ConfigError>;
}

/// Parse the monitor list text format.
///
/// Lines containing whitespace inside the id can not be a valid identifier
/// and are skipped.
pub fn parse_monitor_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if line.split_whitespace().nth(1).is_some() {
                warn!("skipping unparseable monitor list line: {line:?}");
                false
            } else {
                true
            }
        })
        .map(str::to_string)
        .collect()
}

/// Render a target list in the monitor list text format.
pub fn render_monitor_list(targets: &[String]) -> String {
    let mut out = String::from(LIST_HEADER);
    out.push('\n');
    for target in targets.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        out.push_str(target);
        out.push('\n');
    }
    out
}

/// Config record and monitor list backed by two files
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    config_path: PathBuf,
    list_path: PathBuf,
}

impl FileConfigSource {
    pub fn new(config_path: impl Into<PathBuf>, list_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            list_path: list_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn list_path(&self) -> &Path {
        &self.list_path
    }

    async fn read_list(&self) -> Result<Option<Vec<String>>, ConfigError> {
        match tokio::fs::read(&self.list_path).await {
            Ok(bytes) => Ok(Some(parse_monitor_list(&String::from_utf8_lossy(&bytes)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::io(&self.list_path, e)),
        }
    }

    async fn write_list(&self, content: String) -> Result<(), ConfigError> {
        tokio::fs::write(&self.list_path, content)
            .await
            .map_err(|e| ConfigError::io(&self.list_path, e))
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    #[instrument(skip(self), fields(list = %self.list_path.display()))]
    async fn reload(&self) -> Result<MonitorSettings, ConfigError> {
        let config = read_config_file(&self.config_path).await?;

        let targets = match self.read_list().await? {
            Some(targets) => targets,
            None => {
                info!("monitor list not found, creating an empty one");
                let mut template = String::from(LIST_HEADER);
                template.push_str("# Example:\n# BV1xx411c7XZ\n");
                self.write_list(template).await?;
                Vec::new()
            }
        };

        debug!("reloaded {} targets", targets.len());
        Ok(MonitorSettings {
            interval_minutes: config.fetch_interval_minutes,
            targets,
        })
    }

    async fn view(&self) -> Result<ConfigView, ConfigError> {
        let config = read_config_file(&self.config_path).await?;
        let monitor_list = match self.read_list().await? {
            Some(targets) => targets,
            None => vec![config.default_target.clone()],
        };
        Ok(ConfigView {
            config,
            monitor_list,
        })
    }

    #[instrument(skip(self))]
    async fn update(&self, update: ConfigUpdate) -> Result<ConfigView, ConfigError> {
        update.validate()?;
        let mut config = read_config_file(&self.config_path).await?;

        // list first: a failed list write leaves the interval untouched
        if let Some(targets) = &update.monitor_list {
            self.write_list(render_monitor_list(targets)).await?;
            info!("monitor list replaced");
        }

        if let Some(minutes) = update.fetch_interval_minutes {
            config.fetch_interval_minutes = minutes;
            write_config_file(&self.config_path, &config).await?;
            info!("fetch interval set to {minutes} minutes");
        }

        self.view().await
    }
}

/// In-memory configuration, for tests and embedding
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    state: RwLock<(Config, Vec<String>)>,
}

impl StaticConfigSource {
    pub fn new(config: Config, targets: Vec<String>) -> Self {
        Self {
            state: RwLock::new((config, targets)),
        }
    }

    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            Config::default(),
            targets.into_iter().map(Into::into).collect(),
        )
    }

    pub async fn set_targets<I, S>(&self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.write().await.1 = targets.into_iter().map(Into::into).collect();
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn reload(&self) -> Result<MonitorSettings, ConfigError> {
        let state = self.state.read().await;
        Ok(MonitorSettings {
            interval_minutes: state.0.fetch_interval_minutes,
            targets: state.1.clone(),
        })
    }

    async fn view(&self) -> Result<ConfigView, ConfigError> {
        let state = self.state.read().await;
        Ok(ConfigView {
            config: state.0.clone(),
            monitor_list: state.1.clone(),
        })
    }

    async fn update(&self, update: ConfigUpdate) -> Result<ConfigView, ConfigError> {
        update.validate()?;
        {
            let mut state = self.state.write().await;
            if let Some(minutes) = update.fetch_interval_minutes {
                state.0.fetch_interval_minutes = minutes;
            }
            if let Some(targets) = update.monitor_list {
                state.1 = targets
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
        self.view().await
    }
}
