use crate::history::DEFAULT_CAPACITY;
use crate::model::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub inbox_dir: String,
    pub processed_dir: String,
    pub rejected_dir: String,
    pub history_capacity: usize,
    /// How many recent summaries to log after each cycle.
    pub display_count: usize,
    pub check_interval_seconds: u64,
    /// SQLite file mirroring the history; in-memory only when unset.
    pub database_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inbox_dir: "inbox".into(),
            processed_dir: "processed".into(),
            rejected_dir: "rejected".into(),
            history_capacity: DEFAULT_CAPACITY,
            display_count: DEFAULT_CAPACITY,
            check_interval_seconds: 10,
            database_path: None,
        }
    }
}

/// Loads the JSON config at `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("Config file '{}' not found; using defaults.", path.display());
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;

    if config.history_capacity == 0 {
        return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
    }
    if config.check_interval_seconds == 0 {
        return Err(ConfigError::Invalid("check_interval_seconds must be at least 1".into()));
    }
    Ok(config)
}
