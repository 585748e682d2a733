//! Configuration for the timeline core
//!
//! `TimelineConfig` is loaded once at startup (from a JSON file, falling back
//! to defaults) and handed to whichever component needs it. All fields use
//! `#[serde(default)]` so older config files keep deserializing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding [`TimelineConfig::data_path`]
pub const DATA_PATH_ENV: &str = "TIMELINE_DATA_PATH";

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Upper bound for the broadcast channel; larger values only waste memory
const MAX_EVENT_CHANNEL_CAPACITY: usize = 65_536;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot determine home directory for the default data path")]
    NoHomeDirectory,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    /// JSON store location; `None` resolves to `~/.timeline/data/timeline.json`
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    /// Capacity of the domain event broadcast channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Reject fictional time labels when a drop on a non-fictional timeline supplies a time
    #[serde(default = "default_true")]
    pub enforce_absolute_time_on_real_timelines: bool,

    /// Field delimiter for CSV import/export
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_csv_delimiter() -> char {
    ','
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            enforce_absolute_time_on_real_timelines: true,
            csv_delimiter: default_csv_delimiter(),
        }
    }
}

impl TimelineConfig {
    /// Load configuration from a JSON file
    ///
    /// Returns defaults if the file doesn't exist. The result is validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}; using defaults", path);
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (`TIMELINE_DATA_PATH`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var_os(DATA_PATH_ENV).filter(|v| !v.is_empty()) {
            self.data_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "eventChannelCapacity must be greater than 0".to_string(),
            ));
        }
        if self.event_channel_capacity > MAX_EVENT_CHANNEL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "eventChannelCapacity cannot exceed {MAX_EVENT_CHANNEL_CAPACITY}"
            )));
        }
        if !self.csv_delimiter.is_ascii() || matches!(self.csv_delimiter, '"' | '\n' | '\r') {
            return Err(ConfigError::Invalid(format!(
                "csvDelimiter {:?} must be a single ASCII character other than quote or newline",
                self.csv_delimiter
            )));
        }
        if let Some(path) = &self.data_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("dataPath cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Resolve the store file path, defaulting to `~/.timeline/data/timeline.json`
    pub fn resolve_data_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.data_path {
            return Ok(path.clone());
        }
        let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home_dir.join(".timeline").join("data").join("timeline.json"))
    }

    /// CSV delimiter as the byte the `csv` crate expects
    pub fn csv_delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.csv_delimiter as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = TimelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_channel_capacity, 128);
        assert_eq!(config.csv_delimiter_byte(), b',');
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TimelineConfig = serde_json::from_str(r#"{"csvDelimiter": ";"}"#).unwrap();
        assert_eq!(config.csv_delimiter, ';');
        assert!(config.enforce_absolute_time_on_real_timelines);
        assert_eq!(config.event_channel_capacity, 128);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = TimelineConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let quote = TimelineConfig {
            csv_delimiter: '"',
            ..Default::default()
        };
        assert!(quote.validate().is_err());

        let unicode = TimelineConfig {
            csv_delimiter: '§',
            ..Default::default()
        };
        assert!(unicode.validate().is_err());
    }

    #[test]
    fn test_explicit_data_path_wins() {
        let config = TimelineConfig {
            data_path: Some(PathBuf::from("/tmp/custom.json")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_path().unwrap(),
            PathBuf::from("/tmp/custom.json")
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TimelineConfig::load(temp_dir.path().join("none.json"))
            .await
            .unwrap();
        assert_eq!(config, TimelineConfig::default());
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"eventChannelCapacity": 0}"#)
            .await
            .unwrap();
        assert!(matches!(
            TimelineConfig::load(&path).await,
            Err(ConfigError::Invalid(_))
        ));

        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(matches!(
            TimelineConfig::load(&path).await,
            Err(ConfigError::Parse { .. })
        ));
    }
}
