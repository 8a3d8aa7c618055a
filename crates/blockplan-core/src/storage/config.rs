//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Search horizon and default task duration
//! - Scoring weights and the peak-hours window
//! - Importance weights used for displacement
//! - Todoist connection settings
//!
//! Configuration is stored at `~/.config/blockplan/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::{PeakHours, SchedulerConfig, ScoringWeights};
use crate::task::ImportanceWeights;

/// Environment variable overriding `todoist.api_token`.
pub const TODOIST_TOKEN_ENV: &str = "TODOIST_API_TOKEN";

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
}

/// Todoist connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoistConfig {
    /// API token; `TODOIST_API_TOKEN` takes precedence.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_todoist_base_url")]
    pub base_url: String,
    /// Filter expression used when none is given on the command line.
    #[serde(default)]
    pub default_filter: Option<String>,
    #[serde(default = "default_meeting_label")]
    pub meeting_label: String,
    #[serde(default = "default_starred_label")]
    pub starred_label: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/blockplan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub peak_hours: PeakHours,
    #[serde(default)]
    pub importance: ImportanceWeights,
    #[serde(default)]
    pub todoist: TodoistConfig,
}

fn default_horizon_days() -> u32 {
    7
}
fn default_duration_minutes() -> u32 {
    30
}
fn default_todoist_base_url() -> String {
    "https://api.todoist.com".into()
}
fn default_meeting_label() -> String {
    "meeting".into()
}
fn default_starred_label() -> String {
    "starred".into()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_todoist_base_url(),
            default_filter: None,
            meeting_label: default_meeting_label(),
            starred_label: default_starred_label(),
        }
    }
}

impl TodoistConfig {
    /// Token from the environment, else from the file.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(TODOIST_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api_token.clone().filter(|t| !t.trim().is_empty()))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Scheduler settings described by this file.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let mut builder = SchedulerConfig::builder()
            .horizon_days(self.scheduler.horizon_days)
            .default_duration_minutes(self.scheduler.default_duration_minutes)
            .weights(self.scoring)
            .importance(self.importance);
        builder = if self.peak_hours.enabled {
            builder.peak_hours(
                self.peak_hours.start_hour,
                self.peak_hours.end_hour,
                self.peak_hours.bonus,
            )
        } else {
            builder.without_peak_hours()
        };
        let config = builder.build();
        if !config.weights.priority_bonus.is_monotonic() {
            tracing::warn!("scoring.priority_bonus is not ordered P1 >= P2 >= P3 >= P4");
        }
        if !config.earlier_day_dominates() {
            tracing::warn!("Scoring weights let a later day outscore an earlier one");
        }
        config
    }
}
