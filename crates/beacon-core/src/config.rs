//! Beacon configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::BackoffStrategy;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryDefaults,
    #[serde(default)]
    pub tracking: TrackingDefaults,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            retry: RetryDefaults::default(),
            tracking: TrackingDefaults::default(),
        }
    }
}

impl BeaconConfig {
    /// Load config from the default path (~/.beacon/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::BeaconError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::BeaconError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BeaconError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Beacon home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".beacon")
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path. A leading `~` resolves to the home directory.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "~/.beacon/beacon.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl StoreConfig {
    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match self.path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            None => PathBuf::from(&self.path),
        }
    }
}

/// Defaults applied when a notification carries no explicit retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDefaults {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_strategy")]
    pub backoff_strategy: BackoffStrategy,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    /// Per-channel retry ceiling consulted by delivery workers.
    #[serde(default = "default_channel_max_retries")]
    pub channel_max_retries: u32,
}

fn default_max_attempts() -> u32 { 3 }
fn default_strategy() -> BackoffStrategy { BackoffStrategy::Exponential }
fn default_multiplier() -> f64 { 2.0 }
fn default_channel_max_retries() -> u32 { 3 }

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_strategy: default_strategy(),
            backoff_multiplier: default_multiplier(),
            channel_max_retries: default_channel_max_retries(),
        }
    }
}

/// Defaults applied when a notification carries no explicit tracking policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingDefaults {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "bool_true")]
    pub track_open: bool,
    #[serde(default = "bool_true")]
    pub track_click: bool,
}

fn bool_true() -> bool { true }

impl Default for TrackingDefaults {
    fn default() -> Self {
        Self { enabled: true, track_open: true, track_click: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BeaconConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_strategy, BackoffStrategy::Exponential);
        assert!(config.tracking.track_open);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [store]
            path = "/var/lib/beacon/beacon.db"

            [retry]
            max_attempts = 5
            backoff_strategy = "linear"
        "#;

        let config: BeaconConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.path, "/var/lib/beacon/beacon.db");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_strategy, BackoffStrategy::Linear);
        // Untouched sections keep their defaults
        assert!((config.retry.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: BeaconConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.path, "~/.beacon/beacon.db");
        assert_eq!(config.retry.channel_max_retries, 3);
    }

    #[test]
    fn test_home_dir() {
        let home = BeaconConfig::home_dir();
        assert!(home.to_string_lossy().contains("beacon"));
    }

    #[test]
    fn test_resolved_path_expands_tilde() {
        let store = StoreConfig { path: "~/.beacon/test.db".into() };
        let resolved = store.resolved_path();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.to_string_lossy().ends_with("test.db"));
    }
}
