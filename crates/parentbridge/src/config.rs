//! Configuration management for parentbridge.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preferences::PreferenceDefaults;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "parentbridge";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "notifications.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "PARENTBRIDGE_";

/// Longest accepted notification retention, in days.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PARENTBRIDGE_`, sections split
///    on `__`, e.g. `PARENTBRIDGE_STORAGE__DATABASE_PATH`)
/// 2. TOML config file at `~/.config/parentbridge/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Values for users with no stored preferences.
    pub defaults: PreferenceDefaults,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/parentbridge/notifications.db`
    pub database_path: Option<PathBuf>,
    /// Days to keep logged notifications.
    /// Set to 0 for unlimited.
    pub notification_retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            notification_retention_days: 90,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        // Validate retention
        if self.storage.notification_retention_days > MAX_RETENTION_DAYS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "[storage] notification_retention_days must be at most {MAX_RETENTION_DAYS}, got {}",
                    self.storage.notification_retention_days
                ),
            });
        }

        // Validate preference defaults
        self.defaults
            .validate()
            .map_err(|err| Error::ConfigValidation {
                message: format!("[defaults] {err}"),
            })
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the notification retention period, or `None` when unlimited.
    #[must_use]
    pub fn retention(&self) -> Option<chrono::Duration> {
        match self.storage.notification_retention_days {
            0 => None,
            days => Some(chrono::Duration::days(i64::from(days))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "parentbridge_config_{}_{name}.toml",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.notification_retention_days, 90);
        assert_eq!(config.defaults, PreferenceDefaults::default());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_volume() {
        let mut config = Config::default();
        config.defaults.sound_volume = 1.2;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_validate_bad_quiet_hours() {
        let mut config = Config::default();
        config.defaults.quiet_hours_start = "10pm".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("10pm"));
    }

    #[test]
    fn test_validate_retention_bound() {
        let mut config = Config::default();
        config.storage.notification_retention_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());

        config.storage.notification_retention_days = 100_000_000;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.to_string().contains("notification_retention_days"));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("notifications.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_retention() {
        let mut config = Config::default();
        assert_eq!(config.retention(), Some(chrono::Duration::days(90)));

        config.storage.notification_retention_days = 0;
        assert!(config.retention().is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("parentbridge"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("parentbridge"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = temp_config(
            "valid",
            r#"
[storage]
notification_retention_days = 14

[defaults]
sound_volume = 0.5
quiet_hours_start = "21:00"
"#,
        );

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.storage.notification_retention_days, 14);
        assert!((config.defaults.sound_volume - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.defaults.quiet_hours_start, "21:00");
        assert_eq!(config.defaults.quiet_hours_end, "07:00");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rejects_invalid_defaults() {
        let path = temp_config("invalid", "[defaults]\nsound_volume = 3.0\n");

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rejects_huge_retention() {
        let path = temp_config(
            "retention",
            "[storage]\nnotification_retention_days = 100000000\n",
        );

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"notification_retention_days": 7}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.notification_retention_days, 7);
        assert!(storage.database_path.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("notification_retention_days"));
        assert!(json.contains("sound_volume"));
    }
}
