//! Balance Settings
//!
//! Persists a serializable config type as pretty JSON. The first run writes
//! the defaults so users have a file to edit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use balance_keystore::default_config_dir_for;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(String),
    #[error("Failed to read settings: {0}")]
    ReadError(String),
    #[error("Failed to write settings: {0}")]
    WriteError(String),
    #[error("Failed to parse settings {path}: {reason}")]
    ParseError { path: String, reason: String },
    #[error("Failed to create directory: {0}")]
    CreateDirError(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A config value together with the file it was loaded from.
#[derive(Debug)]
pub struct Settings<T> {
    pub config: T,
    path: PathBuf,
}

impl<T: Serialize + DeserializeOwned + Default> Settings<T> {
    /// Load settings from `custom_path` (or the service default), writing defaults if absent.
    pub fn load_or_default(service: &str, custom_path: Option<&Path>) -> Result<Self> {
        let path = match custom_path {
            Some(p) => p.to_path_buf(),
            None => default_settings_path(service),
        };

        if path.exists() {
            Self::load(&path)
        } else {
            debug!("Creating default settings at {}", path.display());
            let settings = Self {
                config: T::default(),
                path,
            };
            settings.save()?;
            Ok(settings)
        }
    }

    /// Load settings from an existing file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        debug!("Loading settings from {}", path.display());
        let content =
            fs::read_to_string(path).map_err(|e| SettingsError::ReadError(e.to_string()))?;
        let config: T = serde_json::from_str(&content).map_err(|e| SettingsError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            config,
            path: path.to_path_buf(),
        })
    }

    /// Save current settings to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::CreateDirError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| SettingsError::WriteError(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| SettingsError::WriteError(e.to_string()))
    }

    /// Get the path where settings are stored.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Get the default settings file path for a service.
pub fn default_settings_path(service: &str) -> PathBuf {
    default_config_dir_for(service).join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct TestConfig {
        url: String,
        timeout_secs: u64,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                url: "http://localhost:8899".to_string(),
                timeout_secs: 30,
            }
        }
    }

    #[test]
    fn test_settings_load_or_default() {
        let dir = std::env::temp_dir().join("balance-settings-test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        // Create default
        let settings: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        assert_eq!(settings.config, TestConfig::default());
        assert!(path.exists());

        // Load existing
        let settings2: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        assert_eq!(settings2.config, TestConfig::default());
        assert_eq!(settings2.path(), path.as_path());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = std::env::temp_dir().join("balance-settings-test-save");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let mut settings: Settings<TestConfig> =
            Settings::load_or_default("test", Some(&path)).unwrap();
        settings.config.url = "https://api.devnet.solana.com".to_string();
        settings.config.timeout_secs = 42;
        settings.save().unwrap();

        let loaded: Settings<TestConfig> = Settings::load(&path).unwrap();
        assert_eq!(loaded.config.url, "https://api.devnet.solana.com");
        assert_eq!(loaded.config.timeout_secs, 42);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join("balance-settings-test-partial");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "timeout_secs": 5 }"#).unwrap();

        let loaded: Settings<TestConfig> = Settings::load(&path).unwrap();
        assert_eq!(loaded.config.timeout_secs, 5);
        assert_eq!(loaded.config.url, TestConfig::default().url);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file() {
        let dir = std::env::temp_dir().join("balance-settings-test-malformed");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let result: Result<Settings<TestConfig>> = Settings::load(&path);
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_settings_path() {
        let path = default_settings_path("balance-manager");
        assert!(path.ends_with("settings.json"));
    }
}
