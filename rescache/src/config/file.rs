//! Configuration file handling for ~/.rescache/config.ini.
//!
//! Settings structs live in [`super::settings`], defaults in
//! [`super::defaults`], parsing in [`super::parser`], and serialization in
//! [`super::writer`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::cache::CacheConfig;
use crate::transfer::TransferConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.rescache/config.ini).
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.rescache/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }
}

impl From<&ConfigFile> for CacheConfig {
    fn from(config: &ConfigFile) -> Self {
        CacheConfig::new(&config.cache.directory)
            .with_max_size(config.cache.max_size)
            .with_store_name(config.cache.store_name.as_str())
    }
}

impl From<&ConfigFile> for TransferConfig {
    fn from(config: &ConfigFile) -> Self {
        let transfer = &config.transfer;
        TransferConfig::default()
            .with_chunk_size(usize::try_from(transfer.chunk_size).unwrap_or(usize::MAX))
            .with_max_retries(transfer.max_retries)
            .with_retry_delay(Duration::from_millis(transfer.retry_delay_ms))
            .with_monitor_period(Duration::from_millis(transfer.monitor_period_ms))
            .with_max_concurrent_transfers(transfer.max_concurrent)
    }
}

/// Get the path to the config directory (~/.rescache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rescache")
}

/// Get the path to the config file (~/.rescache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_LOG_FILE_NAME;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.cache.max_size, crate::cache::DEFAULT_MAX_SIZE_BYTES);
        assert_eq!(config.cache.store_name, "product-cache");
        assert_eq!(config.transfer.chunk_size, 64 * 1024);
        assert_eq!(config.transfer.max_retries, 3);
        assert!(config.logging.file.ends_with(DEFAULT_LOG_FILE_NAME));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_runtime_configs_from_file() {
        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::from("/data/cache");
        config.cache.max_size = 0;
        config.transfer.retry_delay_ms = 20;

        let cache = CacheConfig::from(&config);
        assert_eq!(cache.cache_dir, PathBuf::from("/data/cache"));
        assert_eq!(cache.max_size_bytes, 0);
        assert_eq!(cache.product_dir(), PathBuf::from("/data/cache/products"));

        let transfer = TransferConfig::from(&config);
        assert_eq!(transfer.retry_delay, Duration::from_millis(20));
        assert_eq!(transfer.chunk_size, 64 * 1024);
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".rescache/config.ini"));
    }
}
