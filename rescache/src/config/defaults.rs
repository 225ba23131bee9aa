//! Default values for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::cache::{DEFAULT_MAX_SIZE_BYTES, DEFAULT_STORE_NAME};
use crate::transfer::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_TRANSFERS, DEFAULT_MAX_RETRIES,
    DEFAULT_MONITOR_PERIOD, DEFAULT_RETRY_DELAY,
};

/// Default log file name.
pub const DEFAULT_LOG_FILE_NAME: &str = "rescache.log";

/// Default cache root (platform cache directory).
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rescache")
}

/// Default log file (`~/.rescache/logs/rescache.log`).
pub fn default_log_file() -> PathBuf {
    super::config_directory()
        .join("logs")
        .join(DEFAULT_LOG_FILE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_directory(),
                max_size: DEFAULT_MAX_SIZE_BYTES,
                store_name: DEFAULT_STORE_NAME.to_string(),
            },
            transfer: TransferSettings {
                chunk_size: DEFAULT_CHUNK_SIZE as u64,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
                monitor_period_ms: DEFAULT_MONITOR_PERIOD.as_millis() as u64,
                max_concurrent: DEFAULT_MAX_CONCURRENT_TRANSFERS,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
