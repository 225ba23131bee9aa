//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub transfer: TransferSettings,
    pub logging: LoggingSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Cache root directory
    pub directory: PathBuf,
    /// Maximum total product size in bytes (0 = unbounded)
    pub max_size: u64,
    /// Descriptor store name
    pub store_name: String,
}

/// `[transfer]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSettings {
    /// Bytes read per chunk
    pub chunk_size: u64,
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Longest wait for one chunk in milliseconds
    pub monitor_period_ms: u64,
    /// Concurrently streaming transfers
    pub max_concurrent: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
