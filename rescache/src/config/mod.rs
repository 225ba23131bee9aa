//! User configuration for the resource cache.
//!
//! Configuration is read from `~/.rescache/config.ini` and converted into the
//! runtime [`CacheConfig`](crate::cache::CacheConfig) and
//! [`TransferConfig`](crate::transfer::TransferConfig).
//!
//! # Example
//!
//! ```
//! use rescache::cache::CacheConfig;
//! use rescache::config::ConfigFile;
//! use rescache::transfer::TransferConfig;
//!
//! let file = ConfigFile::default();
//! let cache = CacheConfig::from(&file);
//! let transfer = TransferConfig::from(&file);
//! assert_eq!(cache.max_size_bytes, file.cache.max_size);
//! assert_eq!(transfer.max_retries, file.transfer.max_retries);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{default_cache_directory, default_log_file, DEFAULT_LOG_FILE_NAME};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, LoggingSettings, TransferSettings};
pub use size::{format_size, format_size_approx, parse_size, SizeParseError};
