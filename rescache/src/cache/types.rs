//! Core types for the cache system.

use std::path::PathBuf;
use thiserror::Error;

/// Default logical store name.
pub const DEFAULT_STORE_NAME: &str = "product-cache";

/// Default maximum cache size in bytes (10 GB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A key or metadata record was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resource cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache root directory
    pub cache_dir: PathBuf,
    /// Logical store name, scopes the descriptor directory
    pub store_name: String,
    /// Maximum total product size in bytes; 0 disables eviction
    pub max_size_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rescache");

        Self {
            cache_dir,
            store_name: DEFAULT_STORE_NAME.to_string(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

impl CacheConfig {
    /// Create a configuration rooted at the given directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Set the maximum cache size in bytes (0 = unbounded).
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Set the logical store name.
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Directory holding cached product files.
    pub fn product_dir(&self) -> PathBuf {
        self.cache_dir.join("products")
    }

    /// Root directory of the descriptor persistence stores.
    pub fn persistence_dir(&self) -> PathBuf {
        self.cache_dir.join("persistence")
    }
}
