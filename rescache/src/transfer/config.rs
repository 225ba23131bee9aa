//! Streaming transfer configuration.

use std::time::Duration;

/// Default chunk size (64 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest accepted chunk size (16 MB). One chunk buffer is held per
/// streaming transfer.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Default longest wait for any data from the source before the read is
/// abandoned.
pub const DEFAULT_MONITOR_PERIOD: Duration = Duration::from_secs(5);

/// Default number of transfers allowed to stream at once.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 16;

/// Configuration for [`CachedResourceWriter`](super::CachedResourceWriter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Bytes read from the source per chunk
    pub chunk_size: usize,
    /// Retries after the initial attempt before the transfer fails
    pub max_retries: u32,
    /// Wait between a failed attempt and the next retrieval
    pub retry_delay: Duration,
    /// A source read yielding no data for this long is treated as a stall
    pub monitor_period: Duration,
    /// Concurrently streaming transfers
    pub max_concurrent_transfers: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            monitor_period: DEFAULT_MONITOR_PERIOD,
            max_concurrent_transfers: DEFAULT_MAX_CONCURRENT_TRANSFERS,
        }
    }
}

impl TransferConfig {
    /// Set the chunk size in bytes, clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_monitor_period(mut self, period: Duration) -> Self {
        self.monitor_period = period;
        self
    }

    /// Set the concurrent transfer limit (minimum 1).
    pub fn with_max_concurrent_transfers(mut self, max: usize) -> Self {
        self.max_concurrent_transfers = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransferConfig::default();
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(10));
        assert_eq!(config.monitor_period, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_transfers, 16);
    }

    #[test]
    fn test_builders_clamp_zero() {
        let config = TransferConfig::default()
            .with_chunk_size(0)
            .with_max_concurrent_transfers(0)
            .with_max_retries(0);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.max_concurrent_transfers, 1);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_chunk_size_is_capped() {
        let config = TransferConfig::default().with_chunk_size(usize::MAX);
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);

        let config = TransferConfig::default().with_chunk_size(MAX_CHUNK_SIZE);
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);
    }
}
