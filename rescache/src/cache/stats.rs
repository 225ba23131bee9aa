//! Cache statistics tracking and reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared by the cache index and the eviction listener.
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_purges: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
    bytes_evicted: AtomicU64,
    created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_purges: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            bytes_evicted: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an entry purged because its metadata changed or its file vanished.
    pub fn record_stale_purge(&self) {
        self.stale_purges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an entry removed by an eviction sweep.
    pub fn record_eviction(&self, bytes: u64) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.bytes_evicted.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot combined with the current cache sizes.
    pub fn snapshot(&self, size_bytes: u64, entry_count: u64, max_size_bytes: u64) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_purges: self.stale_purges.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            bytes_evicted: self.bytes_evicted.load(Ordering::Relaxed),
            size_bytes,
            entry_count,
            max_size_bytes,
            uptime: self.created_at.elapsed(),
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub stale_purges: u64,
    pub puts: u64,
    pub evictions: u64,
    pub bytes_evicted: u64,
    /// Directory size counter at snapshot time
    pub size_bytes: u64,
    pub entry_count: u64,
    /// Configured budget, 0 when unbounded
    pub max_size_bytes: u64,
    pub uptime: Duration,
}

impl CacheStatistics {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of the size budget in use, `None` when unbounded.
    pub fn utilization(&self) -> Option<f64> {
        if self.max_size_bytes == 0 {
            None
        } else {
            Some(self.size_bytes as f64 / self.max_size_bytes as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = CacheStats::new().snapshot(0, 0, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert!(stats.utilization().is_none());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snapshot = stats.snapshot(0, 0, 0);
        assert_eq!(snapshot.hit_rate(), 0.75);
    }

    #[test]
    fn test_eviction_accounting() {
        let stats = CacheStats::new();
        stats.record_eviction(100);
        stats.record_eviction(50);

        let snapshot = stats.snapshot(250, 3, 1000);
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.bytes_evicted, 150);
        assert_eq!(snapshot.utilization(), Some(0.25));
    }
}
