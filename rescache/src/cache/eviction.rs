//! Size-bounded LRU eviction driven by resource map events.
//!
//! The [`EvictionListener`] keeps a running total of the bytes occupied by
//! cached products. When an insertion pushes the total over the configured
//! budget it sweeps the map oldest-first, deleting entries until the total
//! is back within budget.
//!
//! # Accounting
//!
//! Entries removed by a sweep are recorded in a shared "manually evicted"
//! set before the map is touched. The resulting removal event finds the key
//! in the set and leaves the counter alone; the sweep decrements it itself.
//! Removals from anywhere else decrement the counter when their event
//! arrives.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::map::{EntryEvent, EntryListener, ResourceMap};
use super::resource::ReliableResource;
use super::stats::CacheStats;

/// Number of descriptors fetched per sweep page.
pub const EVICTION_PAGE_SIZE: usize = 10;

/// Result of an eviction sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionResult {
    /// Number of entries deleted
    pub entries_evicted: usize,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Directory size before the sweep
    pub size_before: u64,
    /// Directory size after the sweep
    pub size_after: u64,
    /// Duration of the sweep in milliseconds
    pub duration_ms: u64,
}

/// Tracks directory size and evicts least-recently-touched entries.
pub struct EvictionListener {
    max_bytes: AtomicU64,
    directory_size: Arc<AtomicU64>,
    manually_evicted: Arc<Mutex<HashSet<String>>>,
    sweep_lock: Mutex<()>,
    stats: Arc<CacheStats>,
}

impl EvictionListener {
    /// Create a listener over shared counters owned by the cache index.
    ///
    /// A `max_bytes` of 0 disables eviction.
    pub fn new(
        max_bytes: u64,
        directory_size: Arc<AtomicU64>,
        manually_evicted: Arc<Mutex<HashSet<String>>>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            max_bytes: AtomicU64::new(max_bytes),
            directory_size,
            manually_evicted,
            sweep_lock: Mutex::new(()),
            stats,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes.load(Ordering::SeqCst)
    }

    /// Change the byte budget. Takes effect on the next insertion or sweep.
    pub fn set_max_bytes(&self, max_bytes: u64) {
        self.max_bytes.store(max_bytes, Ordering::SeqCst);
    }

    /// Current total of tracked product bytes.
    pub fn directory_size(&self) -> u64 {
        self.directory_size.load(Ordering::SeqCst)
    }

    fn is_over_limit(&self) -> bool {
        let max = self.max_bytes();
        max > 0 && self.directory_size() > max
    }

    /// Sweep the map until the directory size is within budget.
    ///
    /// Returns `None` when no sweep was needed.
    pub fn evict_if_over_limit(&self, map: &ResourceMap) -> Option<EvictionResult> {
        if !self.is_over_limit() {
            return None;
        }

        let _guard = self.sweep_lock.lock();
        let start = Instant::now();
        let mut result = EvictionResult {
            size_before: self.directory_size(),
            ..Default::default()
        };

        'sweep: while self.is_over_limit() {
            let page = map.oldest(EVICTION_PAGE_SIZE);
            if page.is_empty() {
                break;
            }

            for resource in page {
                if !self.is_over_limit() {
                    break 'sweep;
                }
                if self.evict_entry(map, &resource) {
                    result.entries_evicted += 1;
                    result.bytes_freed += resource.size_bytes();
                }
            }
        }

        result.size_after = self.directory_size();
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            entries_evicted = result.entries_evicted,
            bytes_freed = result.bytes_freed,
            size_before = result.size_before,
            size_after = result.size_after,
            max_bytes = self.max_bytes(),
            duration_ms = result.duration_ms,
            "Cache eviction sweep complete"
        );

        Some(result)
    }

    /// Delete one entry on behalf of a sweep.
    ///
    /// Returns true if this sweep removed the entry from the map.
    fn evict_entry(&self, map: &ResourceMap, resource: &ReliableResource) -> bool {
        let key = resource.key();
        self.manually_evicted.lock().insert(key.to_string());

        match map.remove(key) {
            Some(removed) => {
                self.decrement(removed.size_bytes());
                removed.delete_product_file();
                self.stats.record_eviction(removed.size_bytes());
                debug!(key = %key, size_bytes = removed.size_bytes(), "Evicted cache entry");
                true
            }
            None => {
                // Removed concurrently. If that removal's event already
                // consumed our marker it skipped the decrement.
                let marker_consumed = !self.manually_evicted.lock().remove(key);
                if marker_consumed {
                    self.decrement(resource.size_bytes());
                }
                false
            }
        }
    }

    fn on_removed(&self, key: &str, value: &ReliableResource) {
        if self.manually_evicted.lock().remove(key) {
            return;
        }
        self.decrement(value.size_bytes());
    }

    fn decrement(&self, bytes: u64) {
        let _ = self
            .directory_size
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(bytes))
            });
    }
}

impl EntryListener for EvictionListener {
    fn on_entry_event(&self, map: &ResourceMap, event: &EntryEvent) {
        match event {
            EntryEvent::Added { value, .. } => {
                self.directory_size
                    .fetch_add(value.size_bytes(), Ordering::SeqCst);
                self.evict_if_over_limit(map);
            }
            EntryEvent::Removed { key, value } | EntryEvent::Evicted { key, value } => {
                self.on_removed(key, value);
            }
            EntryEvent::Updated { .. } | EntryEvent::Cleared { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::persistence::FilePersistenceStore;
    use crate::metacard::Metacard;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        map: ResourceMap,
        listener: Arc<EvictionListener>,
        manually_evicted: Arc<Mutex<HashSet<String>>>,
        stats: Arc<CacheStats>,
    }

    fn fixture(max_bytes: u64) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let map = ResourceMap::new(FilePersistenceStore::new(temp_dir.path(), "eviction"));
        let manually_evicted = Arc::new(Mutex::new(HashSet::new()));
        let stats = Arc::new(CacheStats::new());
        let listener = Arc::new(EvictionListener::new(
            max_bytes,
            Arc::new(AtomicU64::new(0)),
            manually_evicted.clone(),
            stats.clone(),
        ));
        map.add_entry_listener(listener.clone());
        Fixture {
            temp_dir,
            map,
            listener,
            manually_evicted,
            stats,
        }
    }

    fn resource(dir: &Path, key: &str, size: usize, touched: u64) -> ReliableResource {
        let path = dir.join(key);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        ReliableResource::new(key, path, size as u64, Metacard::new(key, "src"))
            .with_last_touched(touched)
    }

    // =========================================================================
    // Accounting
    // =========================================================================

    #[test]
    fn test_insertion_increments_counter() {
        let f = fixture(0);
        f.map.put(resource(f.temp_dir.path(), "a", 10, 1));
        f.map.put(resource(f.temp_dir.path(), "b", 5, 2));
        assert_eq!(f.listener.directory_size(), 15);
    }

    #[test]
    fn test_external_removal_decrements_counter() {
        let f = fixture(0);
        f.map.put(resource(f.temp_dir.path(), "a", 10, 1));
        f.map.remove("a");
        assert_eq!(f.listener.directory_size(), 0);

        f.map.put(resource(f.temp_dir.path(), "b", 7, 1));
        f.map.evict("b");
        assert_eq!(f.listener.directory_size(), 0);
    }

    #[test]
    fn test_update_does_not_change_counter() {
        let f = fixture(0);
        f.map.put(resource(f.temp_dir.path(), "a", 10, 1));
        f.map.put(resource(f.temp_dir.path(), "a", 10, 2));
        assert_eq!(f.listener.directory_size(), 10);
    }

    #[test]
    fn test_manually_evicted_key_is_not_double_counted() {
        let f = fixture(0);
        f.map.put(resource(f.temp_dir.path(), "a", 10, 1));
        f.manually_evicted.lock().insert("a".to_string());

        f.map.remove("a");
        assert_eq!(f.listener.directory_size(), 10);
        assert!(f.manually_evicted.lock().is_empty());
    }

    #[test]
    fn test_counter_never_underflows() {
        let f = fixture(0);
        f.listener.decrement(100);
        assert_eq!(f.listener.directory_size(), 0);
    }

    // =========================================================================
    // Sweeps
    // =========================================================================

    #[test]
    fn test_zero_budget_disables_eviction() {
        let f = fixture(0);
        for i in 0..5 {
            f.map.put(resource(f.temp_dir.path(), &format!("k{i}"), 100, i));
        }
        assert_eq!(f.map.len(), 5);
    }

    #[test]
    fn test_older_entry_evicted_for_newer() {
        let f = fixture(15);
        let older = resource(f.temp_dir.path(), "older", 10, 1);
        let older_path = older.file_path().to_path_buf();
        f.map.put(older);
        f.map.put(resource(f.temp_dir.path(), "newer", 15, 2));

        assert!(!f.map.contains_key("older"));
        assert!(!older_path.exists());
        assert!(f.map.contains_key("newer"));
        assert_eq!(f.listener.directory_size(), 15);
        assert!(f.manually_evicted.lock().is_empty());
    }

    #[test]
    fn test_single_oversized_entry_is_evicted() {
        let f = fixture(15);
        f.map.put(resource(f.temp_dir.path(), "huge", 20, 1));

        assert!(f.map.is_empty());
        assert_eq!(f.listener.directory_size(), 0);
        assert_eq!(f.stats.snapshot(0, 0, 15).evictions, 1);
    }

    #[test]
    fn test_sweep_spans_multiple_pages() {
        let f = fixture(0);
        for i in 0..25 {
            f.map.put(resource(f.temp_dir.path(), &format!("k{i:02}"), 10, i));
        }
        assert_eq!(f.listener.directory_size(), 250);

        f.listener.set_max_bytes(30);
        let result = f.listener.evict_if_over_limit(&f.map).unwrap();

        assert_eq!(result.entries_evicted, 22);
        assert_eq!(result.bytes_freed, 220);
        assert_eq!(result.size_before, 250);
        assert_eq!(result.size_after, 30);
        let mut remaining: Vec<_> = f.map.values().iter().map(|r| r.key().to_string()).collect();
        remaining.sort();
        assert_eq!(remaining, vec!["k22", "k23", "k24"]);
    }

    #[test]
    fn test_no_sweep_under_limit() {
        let f = fixture(100);
        f.map.put(resource(f.temp_dir.path(), "a", 10, 1));
        assert!(f.listener.evict_if_over_limit(&f.map).is_none());
    }
}
