//! The resource cache index.
//!
//! [`ResourceCache`] is the entry point of the cache engine. It tracks
//! in-flight fills in a pending set, validates entries against the latest
//! metacard on every read, and owns the shared counters the
//! [`EvictionListener`] works on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::eviction::{EvictionListener, EvictionResult};
use super::key::{decode_filename, encode_filename};
use super::map::ResourceMap;
use super::persistence::FilePersistenceStore;
use super::resource::ReliableResource;
use super::stats::{CacheStatistics, CacheStats};
use super::types::{CacheConfig, CacheError};
use super::validator::is_same;
use crate::metacard::Metacard;
use crate::time::now_millis;

/// Operations the streaming writer needs from a cache index.
///
/// Implemented by [`ResourceCache`]; tests substitute recording doubles.
pub trait CacheIndex: Send + Sync {
    /// Whether a fill for `key` is in progress.
    fn is_pending(&self, key: &str) -> bool;

    /// Mark `candidate` as being filled.
    ///
    /// Returns false, leaving the pending set untouched, if the key is
    /// already pending or a valid entry already exists for it.
    fn add_pending_cache_entry(&self, candidate: &ReliableResource) -> bool;

    /// Release the pending marker for `key`.
    fn remove_pending_cache_entry(&self, key: &str);

    /// Register a completed product and release its pending marker.
    fn put(&self, resource: ReliableResource) -> Result<(), CacheError>;

    /// Path the product for `key` is written to.
    fn product_path(&self, key: &str) -> PathBuf;
}

/// Disk-backed, size-bounded cache of product descriptors.
pub struct ResourceCache {
    config: CacheConfig,
    map: ResourceMap,
    pending: DashSet<String>,
    directory_size: Arc<AtomicU64>,
    manually_evicted: Arc<Mutex<HashSet<String>>>,
    eviction: Arc<EvictionListener>,
    stats: Arc<CacheStats>,
    /// Last `last_touched_millis` handed out by `put`
    touch_clock: AtomicU64,
}

impl ResourceCache {
    /// Open the cache described by `config`.
    ///
    /// Creates the product and persistence directories if needed, then loads
    /// every persisted descriptor. Descriptors whose product file has gone
    /// missing are dropped. Loading runs through the eviction listener, so a
    /// cache reopened with a smaller budget is trimmed immediately.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        if config.store_name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "store name must not be empty".to_string(),
            ));
        }
        std::fs::create_dir_all(config.product_dir())?;
        std::fs::create_dir_all(config.persistence_dir())?;

        let store = FilePersistenceStore::new(config.persistence_dir(), &config.store_name);
        let map = ResourceMap::new(store);

        let directory_size = Arc::new(AtomicU64::new(0));
        let manually_evicted = Arc::new(Mutex::new(HashSet::new()));
        let stats = Arc::new(CacheStats::new());
        let eviction = Arc::new(EvictionListener::new(
            config.max_size_bytes,
            Arc::clone(&directory_size),
            Arc::clone(&manually_evicted),
            Arc::clone(&stats),
        ));
        map.add_entry_listener(eviction.clone());

        let loaded = map.load_from_store();
        let mut orphaned = 0;
        let mut latest_touch = 0;
        for resource in map.values() {
            if !resource.has_product_file() {
                map.remove(resource.key());
                orphaned += 1;
            } else {
                latest_touch = latest_touch.max(resource.last_touched_millis());
            }
        }

        info!(
            cache_dir = %config.cache_dir.display(),
            store = %config.store_name,
            entries = map.len(),
            loaded,
            orphaned,
            size_bytes = directory_size.load(Ordering::SeqCst),
            max_size_bytes = config.max_size_bytes,
            "Resource cache opened"
        );

        Ok(Self {
            config,
            map,
            pending: DashSet::new(),
            directory_size,
            manually_evicted,
            eviction,
            stats,
            touch_clock: AtomicU64::new(latest_touch),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up `key`, returning the entry only if it is still valid for
    /// `latest`.
    ///
    /// A stale entry (metacard changed, or product file missing) is purged
    /// and reported as not found.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if `key` is empty or `latest`
    /// is `None`.
    pub fn get_valid(
        &self,
        key: &str,
        latest: Option<&Metacard>,
    ) -> Result<Option<ReliableResource>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument(
                "cache key must not be empty".to_string(),
            ));
        }
        let latest = latest
            .ok_or_else(|| CacheError::InvalidArgument("metacard must not be null".to_string()))?;

        let found = self.validate(key, latest);
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(found)
    }

    /// Whether a valid entry exists for `key`. Stale entries are purged.
    pub fn contains_valid(&self, key: &str, latest: Option<&Metacard>) -> bool {
        match latest {
            Some(latest) if !key.is_empty() => self.validate(key, latest).is_some(),
            _ => false,
        }
    }

    fn validate(&self, key: &str, latest: &Metacard) -> Option<ReliableResource> {
        let cached = self.map.get(key)?;

        if !is_same(Some(cached.metacard()), Some(latest)) {
            debug!(key = %key, "Cached metacard is stale, purging entry");
            self.purge(&cached);
            return None;
        }

        if !cached.has_product_file() {
            warn!(
                key = %key,
                path = %cached.file_path().display(),
                "Cached product file missing, removing entry"
            );
            self.map.remove(key);
            self.stats.record_stale_purge();
            return None;
        }

        Some(cached)
    }

    /// Whether `path` is the partial product of an in-flight fill.
    fn is_pending_product(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(decode_filename)
            .is_some_and(|key| self.pending.contains(&key))
    }

    /// Wall-clock milliseconds, bumped past the previous touch so that puts
    /// within the same millisecond still order strictly.
    fn next_touch_millis(&self) -> u64 {
        let now = now_millis();
        match self
            .touch_clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            }) {
            Ok(last) | Err(last) => now.max(last + 1),
        }
    }

    fn purge(&self, resource: &ReliableResource) {
        self.map.remove(resource.key());
        resource.delete_product_file();
        self.stats.record_stale_purge();
    }

    /// Change the size budget and sweep immediately if now over it.
    pub fn set_max_bytes(&self, max_bytes: u64) -> Option<EvictionResult> {
        self.eviction.set_max_bytes(max_bytes);
        self.eviction.evict_if_over_limit(&self.map)
    }

    pub fn max_bytes(&self) -> u64 {
        self.eviction.max_bytes()
    }

    /// Total bytes of products currently tracked.
    pub fn size_bytes(&self) -> u64 {
        self.directory_size.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All entries, most recently touched first.
    pub fn entries(&self) -> Vec<ReliableResource> {
        let mut entries = self.map.values();
        entries.sort_by(|a, b| b.last_touched_millis().cmp(&a.last_touched_millis()));
        entries
    }

    pub fn stats(&self) -> CacheStatistics {
        self.stats.snapshot(
            self.size_bytes(),
            self.map.len() as u64,
            self.max_bytes(),
        )
    }

    /// Remove every entry and product file.
    ///
    /// Pending fills are left alone; they register normally when they
    /// complete. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let count = self.map.len();
        self.map.clear();

        for entry in std::fs::read_dir(self.config.product_dir())? {
            let path = entry?.path();
            if self.is_pending_product(&path) {
                continue;
            }
            if path.is_file() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to delete product file");
                }
            }
        }

        self.manually_evicted.lock().clear();
        self.directory_size.store(0, Ordering::SeqCst);

        info!(entries = count, "Resource cache cleared");
        Ok(count)
    }
}

impl CacheIndex for ResourceCache {
    fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    fn add_pending_cache_entry(&self, candidate: &ReliableResource) -> bool {
        let key = candidate.key();
        if self.pending.contains(key) {
            debug!(key = %key, "Cache entry already pending");
            return false;
        }
        if self.contains_valid(key, Some(candidate.metacard())) {
            debug!(key = %key, "Valid cache entry already exists");
            return false;
        }
        self.pending.insert(key.to_string())
    }

    fn remove_pending_cache_entry(&self, key: &str) {
        if self.pending.remove(key).is_none() {
            debug!(key = %key, "Cache entry was not pending");
        }
    }

    fn put(&self, mut resource: ReliableResource) -> Result<(), CacheError> {
        if resource.key().is_empty() {
            return Err(CacheError::InvalidArgument(
                "cache key must not be empty".to_string(),
            ));
        }

        let key = resource.key().to_string();
        resource.touch(self.next_touch_millis());
        self.map.put(resource);
        self.stats.record_put();
        self.pending.remove(&key);

        debug!(key = %key, size_bytes = self.size_bytes(), "Cache entry stored");
        Ok(())
    }

    fn product_path(&self, key: &str) -> PathBuf {
        self.config.product_dir().join(encode_filename(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metacard::attribute;
    use tempfile::TempDir;

    fn open_cache(temp_dir: &TempDir, max_bytes: u64) -> ResourceCache {
        ResourceCache::open(CacheConfig::new(temp_dir.path()).with_max_size(max_bytes)).unwrap()
    }

    fn metacard(id: &str) -> Metacard {
        Metacard::new(id, "src").with_attribute(attribute::CHECKSUM, "abc")
    }

    /// Write a product file of `size` bytes and describe it.
    fn product(cache: &ResourceCache, id: &str, size: usize) -> ReliableResource {
        let key = format!("src-{id}");
        let path = cache.product_path(&key);
        std::fs::write(&path, vec![7u8; size]).unwrap();
        ReliableResource::new(key, path, size as u64, metacard(id))
    }

    // =========================================================================
    // Pending set
    // =========================================================================

    #[test]
    fn test_add_and_remove_pending() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let candidate = product(&cache, "1", 10);

        assert!(cache.add_pending_cache_entry(&candidate));
        assert!(cache.is_pending("src-1"));
        assert!(!cache.add_pending_cache_entry(&candidate));

        cache.remove_pending_cache_entry("src-1");
        assert!(!cache.is_pending("src-1"));
        cache.remove_pending_cache_entry("src-1");
    }

    #[test]
    fn test_add_pending_skips_valid_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);
        cache.put(resource.clone()).unwrap();

        assert!(!cache.add_pending_cache_entry(&resource));
        assert!(!cache.is_pending("src-1"));
    }

    #[test]
    fn test_put_clears_pending_and_is_retrievable() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);

        assert!(cache.add_pending_cache_entry(&resource));
        cache.put(resource.clone()).unwrap();

        assert!(!cache.is_pending("src-1"));
        let found = cache
            .get_valid("src-1", Some(resource.metacard()))
            .unwrap()
            .unwrap();
        assert_eq!(found.key(), "src-1");
        assert!(found.last_touched_millis() > 0);
        assert_eq!(cache.size_bytes(), 10);
    }

    #[test]
    fn test_put_rejects_empty_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = ReliableResource::new("", "/tmp/x", 1, metacard("1"));
        assert!(matches!(
            cache.put(resource),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_get_valid_invalid_arguments() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);

        assert!(matches!(
            cache.get_valid("", Some(&metacard("1"))),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.get_valid("src-1", None),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(!cache.contains_valid("", Some(&metacard("1"))));
        assert!(!cache.contains_valid("src-1", None));
    }

    #[test]
    fn test_get_valid_missing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        assert!(cache.get_valid("src-1", Some(&metacard("1"))).unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_stale_entry_is_purged() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);
        let path = resource.file_path().to_path_buf();
        cache.put(resource).unwrap();

        let changed = Metacard::new("1", "src").with_attribute(attribute::CHECKSUM, "def");
        assert!(cache.get_valid("src-1", Some(&changed)).unwrap().is_none());

        assert!(!path.exists());
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
        assert_eq!(cache.stats().stale_purges, 1);
    }

    #[test]
    fn test_missing_product_file_removes_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);
        std::fs::remove_file(resource.file_path()).unwrap();
        let latest = resource.metacard().clone();
        cache.put(resource).unwrap();

        assert!(!cache.contains_valid("src-1", Some(&latest)));
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_resource_size_change_is_still_valid() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);
        cache.put(resource).unwrap();

        let enriched = metacard("1").with_attribute(attribute::RESOURCE_SIZE, 10i64);
        assert!(cache.contains_valid("src-1", Some(&enriched)));
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    #[test]
    fn test_older_entry_evicted_when_over_budget() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 15);
        let small = product(&cache, "small", 10);
        let small_path = small.file_path().to_path_buf();
        let large = product(&cache, "large", 15);

        cache.put(small.clone()).unwrap();
        cache.put(large.clone()).unwrap();

        assert!(!small_path.exists());
        assert!(cache
            .get_valid("src-small", Some(small.metacard()))
            .unwrap()
            .is_none());
        assert!(cache.contains_valid("src-large", Some(large.metacard())));
        assert_eq!(cache.size_bytes(), 15);
    }

    #[test]
    fn test_most_recent_entry_survives() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 25);

        for id in ["a", "b", "c", "d"] {
            cache.put(product(&cache, id, 10)).unwrap();
        }

        let keys: Vec<_> = cache.entries().iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["src-d", "src-c"]);
        assert!(cache.size_bytes() <= 25);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_back_to_back_puts_evict_the_older_entry() {
        for _ in 0..50 {
            let temp_dir = TempDir::new().unwrap();
            let cache = open_cache(&temp_dir, 15);
            let small = product(&cache, "small", 10);
            let large = product(&cache, "large", 15);

            cache.put(small).unwrap();
            cache.put(large.clone()).unwrap();

            let keys: Vec<_> = cache.entries().iter().map(|r| r.key().to_string()).collect();
            assert_eq!(keys, vec!["src-large"]);
            assert_eq!(cache.size_bytes(), 15);
        }
    }

    #[test]
    fn test_put_touch_times_strictly_increase() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        for id in ["a", "b", "c"] {
            cache.put(product(&cache, id, 1)).unwrap();
        }

        let times: Vec<_> = ["src-a", "src-b", "src-c"]
            .iter()
            .map(|key| cache.map.get(key).unwrap().last_touched_millis())
            .collect();
        assert!(times[0] < times[1] && times[1] < times[2]);
    }

    #[test]
    fn test_reopened_cache_touches_after_persisted_entries() {
        let temp_dir = TempDir::new().unwrap();
        let future = crate::time::now_millis() + 60_000;
        {
            let cache = open_cache(&temp_dir, 0);
            cache.map.put(product(&cache, "old", 1).with_last_touched(future));
        }

        let cache = open_cache(&temp_dir, 0);
        cache.put(product(&cache, "new", 1)).unwrap();
        let keys: Vec<_> = cache.entries().iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["src-new", "src-old"]);
    }

    #[test]
    fn test_oversized_entry_leaves_cache_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 15);
        let huge = product(&cache, "huge", 20);
        let path = huge.file_path().to_path_buf();

        cache.put(huge).unwrap();

        assert!(cache.is_empty());
        assert!(!path.exists());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_set_max_bytes_sweeps_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        for id in ["a", "b", "c"] {
            cache.put(product(&cache, id, 10)).unwrap();
        }

        let result = cache.set_max_bytes(10).unwrap();
        assert_eq!(result.entries_evicted, 2);
        assert_eq!(cache.max_bytes(), 10);
        assert_eq!(cache.len(), 1);
        assert!(cache.set_max_bytes(100).is_none());
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[test]
    fn test_reopen_rehydrates_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = open_cache(&temp_dir, 0);
            cache.put(product(&cache, "1", 10)).unwrap();
            cache.put(product(&cache, "2", 20)).unwrap();
        }

        let cache = open_cache(&temp_dir, 0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size_bytes(), 30);
        assert!(cache.contains_valid("src-2", Some(&metacard("2"))));
    }

    #[test]
    fn test_nan_attribute_entry_stays_valid_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let card = metacard("1").with_attribute("score", f64::NAN);
        {
            let cache = open_cache(&temp_dir, 0);
            let resource = product(&cache, "1", 10);
            let path = resource.file_path().to_path_buf();
            cache
                .put(ReliableResource::new("src-1", path, 10, card.clone()))
                .unwrap();
            assert!(cache.get_valid("src-1", Some(&card)).unwrap().is_some());
        }

        let cache = open_cache(&temp_dir, 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_valid("src-1", Some(&card)).unwrap().is_some());
    }

    #[test]
    fn test_clear_keeps_partial_files_of_pending_fills() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let cached = product(&cache, "done", 10);
        let cached_path = cached.file_path().to_path_buf();
        cache.put(cached).unwrap();

        let in_flight = product(&cache, "filling", 4);
        assert!(cache.add_pending_cache_entry(&in_flight));

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(!cached_path.exists());
        assert!(in_flight.file_path().exists());
        assert!(cache.is_pending("src-filling"));

        let size = in_flight.size_bytes();
        cache.put(in_flight.clone()).unwrap();
        assert!(cache
            .get_valid("src-filling", Some(in_flight.metacard()))
            .unwrap()
            .is_some());
        assert_eq!(cache.size_bytes(), size);
    }

    #[test]
    fn test_reopen_drops_orphaned_descriptors() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = open_cache(&temp_dir, 0);
            let resource = product(&cache, "1", 10);
            std::fs::remove_file(resource.file_path()).unwrap();
            cache.put(resource).unwrap();
        }

        let cache = open_cache(&temp_dir, 0);
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 0);
        let resource = product(&cache, "1", 10);
        let path = resource.file_path().to_path_buf();
        cache.put(resource).unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.is_empty());
        assert!(!path.exists());
        assert_eq!(cache.size_bytes(), 0);

        drop(cache);
        assert!(open_cache(&temp_dir, 0).is_empty());
    }

    #[test]
    fn test_open_rejects_empty_store_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::new(temp_dir.path()).with_store_name("");
        assert!(matches!(
            ResourceCache::open(config),
            Err(CacheError::InvalidArgument(_))
        ));
    }
}
