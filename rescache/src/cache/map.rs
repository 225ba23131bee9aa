//! Observable in-memory resource map with write-through persistence.
//!
//! The map is the index beneath [`ResourceCache`](super::ResourceCache).
//! Every mutation is written through to a [`FilePersistenceStore`] and then
//! announced to registered [`EntryListener`]s as an [`EntryEvent`].
//!
//! Listeners are invoked synchronously on the mutating thread, after the map
//! shard lock has been released, so a listener may itself mutate the map.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::persistence::FilePersistenceStore;
use super::resource::ReliableResource;

/// A change to the resource map.
#[derive(Debug, Clone)]
pub enum EntryEvent {
    /// A new key was inserted.
    Added { key: String, value: ReliableResource },
    /// An existing key was overwritten.
    Updated {
        key: String,
        old: ReliableResource,
        value: ReliableResource,
    },
    /// A key was deleted from the map and its backing store.
    Removed { key: String, value: ReliableResource },
    /// A key was dropped from memory by the store; its persisted copy remains.
    Evicted { key: String, value: ReliableResource },
    /// The whole map was cleared.
    Cleared { count: usize },
}

/// Observer of resource map changes.
pub trait EntryListener: Send + Sync {
    fn on_entry_event(&self, map: &ResourceMap, event: &EntryEvent);
}

/// Concurrent key → descriptor map with change notifications.
pub struct ResourceMap {
    entries: DashMap<String, ReliableResource>,
    store: FilePersistenceStore<ReliableResource>,
    listeners: RwLock<Vec<Arc<dyn EntryListener>>>,
}

impl ResourceMap {
    /// Create an empty map backed by the given store.
    pub fn new(store: FilePersistenceStore<ReliableResource>) -> Self {
        Self {
            entries: DashMap::new(),
            store,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for subsequent events.
    pub fn add_entry_listener(&self, listener: Arc<dyn EntryListener>) {
        self.listeners.write().push(listener);
    }

    /// Populate the map from the persistence store.
    ///
    /// Loaded entries are announced as [`EntryEvent::Added`] so listeners
    /// start from a consistent view. Returns the number of entries loaded.
    pub fn load_from_store(&self) -> usize {
        let keys = self.store.load_all_keys();
        let loaded = self.store.load_all(&keys);
        let count = loaded.len();

        for (key, value) in loaded {
            self.entries.insert(key.clone(), value.clone());
            self.dispatch(EntryEvent::Added { key, value });
        }

        debug!(
            entries = count,
            dir = %self.store.directory().display(),
            "Resource map loaded from persistence store"
        );
        count
    }

    pub fn get(&self, key: &str) -> Option<ReliableResource> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a descriptor, persisting it and notifying listeners.
    pub fn put(&self, value: ReliableResource) {
        let key = value.key().to_string();
        self.store.store(&key, &value);

        let event = match self.entries.insert(key.clone(), value.clone()) {
            Some(old) => EntryEvent::Updated { key, old, value },
            None => EntryEvent::Added { key, value },
        };
        self.dispatch(event);
    }

    /// Remove a descriptor from memory and from the store.
    pub fn remove(&self, key: &str) -> Option<ReliableResource> {
        let (key, value) = self.entries.remove(key)?;
        self.store.delete(&key);
        self.dispatch(EntryEvent::Removed {
            key,
            value: value.clone(),
        });
        Some(value)
    }

    /// Drop a descriptor from memory only, keeping its persisted copy.
    pub fn evict(&self, key: &str) -> Option<ReliableResource> {
        let (key, value) = self.entries.remove(key)?;
        self.dispatch(EntryEvent::Evicted {
            key,
            value: value.clone(),
        });
        Some(value)
    }

    /// Remove every descriptor from memory and from the store.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        self.store.clear();
        self.dispatch(EntryEvent::Cleared { count });
    }

    /// Snapshot of all descriptors, in no particular order.
    pub fn values(&self) -> Vec<ReliableResource> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Up to `limit` descriptors with the oldest `last_touched_millis`.
    ///
    /// Ties are broken by key so the order is stable across calls.
    pub fn oldest(&self, limit: usize) -> Vec<ReliableResource> {
        let mut values = self.values();
        values.sort_by(|a, b| {
            a.last_touched_millis()
                .cmp(&b.last_touched_millis())
                .then_with(|| a.key().cmp(b.key()))
        });
        values.truncate(limit);
        values
    }

    fn dispatch(&self, event: EntryEvent) {
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        for listener in listeners {
            listener.on_entry_event(self, &event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metacard::Metacard;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// Records every event it sees.
    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<EntryEvent>>,
    }

    impl EntryListener for RecordingListener {
        fn on_entry_event(&self, _map: &ResourceMap, event: &EntryEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn resource(key: &str, touched: u64) -> ReliableResource {
        ReliableResource::new(key, format!("/tmp/{key}"), 10, Metacard::new(key, "src"))
            .with_last_touched(touched)
    }

    fn create_map() -> (TempDir, ResourceMap, Arc<RecordingListener>) {
        let temp_dir = TempDir::new().unwrap();
        let map = ResourceMap::new(FilePersistenceStore::new(temp_dir.path(), "map"));
        let listener = Arc::new(RecordingListener::default());
        map.add_entry_listener(listener.clone());
        (temp_dir, map, listener)
    }

    #[test]
    fn test_put_emits_added_then_updated() {
        let (_temp_dir, map, listener) = create_map();
        map.put(resource("a", 1));
        map.put(resource("a", 2));

        let events = listener.events.lock();
        assert!(matches!(&events[0], EntryEvent::Added { key, .. } if key == "a"));
        assert!(matches!(
            &events[1],
            EntryEvent::Updated { old, value, .. }
                if old.last_touched_millis() == 1 && value.last_touched_millis() == 2
        ));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_deletes_persisted_copy() {
        let (temp_dir, map, listener) = create_map();
        map.put(resource("a", 1));
        assert!(temp_dir.path().join("map/a.cache").exists());

        let removed = map.remove("a");
        assert!(removed.is_some());
        assert!(!temp_dir.path().join("map/a.cache").exists());
        assert!(map.remove("a").is_none());

        let events = listener.events.lock();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], EntryEvent::Removed { key, .. } if key == "a"));
    }

    #[test]
    fn test_evict_keeps_persisted_copy() {
        let (temp_dir, map, listener) = create_map();
        map.put(resource("a", 1));

        map.evict("a");
        assert!(!map.contains_key("a"));
        assert!(temp_dir.path().join("map/a.cache").exists());
        assert!(matches!(
            listener.events.lock().last(),
            Some(EntryEvent::Evicted { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let (_temp_dir, map, listener) = create_map();
        map.put(resource("a", 1));
        map.put(resource("b", 1));

        map.clear();
        assert!(map.is_empty());
        assert!(matches!(
            listener.events.lock().last(),
            Some(EntryEvent::Cleared { count: 2 })
        ));
    }

    #[test]
    fn test_oldest() {
        let (_temp_dir, map, _listener) = create_map();
        for (key, touched) in [("c", 30), ("a", 10), ("d", 40), ("b", 20)] {
            map.put(resource(key, touched));
        }

        let keys: Vec<_> = map.oldest(2).iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.oldest(10).len(), 4);
    }

    #[test]
    fn test_oldest_breaks_ties_by_key() {
        let (_temp_dir, map, _listener) = create_map();
        for key in ["z", "m", "a"] {
            map.put(resource(key, 5));
        }

        for _ in 0..10 {
            let keys: Vec<_> = map.oldest(3).iter().map(|r| r.key().to_string()).collect();
            assert_eq!(keys, vec!["a", "m", "z"]);
        }
    }

    #[test]
    fn test_load_from_store_announces_entries() {
        let temp_dir = TempDir::new().unwrap();
        {
            let map = ResourceMap::new(FilePersistenceStore::new(temp_dir.path(), "map"));
            map.put(resource("a", 1));
            map.put(resource("b", 2));
        }

        let map = ResourceMap::new(FilePersistenceStore::new(temp_dir.path(), "map"));
        let listener = Arc::new(RecordingListener::default());
        map.add_entry_listener(listener.clone());

        assert_eq!(map.load_from_store(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(listener.events.lock().len(), 2);
        assert_eq!(map.get("b").unwrap().last_touched_millis(), 2);
    }

    #[test]
    fn test_listener_may_mutate_map() {
        struct RemoveOnAdd;
        impl EntryListener for RemoveOnAdd {
            fn on_entry_event(&self, map: &ResourceMap, event: &EntryEvent) {
                if let EntryEvent::Added { key, .. } = event {
                    map.remove(key);
                }
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let map = ResourceMap::new(FilePersistenceStore::new(temp_dir.path(), "map"));
        map.add_entry_listener(Arc::new(RemoveOnAdd));

        map.put(resource("a", 1));
        assert!(map.is_empty());
    }
}
