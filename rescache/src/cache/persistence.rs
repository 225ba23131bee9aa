//! File-backed persistence store for cache descriptors.
//!
//! Each entry is serialized to its own file beneath a directory scoped by a
//! store name:
//!
//! ```text
//! {root}/{store_name}/{encoded_key}.cache
//! ```
//!
//! The store is a best-effort write-through backing store. Write and delete
//! failures are logged and swallowed: losing a persisted entry only forces a
//! product to be cached again.

use std::collections::{HashMap, HashSet};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::key::{decode_filename, encode_filename};

/// File extension of persisted entries.
pub const PERSISTED_EXTENSION: &str = "cache";

/// Durable per-entry store of serialized values keyed by cache key.
#[derive(Debug)]
pub struct FilePersistenceStore<V> {
    directory: PathBuf,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for FilePersistenceStore<V> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> FilePersistenceStore<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Create a store rooted at `root/store_name`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: impl AsRef<Path>, store_name: &str) -> Self {
        Self {
            directory: root.as_ref().join(store_name),
            _value: PhantomData,
        }
    }

    /// Directory holding this store's entries.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Persist a value, replacing any existing entry for the key.
    pub fn store(&self, key: &str, value: &V) {
        if let Err(e) = self.try_store(key, value) {
            warn!(key = %key, error = %e, "Failed to persist cache entry");
        }
    }

    /// Persist every entry of the map.
    pub fn store_all(&self, entries: &HashMap<String, V>) {
        for (key, value) in entries {
            self.store(key, value);
        }
    }

    /// Delete the persisted entry for a key. Missing entries are ignored.
    pub fn delete(&self, key: &str) {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(key = %key, "Deleted persisted cache entry"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                key = %key,
                path = %path.display(),
                error = %e,
                "Failed to delete persisted cache entry"
            ),
        }
    }

    /// Delete the persisted entries for all keys.
    pub fn delete_all<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.delete(key);
        }
    }

    /// Single-entry load is intentionally unsupported.
    ///
    /// The in-memory index is populated from live traffic and from
    /// [`load_all`](Self::load_all) at start-up; reading the filesystem on
    /// every index miss is avoided. Always returns `None`.
    pub fn load(&self, _key: &str) -> Option<V> {
        None
    }

    /// Load the values for the given keys.
    ///
    /// Entries that are missing or cannot be decoded are skipped.
    pub fn load_all(&self, keys: &HashSet<String>) -> HashMap<String, V> {
        let mut loaded = HashMap::with_capacity(keys.len());

        for key in keys {
            let path = self.entry_path(key);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(key = %key, error = %e, "Persisted cache entry unreadable");
                    continue;
                }
            };

            match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    loaded.insert(key.clone(), value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping corrupt persisted cache entry");
                }
            }
        }

        loaded
    }

    /// Enumerate the keys of all persisted entries.
    ///
    /// Returns an empty set if the directory does not exist or is empty.
    pub fn load_all_keys(&self) -> HashSet<String> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(_) => return HashSet::new(),
        };

        entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let filename = entry.file_name();
                let stem = filename
                    .to_str()?
                    .strip_suffix(PERSISTED_EXTENSION)?
                    .strip_suffix('.')?;
                decode_filename(stem)
            })
            .collect()
    }

    /// Delete every persisted entry.
    pub fn clear(&self) {
        let keys = self.load_all_keys();
        self.delete_all(keys.iter().map(String::as_str));
    }

    fn try_store(&self, key: &str, value: &V) -> Result<(), io::Error> {
        std::fs::create_dir_all(&self.directory)?;

        let bytes = serde_json::to_vec(value).map_err(io::Error::other)?;
        let path = self.entry_path(key);

        // Write via temp file so a crash never leaves a truncated entry
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &bytes)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", encode_filename(key), PERSISTED_EXTENSION))
    }
}
