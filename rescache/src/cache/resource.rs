//! Cached product descriptor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metacard::Metacard;

/// Default MIME type when the origin does not report one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Descriptor of one cached product on disk.
///
/// Created by the streaming writer when a transfer completes. The cache
/// index refreshes `last_touched_millis` on every put; the eviction listener
/// orders entries by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliableResource {
    key: String,
    file_path: PathBuf,
    size_bytes: u64,
    last_touched_millis: u64,
    metacard: Metacard,
    mime_type: String,
    name: String,
}

impl ReliableResource {
    /// Create a descriptor. `last_touched_millis` starts at 0 until the
    /// resource is put into the cache.
    pub fn new(
        key: impl Into<String>,
        file_path: impl Into<PathBuf>,
        size_bytes: u64,
        metacard: Metacard,
    ) -> Self {
        Self {
            key: key.into(),
            file_path: file_path.into(),
            size_bytes,
            last_touched_millis: 0,
            metacard,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            name: String::new(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_last_touched(mut self, millis: u64) -> Self {
        self.last_touched_millis = millis;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn last_touched_millis(&self) -> u64 {
        self.last_touched_millis
    }

    /// Metadata record as it was when the product was cached.
    pub fn metacard(&self) -> &Metacard {
        &self.metacard
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the resource as accessed at the given time.
    pub fn touch(&mut self, now_millis: u64) {
        self.last_touched_millis = now_millis;
    }

    /// Whether the product file still exists on disk.
    pub fn has_product_file(&self) -> bool {
        self.file_path.is_file()
    }

    /// Delete the product file, logging failures other than "not found".
    pub(crate) fn delete_product_file(&self) {
        match std::fs::remove_file(&self.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                key = %self.key,
                path = %self.file_path.display(),
                error = %e,
                "Failed to delete cached product file"
            ),
        }
    }
}
