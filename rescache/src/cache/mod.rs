//! Reliable, size-bounded product cache.
//!
//! The cache index ([`ResourceCache`]) maps cache keys to descriptors of
//! products stored on disk. Descriptors are written through to a
//! [`FilePersistenceStore`] so the index survives restarts, validated
//! against the latest metacard on every read, and evicted least recently
//! touched first once the configured byte budget is exceeded.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//! ├── products/                     # product bytes, one file per key
//! └── persistence/<store_name>/     # one <key>.cache descriptor per key
//! ```

mod eviction;
mod index;
mod key;
mod map;
mod persistence;
mod resource;
mod stats;
mod types;
mod validator;

pub use eviction::{EvictionListener, EvictionResult, EVICTION_PAGE_SIZE};
pub use index::{CacheIndex, ResourceCache};
pub use key::{decode_filename, encode_filename, generate_key, generate_key_for_request};
pub use map::{EntryEvent, EntryListener, ResourceMap};
pub use persistence::{FilePersistenceStore, PERSISTED_EXTENSION};
pub use resource::{ReliableResource, DEFAULT_MIME_TYPE};
pub use stats::{CacheStatistics, CacheStats};
pub use types::{CacheConfig, CacheError, DEFAULT_MAX_SIZE_BYTES, DEFAULT_STORE_NAME};
pub use validator::is_same;
