//! rescache - reliable resource caching engine
//!
//! Streams resources from their origin to a caller while writing them into a
//! local, size-bounded product cache. Later requests for the same resource
//! are served from disk for as long as the cached copy still matches the
//! latest catalog metadata.
//!
//! # Modules
//!
//! - [`metacard`] - catalog metadata records and retrieval requests
//! - [`cache`] - cache keys, the persisted index, staleness checks and eviction
//! - [`transfer`] - the streaming cache writer and origin retrievers
//! - [`config`] - `~/.rescache/config.ini` handling
//! - [`logging`] - tracing subscriber setup
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rescache::cache::{generate_key, CacheConfig, ResourceCache};
//!
//! let cache = Arc::new(ResourceCache::open(CacheConfig::default())?);
//! let key = generate_key(Some(&metacard))?;
//! match cache.get_valid(&key, Some(&metacard))? {
//!     Some(resource) => serve_file(resource.file_path()),
//!     None => start_transfer(&key, &metacard, cache.clone()),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod metacard;
pub mod time;
pub mod transfer;

/// Version of the rescache library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
