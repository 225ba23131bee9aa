//! Streaming transfers into the resource cache.
//!
//! A transfer reads a resource from its origin once and fans the bytes out
//! to the caller and to the cache's product directory. Stalled or failed
//! reads are retried against a fresh stream from the
//! [`ResourceRetriever`]; a caller that stops reading abandons the fill.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rescache::cache::{CacheConfig, CacheIndex, ResourceCache};
//! use rescache::transfer::{CachedResourceWriter, HttpRetriever, ResourceRetriever, TransferConfig};
//!
//! let cache: Arc<dyn CacheIndex> = Arc::new(ResourceCache::open(CacheConfig::default())?);
//! let retriever = Arc::new(HttpRetriever::new("https://example.com/product.bin")?);
//! let response = retriever.retrieve_resource().await?;
//!
//! let writer = CachedResourceWriter::new(TransferConfig::default());
//! let mut resource = writer.store(key, metacard, response, cache, retriever);
//! let mut stream = resource.input_stream().unwrap();
//! tokio::io::copy(&mut stream, &mut tokio::io::stdout()).await?;
//! ```

mod config;
mod error;
pub mod http;
mod limiter;
mod pipe;
mod resource;
mod retriever;
mod writer;

pub use config::{
    TransferConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_TRANSFERS, DEFAULT_MAX_RETRIES,
    DEFAULT_MONITOR_PERIOD, DEFAULT_RETRY_DELAY, MAX_CHUNK_SIZE,
};
pub use error::{RetrieveError, TransferError};
pub use http::HttpRetriever;
pub use limiter::{TransferLimiter, TransferPermit};
pub use pipe::{pipe, ClientClosed, PipeWriter};
pub use resource::{CachedResource, TransferOutcome, TransferProgress};
pub use retriever::{BoxFuture, ResourceResponse, ResourceRetriever, ResourceStream};
pub use writer::CachedResourceWriter;
