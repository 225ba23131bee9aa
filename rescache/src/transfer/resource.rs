//! Caller-facing handle of an in-progress transfer.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::error::TransferError;
use super::retriever::ResourceStream;
use crate::cache::ReliableResource;

/// How a transfer ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Every byte was delivered and the product registered with the cache.
    Completed(ReliableResource),
    /// Every byte was delivered without caching (another fill owned the key,
    /// or the product file could not be written).
    Streamed { bytes: u64 },
    /// The client closed its stream first. Nothing was cached.
    Cancelled { bytes_delivered: u64 },
}

/// Live counters shared between a transfer task and its handle.
#[derive(Debug, Default)]
pub struct TransferProgress {
    bytes_transferred: AtomicU64,
    attempts: AtomicU32,
    complete: AtomicBool,
}

impl TransferProgress {
    pub(crate) fn begin_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn set_bytes_transferred(&self, bytes: u64) {
        self.bytes_transferred.store(bytes, Ordering::SeqCst);
    }

    pub(crate) fn mark_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }

    /// Bytes delivered to the client so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::SeqCst)
    }

    /// Attempts started, including the initial one.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether the product has been written and registered.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }
}

/// A resource being streamed to the caller and, in parallel, into the cache.
///
/// Bytes can be read from [`input_stream`](Self::input_stream) as soon as
/// they arrive. Dropping that stream before the end cancels the transfer.
pub struct CachedResource {
    key: String,
    file_path: PathBuf,
    caching: bool,
    input_stream: Option<ResourceStream>,
    progress: Arc<TransferProgress>,
    handle: JoinHandle<Result<TransferOutcome, TransferError>>,
}

impl CachedResource {
    pub(crate) fn new(
        key: String,
        file_path: PathBuf,
        caching: bool,
        input_stream: ResourceStream,
        progress: Arc<TransferProgress>,
        handle: JoinHandle<Result<TransferOutcome, TransferError>>,
    ) -> Self {
        Self {
            key,
            file_path,
            caching,
            input_stream: Some(input_stream),
            progress,
            handle,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path the product is cached at.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Whether this transfer owns the cache fill for its key.
    pub fn is_caching(&self) -> bool {
        self.caching
    }

    /// Take the client stream. Returns `None` once taken.
    pub fn input_stream(&mut self) -> Option<ResourceStream> {
        self.input_stream.take()
    }

    /// Whether the complete product is available on disk.
    pub fn has_product(&self) -> bool {
        self.progress.is_complete() && self.file_path.is_file()
    }

    /// Read the cached product into memory.
    ///
    /// Fails with [`io::ErrorKind::NotFound`] until the product is complete.
    pub async fn product_bytes(&self) -> io::Result<Vec<u8>> {
        if !self.has_product() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("product for {} is not cached", self.key),
            ));
        }
        tokio::fs::read(&self.file_path).await
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.progress.bytes_transferred()
    }

    pub fn attempts(&self) -> u32 {
        self.progress.attempts()
    }

    /// Wait for the transfer to finish.
    ///
    /// A client stream that was never taken is drained so the transfer can
    /// run to completion. Read errors while draining are ignored; the task
    /// result carries the cause.
    pub async fn wait(mut self) -> Result<TransferOutcome, TransferError> {
        if let Some(mut stream) = self.input_stream.take() {
            let _ = tokio::io::copy(&mut stream, &mut tokio::io::sink()).await;
        }
        self.handle
            .await
            .map_err(|e| TransferError::TaskPanicked(e.to_string()))?
    }
}

impl std::fmt::Debug for CachedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResource")
            .field("key", &self.key)
            .field("file_path", &self.file_path)
            .field("caching", &self.caching)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
