//! Streaming cache writer.
//!
//! [`CachedResourceWriter::store`] copies a resource from its origin to the
//! caller and to the product cache at the same time. Each chunk read from the
//! source is written to the product file and then to the client pipe before
//! the next chunk is read.
//!
//! # Attempt lifecycle
//!
//! ```text
//! Retrieving ──► Streaming ──┬──► Completed   (product registered)
//!     ▲                      ├──► Cancelled   (client closed its stream)
//!     │                      └──► Retrying ───┐
//!     └───────────────────────────────────────┘ until retries run out ──► Aborted
//! ```
//!
//! A source read that yields no data for longer than the monitor period, or
//! fails with an I/O error, is recoverable: the partial file is discarded, a fresh stream
//! is requested from the retriever, and streaming restarts from byte 0. The
//! client only receives the bytes past those it already has.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::config::TransferConfig;
use super::error::TransferError;
use super::limiter::TransferLimiter;
use super::pipe::{pipe, PipeWriter};
use super::resource::{CachedResource, TransferOutcome, TransferProgress};
use super::retriever::{ResourceResponse, ResourceRetriever, ResourceStream};
use crate::cache::{CacheIndex, ReliableResource};
use crate::metacard::Metacard;

/// Chunks buffered between the transfer and its client.
const PIPE_CAPACITY_CHUNKS: usize = 1;

/// Writes retrieved resources into the cache while streaming them out.
pub struct CachedResourceWriter {
    config: TransferConfig,
    limiter: Arc<TransferLimiter>,
}

impl CachedResourceWriter {
    pub fn new(config: TransferConfig) -> Self {
        let limiter = Arc::new(TransferLimiter::new(config.max_concurrent_transfers));
        Self { config, limiter }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn limiter(&self) -> &TransferLimiter {
        &self.limiter
    }

    /// Start streaming `response` to the caller and into the cache.
    ///
    /// The transfer runs on a spawned task, so this must be called from
    /// within a Tokio runtime. If another fill already owns `key`, or a valid
    /// entry already exists, the resource is streamed to the caller without
    /// being cached.
    pub fn store(
        &self,
        key: impl Into<String>,
        metacard: Metacard,
        response: ResourceResponse,
        index: Arc<dyn CacheIndex>,
        retriever: Arc<dyn ResourceRetriever>,
    ) -> CachedResource {
        let key = key.into();
        let file_path = index.product_path(&key);

        let candidate = ReliableResource::new(key.as_str(), file_path.as_path(), 0, metacard.clone());
        let caching = index.add_pending_cache_entry(&candidate);
        if !caching {
            debug!(key = %key, "Cache fill not owned, streaming without caching");
        }

        let (pipe_writer, input_stream) = pipe(PIPE_CAPACITY_CHUNKS);
        let progress = Arc::new(TransferProgress::default());

        let transfer = Transfer {
            key: key.clone(),
            metacard,
            file_path: file_path.clone(),
            name: response.name,
            mime_type: response.mime_type,
            caching,
            delivered: 0,
            config: self.config.clone(),
            pipe: pipe_writer,
            index,
            retriever,
            progress: Arc::clone(&progress),
        };

        let limiter = Arc::clone(&self.limiter);
        let initial = response.stream;
        let handle = tokio::spawn(async move {
            let _permit = limiter.acquire().await;
            transfer.run(initial).await
        });

        CachedResource::new(key, file_path, caching, input_stream, progress, handle)
    }
}

/// How one streaming attempt ended, short of a recoverable failure.
enum Streamed {
    Finished { size_bytes: u64 },
    ClientClosed,
}

/// State owned by one transfer task.
struct Transfer {
    key: String,
    metacard: Metacard,
    file_path: PathBuf,
    name: String,
    mime_type: String,
    /// Whether bytes are still being written to the product file
    caching: bool,
    /// Bytes already handed to the client across all attempts
    delivered: u64,
    config: TransferConfig,
    pipe: PipeWriter,
    index: Arc<dyn CacheIndex>,
    retriever: Arc<dyn ResourceRetriever>,
    progress: Arc<TransferProgress>,
}

impl Transfer {
    async fn run(mut self, initial: ResourceStream) -> Result<TransferOutcome, TransferError> {
        let mut next_stream = Some(initial);
        let mut retries = 0u32;

        loop {
            let attempt = self.progress.begin_attempt();

            let stream = match next_stream.take() {
                Some(stream) => Ok(stream),
                None => {
                    let retrieved = self.retriever.retrieve_resource().await;
                    match retrieved {
                        Ok(response) => {
                            self.name = response.name;
                            self.mime_type = response.mime_type;
                            Ok(response.stream)
                        }
                        Err(e) if e.is_retryable() => Err(e.to_string()),
                        Err(e) => {
                            warn!(key = %self.key, attempt, error = %e, "Resource retrieval failed");
                            return Err(self.abort(TransferError::Retrieve(e)).await);
                        }
                    }
                }
            };

            let result = match stream {
                Ok(stream) => self.stream_attempt(stream).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(Streamed::Finished { size_bytes }) => return self.complete(size_bytes).await,
                Ok(Streamed::ClientClosed) => return Ok(self.cancel().await),
                Err(last_error) => {
                    if retries >= self.config.max_retries {
                        warn!(
                            key = %self.key,
                            attempts = attempt,
                            error = %last_error,
                            "Transfer retries exhausted"
                        );
                        let error = TransferError::RetriesExhausted {
                            key: self.key.clone(),
                            attempts: attempt,
                            last_error,
                        };
                        return Err(self.abort(error).await);
                    }

                    retries += 1;
                    warn!(
                        key = %self.key,
                        attempt,
                        retry = retries,
                        max_retries = self.config.max_retries,
                        delivered = self.delivered,
                        error = %last_error,
                        "Transfer interrupted, retrying"
                    );
                    self.discard_partial_file().await;
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    /// Copy one source stream to the file and the pipe.
    ///
    /// `Err` carries the message of a recoverable source failure.
    async fn stream_attempt(&mut self, mut source: ResourceStream) -> Result<Streamed, String> {
        let mut file = self.create_file().await;
        let mut buf = vec![0u8; self.config.chunk_size];
        let mut offset = 0u64;

        loop {
            let n = match read_chunk(&mut source, &mut buf, self.config.monitor_period).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return Err(e.to_string()),
            };
            let chunk = &buf[..n];

            if let Some(f) = file.as_mut() {
                if let Err(e) = f.write_all(chunk).await {
                    file = None;
                    self.stop_caching(&e).await;
                }
            }

            let end = offset + n as u64;
            if end > self.delivered {
                let fresh = (self.delivered - offset) as usize;
                if self
                    .pipe
                    .send(Bytes::copy_from_slice(&chunk[fresh..]))
                    .await
                    .is_err()
                {
                    return Ok(Streamed::ClientClosed);
                }
                self.delivered = end;
                self.progress.set_bytes_transferred(end);
            }
            offset = end;
        }

        if let Some(mut f) = file {
            if let Err(e) = f.flush().await {
                self.stop_caching(&e).await;
            }
        }

        Ok(Streamed::Finished { size_bytes: offset })
    }

    /// Open the product file for a fresh attempt, if still caching.
    async fn create_file(&mut self) -> Option<File> {
        if !self.caching {
            return None;
        }
        match File::create(&self.file_path).await {
            Ok(file) => Some(file),
            Err(e) => {
                self.stop_caching(&e).await;
                None
            }
        }
    }

    /// Keep streaming to the client but give up on caching this resource.
    async fn stop_caching(&mut self, error: &std::io::Error) {
        warn!(
            key = %self.key,
            path = %self.file_path.display(),
            error = %error,
            "Product file write failed, continuing without caching"
        );
        self.discard_partial_file().await;
        self.caching = false;
        self.index.remove_pending_cache_entry(&self.key);
    }

    async fn discard_partial_file(&self) {
        if !self.caching {
            return;
        }
        match tokio::fs::remove_file(&self.file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                key = %self.key,
                path = %self.file_path.display(),
                error = %e,
                "Failed to delete partial product file"
            ),
        }
    }

    async fn complete(self, size_bytes: u64) -> Result<TransferOutcome, TransferError> {
        if !self.caching {
            info!(key = %self.key, bytes = size_bytes, "Transfer streamed without caching");
            return Ok(TransferOutcome::Streamed { bytes: size_bytes });
        }

        let resource = ReliableResource::new(
            self.key.as_str(),
            self.file_path.as_path(),
            size_bytes,
            self.metacard.clone(),
        )
        .with_mime_type(self.mime_type.as_str())
        .with_name(self.name.as_str());

        let index = Arc::clone(&self.index);
        let registered = resource.clone();
        let put = tokio::task::spawn_blocking(move || index.put(registered))
            .await
            .map_err(|e| TransferError::TaskPanicked(e.to_string()))?;

        if let Err(e) = put {
            warn!(key = %self.key, error = %e, "Failed to register cached product");
            self.discard_partial_file().await;
            self.index.remove_pending_cache_entry(&self.key);
            return Err(TransferError::Cache(e));
        }

        self.progress.mark_complete();
        info!(
            key = %self.key,
            bytes = size_bytes,
            attempts = self.progress.attempts(),
            "Transfer complete, product cached"
        );
        Ok(TransferOutcome::Completed(resource))
    }

    async fn cancel(self) -> TransferOutcome {
        info!(
            key = %self.key,
            bytes_delivered = self.delivered,
            "Client closed stream, abandoning transfer"
        );
        self.discard_partial_file().await;
        if self.caching {
            self.index.remove_pending_cache_entry(&self.key);
        }
        TransferOutcome::Cancelled {
            bytes_delivered: self.delivered,
        }
    }

    async fn abort(self, error: TransferError) -> TransferError {
        self.discard_partial_file().await;
        if self.caching {
            self.index.remove_pending_cache_entry(&self.key);
        }
        self.pipe.fail(std::io::Error::other(error.to_string())).await;
        error
    }
}

/// Fill `buf` from `source`, stopping early only at end of stream.
///
/// Every individual read must yield data within `monitor_period`; a source
/// that trickles bytes slower than the chunk fills is not a stall.
async fn read_chunk(
    source: &mut ResourceStream,
    buf: &mut [u8],
    monitor_period: Duration,
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = tokio::time::timeout(monitor_period, source.read(&mut buf[filled..]))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no data received within {}ms", monitor_period.as_millis()),
                )
            })??;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
