//! Bounded in-memory pipe between a transfer and its client.
//!
//! The writer half pushes chunks; the read half is an [`AsyncRead`] handed
//! to the caller. Capacity is counted in chunks, so a slow client applies
//! backpressure to the transfer. Dropping the read half closes the pipe and
//! makes further sends fail.
//!
//! [`AsyncRead`]: tokio::io::AsyncRead

use std::io;

use bytes::Bytes;
use futures::stream;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

use super::retriever::ResourceStream;

/// The client dropped its read half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientClosed;

/// Create a pipe buffering at most `capacity` chunks (minimum 1).
pub fn pipe(capacity: usize) -> (PipeWriter, ResourceStream) {
    let (tx, mut rx) = mpsc::channel::<io::Result<Bytes>>(capacity.max(1));
    let chunks = stream::poll_fn(move |cx| rx.poll_recv(cx));
    (PipeWriter { tx }, Box::pin(StreamReader::new(chunks)))
}

/// Write half of a [`pipe`].
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl PipeWriter {
    /// Deliver a chunk, waiting for buffer space.
    pub async fn send(&self, chunk: Bytes) -> Result<(), ClientClosed> {
        self.tx.send(Ok(chunk)).await.map_err(|_| ClientClosed)
    }

    /// End the stream with an error visible to the client's next read.
    pub async fn fail(self, error: io::Error) {
        let _ = self.tx.send(Err(error)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
