//! Transfer error types.

use std::io;

use thiserror::Error;

use crate::cache::CacheError;

/// Failure obtaining a byte stream from a resource's origin.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Local or transport I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Origin answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Request could not be sent or completed
    #[error("request failed: {0}")]
    Request(String),
}

impl RetrieveError {
    /// Whether asking the origin again may succeed.
    ///
    /// Client errors other than timeouts and rate limiting are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Request(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
        }
    }
}

/// Terminal failure of a streaming cache transfer.
///
/// Client cancellation is not an error; it is reported as
/// [`TransferOutcome::Cancelled`](super::TransferOutcome::Cancelled).
#[derive(Debug, Error)]
pub enum TransferError {
    /// Origin refused the resource with a non-retryable error
    #[error("retrieval failed: {0}")]
    Retrieve(#[from] RetrieveError),

    /// Recoverable failures persisted past the retry budget
    #[error("transfer of {key} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        key: String,
        attempts: u32,
        last_error: String,
    },

    /// Completed product could not be registered
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("transfer task panicked: {0}")]
    TaskPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RetrieveError::Io(io::Error::other("reset")).is_retryable());
        assert!(RetrieveError::Request("connect".into()).is_retryable());
        assert!(RetrieveError::Http { status: 503, url: "u".into() }.is_retryable());
        assert!(RetrieveError::Http { status: 429, url: "u".into() }.is_retryable());
        assert!(!RetrieveError::Http { status: 404, url: "u".into() }.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = TransferError::RetriesExhausted {
            key: "src-1".into(),
            attempts: 4,
            last_error: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "transfer of src-1 failed after 4 attempts: timeout"
        );
    }
}
