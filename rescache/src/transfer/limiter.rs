//! Semaphore-based limit on concurrently streaming transfers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits how many transfers stream at once.
///
/// Permits are owned so they can move into spawned transfer tasks.
#[derive(Debug)]
pub struct TransferLimiter {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
}

impl TransferLimiter {
    /// Create a limiter allowing `max_concurrent` transfers (minimum 1).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Wait for a transfer slot.
    ///
    /// # Panics
    ///
    /// Panics if the semaphore has been closed. The limiter never closes it.
    pub async fn acquire(&self) -> TransferPermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("transfer semaphore closed unexpectedly");

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        TransferPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Peak concurrent transfers observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held transfer slot, released on drop.
pub struct TransferPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for TransferPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
