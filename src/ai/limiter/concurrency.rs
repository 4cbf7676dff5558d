//! Concurrency Gate
//!
//! Counting semaphore over in-flight calls. The slot is released when the
//! returned permit drops, so every exit path of the guarded call frees it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::types::{Result, ScribeError};

pub struct ConcurrencyGate {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

/// Slot held for the duration of one inference call
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    pub async fn enter(&self) -> Result<ConcurrencyPermit> {
        if self.available() == 0 {
            debug!("Concurrency gate: all {} slots busy, waiting", self.capacity);
        }
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| ScribeError::Limiter(format!("concurrency gate closed: {}", e)))?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(ConcurrencyPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Calls currently past the gate
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
