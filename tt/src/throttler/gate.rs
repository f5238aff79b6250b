//! Concurrency gate
//!
//! Bounds how many operations execute at once, independent of how many are
//! admitted per batch. Permits are released on drop.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::ThrottleError;

/// Counting admission gate shared by every running operation
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    limit: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// A held slot in the gate
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` holders
    pub fn new(limit: usize) -> Self {
        debug!(limit, "ConcurrencyGate::new: called");
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<GatePermit, ThrottleError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Drive `future` to completion while holding a slot
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ThrottleError> {
        let _permit = self.acquire().await?;
        Ok(future.await)
    }

    /// Configured ceiling
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Refuse all future acquisitions
    pub fn close(&self) {
        debug!("ConcurrencyGate::close: called");
        self.semaphore.close();
    }
}
