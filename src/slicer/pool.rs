//! Bounded slicer concurrency pool
//!
//! A counting semaphore caps how many external slicer processes run at
//! once; callers beyond the limit queue FIFO until a slot frees. This is
//! the primary backpressure mechanism for the host. Slots are scoped
//! acquisitions: the permit releases on drop, covering every exit path
//! including panics, and independently of temp-directory cleanup.

use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A bounded pool of slicer process slots.
#[derive(Debug, Clone)]
pub struct SlicePool {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl SlicePool {
    /// Create a pool with the given slot count (minimum 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Wait for a slot. Waiters are served in FIFO order.
    pub async fn acquire(&self) -> Result<SliceSlot> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::SlicerInfra("slicer pool closed".to_string()))?;
        Ok(SliceSlot { _permit: permit })
    }

    /// Configured slot count.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// An acquired pool slot; the slot frees when this is dropped.
#[derive(Debug)]
pub struct SliceSlot {
    _permit: OwnedSemaphorePermit,
}
