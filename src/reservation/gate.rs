//! Process-wide attempt gate
//!
//! At most one reservation attempt may hold a slot lock at a time. The gate
//! is a one-permit semaphore: waiting workers queue up in FIFO order, and
//! closing the semaphore is the terminal "stop the process" state.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// The gate was closed after a successful reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt gate is closed")]
pub struct GateClosed;

/// Mutual exclusion between reservation attempts
#[derive(Debug, Clone)]
pub struct AttemptGate {
    semaphore: Arc<Semaphore>,
}

impl AttemptGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for the gate
    ///
    /// # Errors
    ///
    /// Returns `GateClosed` once any permit holder has closed the gate
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit {
            permit,
            semaphore: Arc::clone(&self.semaphore),
        })
    }

    /// Take the gate if it is free right now
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Some(GatePermit {
                permit,
                semaphore: Arc::clone(&self.semaphore),
            }),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => None,
        }
    }

    /// Whether an attempt currently holds the gate
    pub fn is_held(&self) -> bool {
        !self.is_closed() && self.semaphore.available_permits() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

impl Default for AttemptGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to run one attempt; dropping it frees the gate
#[derive(Debug)]
#[must_use = "dropping the permit releases the gate immediately"]
pub struct GatePermit {
    permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl GatePermit {
    /// Free the gate for the next attempt
    pub fn release(self) {
        drop(self.permit);
    }

    /// Close the gate for good; every waiting and future `acquire` fails
    pub fn close(self) {
        self.semaphore.close();
        // Keep the permit out of the semaphore; it is closed anyway
        self.permit.forget();
    }
}
