//! Reservation attempts
//!
//! An attempt takes one queued [`Task`] through the whole reservation:
//!
//! ```text
//!  task ─▶ gate ─▶ lock race (fan-out) ─▶ captcha ─▶ form ─▶ confirm
//!           │           │                    │
//!           │        rejected ─▶ release   rejected ─▶ release
//!        closed ─▶ stop
//! ```
//!
//! Only one attempt holds the gate at a time. Lock contention and a rejected
//! captcha are ordinary outcomes; the task is discarded and the worker moves
//! on to the next one.

pub mod executor;
pub mod gate;
pub mod lock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::Task;

pub use executor::{ReservationExecutor, ReservationOutcome};
pub use gate::{AttemptGate, GateClosed, GatePermit};
pub use lock::{LockCoordinator, LockOutcome};

/// Which lock answer decides a race
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockRace {
    /// The first answer to arrive, accepted or not
    #[default]
    FirstResponse,
    /// The first accepted answer; a refusal only counts when every request was refused
    FirstSuccess,
}

/// What happens to the gate after a confirmed reservation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Close the gate; the pipeline shuts down
    #[default]
    StopProcess,
    /// Release the gate and keep reserving
    KeepHunting,
}

/// Final state of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    LockRejected,
    CaptchaRejected,
    Reserved,
    /// Nothing was attempted because the process is stopping
    GateClosed,
}

/// Lock race followed by execution
#[derive(Clone)]
pub struct ReservationAttempt {
    coordinator: LockCoordinator,
    executor: ReservationExecutor,
}

impl ReservationAttempt {
    pub fn new(coordinator: LockCoordinator, executor: ReservationExecutor) -> Self {
        Self {
            coordinator,
            executor,
        }
    }

    pub fn gate(&self) -> &AttemptGate {
        self.coordinator.gate()
    }

    /// Run one attempt for `task`
    pub async fn attempt(&self, task: &Task) -> Result<AttemptOutcome> {
        let outcome = match self.coordinator.lock(task).await? {
            LockOutcome::GateClosed => AttemptOutcome::GateClosed,
            LockOutcome::Rejected { .. } => AttemptOutcome::LockRejected,
            LockOutcome::Locked { token, permit } => {
                match self.executor.execute(task, &token, permit).await? {
                    ReservationOutcome::CaptchaRejected => AttemptOutcome::CaptchaRejected,
                    ReservationOutcome::Reserved => AttemptOutcome::Reserved,
                }
            }
        };

        if outcome == AttemptOutcome::Reserved {
            info!(entity = %task.entity.name, time = %task.candidate_time(), "Slot reserved");
        }
        Ok(outcome)
    }
}
