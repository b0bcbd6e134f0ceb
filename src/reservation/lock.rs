//! Fan-out lock race
//!
//! A slot is usually contested. The coordinator takes the attempt gate, fires
//! several identical lock requests at once and lets the first answer decide.
//! Requests still in flight are left to finish; their answers are discarded.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::gate::{AttemptGate, GatePermit};
use super::LockRace;
use crate::error::{Error, Result};
use crate::models::Task;
use crate::service::RemoteService;
use crate::utils::truncate_text;

/// Default number of parallel lock requests
pub const DEFAULT_FANOUT: usize = 5;

/// Result of one lock race
#[derive(Debug)]
pub enum LockOutcome {
    /// The slot is ours; the gate stays held until the permit is released
    Locked { token: String, permit: GatePermit },

    /// The service refused the lock; the gate was released
    Rejected { reason: String },

    /// A previous reservation closed the gate
    GateClosed,
}

/// Token from a lock response body
///
/// Accepted bodies look like `OK:TOKEN`; anything else, including an `OK`
/// without a token, is a refusal.
///
/// # Examples
///
/// ```
/// use rezerwacje::reservation::lock::parse_lock_response;
///
/// assert_eq!(parse_lock_response("OK:TOKEN123").as_deref(), Some("TOKEN123"));
/// assert_eq!(parse_lock_response("Termin zajęty"), None);
/// ```
pub fn parse_lock_response(body: &str) -> Option<String> {
    let body = body.trim();
    if !body.starts_with("OK") {
        return None;
    }

    let token = body.get(3..).unwrap_or_default().trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Runs lock races under the attempt gate
#[derive(Clone)]
pub struct LockCoordinator {
    service: RemoteService,
    gate: AttemptGate,
    fanout: usize,
    race: LockRace,
}

impl LockCoordinator {
    pub fn new(service: RemoteService, gate: AttemptGate) -> Self {
        Self {
            service,
            gate,
            fanout: DEFAULT_FANOUT,
            race: LockRace::default(),
        }
    }

    /// Number of parallel lock requests (at least one)
    #[must_use]
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout.max(1);
        self
    }

    #[must_use]
    pub fn with_race(mut self, race: LockRace) -> Self {
        self.race = race;
        self
    }

    pub fn gate(&self) -> &AttemptGate {
        &self.gate
    }

    /// Take the gate and race for the task's slot
    ///
    /// # Errors
    ///
    /// Returns the first transport error when no lock request got an answer
    /// at all; the gate is released in that case too
    pub async fn lock(&self, task: &Task) -> Result<LockOutcome> {
        let Ok(permit) = self.gate.acquire().await else {
            return Ok(LockOutcome::GateClosed);
        };

        let time = task.candidate_time();
        info!(entity = %task.entity.name, time = %time, fanout = self.fanout, "Locking slot");

        let mut replies = self.spawn_requests(&time, &task.entity.queue);
        let mut first_rejection: Option<String> = None;
        let mut first_error: Option<Error> = None;

        while let Some(reply) = replies.recv().await {
            match reply {
                Ok(body) => match parse_lock_response(&body) {
                    Some(token) => {
                        info!(entity = %task.entity.name, time = %time, token = %token, "Slot locked");
                        return Ok(LockOutcome::Locked { token, permit });
                    }
                    None => {
                        let reason = truncate_text(body.trim(), 200);
                        if self.race == LockRace::FirstResponse {
                            permit.release();
                            info!(entity = %task.entity.name, time = %time, reason = %reason, "Unable to lock slot");
                            return Ok(LockOutcome::Rejected { reason });
                        }
                        debug!(entity = %task.entity.name, reason = %reason, "Lock request refused");
                        first_rejection.get_or_insert(reason);
                    }
                },
                Err(e) => {
                    warn!(entity = %task.entity.name, time = %time, error = %e, "Lock request failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        permit.release();
        match (first_rejection, first_error) {
            (Some(reason), _) => {
                info!(entity = %task.entity.name, time = %time, reason = %reason, "Unable to lock slot");
                Ok(LockOutcome::Rejected { reason })
            }
            (None, Some(e)) => Err(e),
            (None, None) => Ok(LockOutcome::Rejected {
                reason: String::from("no lock response"),
            }),
        }
    }

    fn spawn_requests(&self, time: &str, queue: &str) -> mpsc::Receiver<Result<String>> {
        let (tx, rx) = mpsc::channel(self.fanout);

        for request_id in 0..self.fanout {
            let service = self.service.clone();
            let tx = tx.clone();
            let time = time.to_string();
            let queue = queue.to_string();

            tokio::spawn(async move {
                let reply = service.lock(&time, &queue).await.map(|r| r.text());
                if tx.send(reply).await.is_err() {
                    debug!(request_id, "Lock race already decided, answer dropped");
                }
            });
        }

        rx
    }
}
