//! Reservation pipeline
//!
//! Scanners produce tasks, workers consume them through the attempt gate:
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Discovery  │     │  Scanners   │     │  TaskQueue  │     │   Workers   │
//! │ (dates per  │────▶│ (N per      │────▶│ (freshest   │────▶│ (gate, lock,│
//! │  entity)    │     │  entity)    │     │  first)     │     │  captcha)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                                       │
//!                            └────────────── shutdown ◀──────────────┘
//! ```
//!
//! Everything stops when the shutdown flag is raised, either from outside
//! (Ctrl-C) or by a worker once a reservation closed the attempt gate.

pub mod stats;

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::captcha::CaptchaSolver;
use crate::config::PipelineConfig;
use crate::error::{Error, Result, RezerwacjeErrorTrait};
use crate::models::{Entity, FormRow};
use crate::queue::TaskQueue;
use crate::reservation::{
    AttemptGate, AttemptOutcome, LockCoordinator, ReservationAttempt, ReservationExecutor,
};
use crate::scanner::validation::validate;
use crate::scanner::Scanner;
use crate::service::RemoteService;
use crate::session::Session;
use crate::utils::shutdown_requested;

pub use stats::{PipelineStats, StatsSnapshot};

/// Entity selected for scanning, with the date its calendar currently ends on
#[derive(Debug, Clone)]
pub struct ActiveEntity {
    pub entity: Arc<Entity>,
    pub date: NaiveDate,
}

/// Scanners, queue and workers sharing one session and one attempt gate
pub struct Pipeline {
    config: PipelineConfig,
    service: RemoteService,
    queue: Arc<TaskQueue>,
    attempt: ReservationAttempt,
    stats: Arc<PipelineStats>,

    /// Shutdown signal
    shutdown: watch::Sender<bool>,

    /// Shutdown receiver
    shutdown_rx: watch::Receiver<bool>,
}

impl Pipeline {
    /// Create a pipeline; requests sent through it are abandoned on shutdown
    pub fn new(config: PipelineConfig, session: Session, solver: Arc<dyn CaptchaSolver>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let service = RemoteService::new(session.with_cancel(shutdown_rx.clone()));

        let coordinator = LockCoordinator::new(service.clone(), AttemptGate::new())
            .with_fanout(config.lock_fanout)
            .with_race(config.lock_race);
        let executor =
            ReservationExecutor::new(service.clone(), solver).with_success_policy(config.on_success);

        Self {
            queue: Arc::new(TaskQueue::with_capacity(config.queue_capacity)),
            attempt: ReservationAttempt::new(coordinator, executor),
            stats: PipelineStats::new(),
            config,
            service,
            shutdown,
            shutdown_rx,
        }
    }

    pub fn service(&self) -> &RemoteService {
        &self.service
    }

    pub fn gate(&self) -> &AttemptGate {
        self.attempt.gate()
    }

    /// Sender that stops the pipeline when `true` is sent
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Find the latest open date of every entity and keep those worth scanning
    ///
    /// Entities whose date falls on a day they do not receive visitors, or
    /// whose page carries no calendar, are skipped.
    ///
    /// # Errors
    ///
    /// Transport errors abort discovery
    pub async fn discover(&self, entities: &[Arc<Entity>]) -> Result<Vec<ActiveEntity>> {
        let mut active = Vec::with_capacity(entities.len());

        for entity in entities {
            let date = match self.service.latest_date(entity).await {
                Ok(date) => date,
                Err(Error::Scan(e)) => {
                    warn!(entity = %entity.name, error = %e, "No open dates, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!(entity = %entity.name, date = %date, "Validating current latest date");
            let (weekday, accepted) = validate(entity.kind, date);
            if !accepted {
                info!(
                    entity = %entity.name,
                    date = %date,
                    weekday = %weekday,
                    kind = %entity.kind,
                    "Date is not a visiting day, skipping"
                );
                continue;
            }

            info!(entity = %entity.name, date = %date, "Going to process");
            active.push(ActiveEntity {
                entity: Arc::clone(entity),
                date,
            });
        }

        Ok(active)
    }

    /// Scan and reserve until shutdown
    ///
    /// Returns the final statistics once every scanner and worker stopped.
    pub async fn run(&self, active: Vec<ActiveEntity>, form: Arc<Vec<FormRow>>) -> Result<StatsSnapshot> {
        info!(
            entities = active.len(),
            scanners_per_entity = self.config.scanners_per_entity,
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            lock_fanout = self.config.lock_fanout,
            "Starting reservation pipeline"
        );

        let mut handles = self.spawn_scanners(&active, &form);
        handles.extend(self.spawn_workers());

        let mut shutdown_rx = self.shutdown_rx.clone();
        shutdown_requested(&mut shutdown_rx).await;
        info!("Stopping reservation pipeline");

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Pipeline task ended abnormally");
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            scans = snapshot.scans,
            attempts = snapshot.attempts,
            lock_rejected = snapshot.lock_rejected,
            captcha_rejected = snapshot.captcha_rejected,
            reserved = snapshot.reserved,
            "Reservation pipeline stopped"
        );
        Ok(snapshot)
    }

    fn spawn_scanners(&self, active: &[ActiveEntity], form: &Arc<Vec<FormRow>>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(active.len() * self.config.scanners_per_entity);

        for round in 0..self.config.scanners_per_entity {
            for (index, target) in active.iter().enumerate() {
                let scanner = Scanner::new(
                    self.service.clone(),
                    Arc::clone(&self.queue),
                    Arc::clone(&target.entity),
                    target.date,
                    Arc::clone(form),
                )
                .with_interval(self.config.scan_interval())
                .with_stats(Arc::clone(&self.stats));

                let scanner_id = round * active.len() + index;
                handles.push(tokio::spawn(scanner.run(scanner_id, self.shutdown_rx.clone())));
            }
        }

        handles
    }

    fn spawn_workers(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.config.workers);

        for worker_id in 0..self.config.workers {
            let queue = Arc::clone(&self.queue);
            let attempt = self.attempt.clone();
            let stats = Arc::clone(&self.stats);
            let shutdown = self.shutdown.clone();
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let task = tokio::select! {
                        biased;
                        () = shutdown_requested(&mut shutdown_rx) => break,
                        task = queue.take() => task,
                    };

                    debug!(worker_id, entity = %task.entity.name, slot = %task.slot, "Picked task");

                    match attempt.attempt(&task).await {
                        Ok(AttemptOutcome::GateClosed) => {
                            let _ = shutdown.send(true);
                            break;
                        }
                        Ok(outcome) => {
                            stats.record_attempt();
                            match outcome {
                                AttemptOutcome::LockRejected => stats.record_lock_rejected(),
                                AttemptOutcome::CaptchaRejected => stats.record_captcha_rejected(),
                                AttemptOutcome::Reserved => stats.record_reserved(),
                                AttemptOutcome::GateClosed => {}
                            }
                            if attempt.gate().is_closed() {
                                info!(worker_id, "Reservation made, stopping");
                                let _ = shutdown.send(true);
                                break;
                            }
                        }
                        Err(e) if e.is_cancelled() => break,
                        Err(e) if !e.is_recoverable() => {
                            stats.record_attempt();
                            stats.record_attempt_error();
                            error!(
                                worker_id,
                                category = ?e.category(),
                                error = %e,
                                "Unrecoverable error, stopping"
                            );
                            let _ = shutdown.send(true);
                            break;
                        }
                        Err(e) => {
                            stats.record_attempt();
                            stats.record_attempt_error();
                            warn!(
                                worker_id,
                                entity = %task.entity.name,
                                time = %task.candidate_time(),
                                error = %e,
                                "Reservation attempt failed"
                            );
                        }
                    }
                }

                debug!(worker_id, "Worker shutting down");
            });

            handles.push(handle);
        }

        handles
    }
}
