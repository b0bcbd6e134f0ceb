//! Slot scanning
//!
//! A [`Scanner`] polls the slot listing of one entity for one date and pushes
//! every slot it sees into the shared [`TaskQueue`]. The pipeline runs several
//! scanners per entity so the queue stays fresh while workers are busy.

pub mod parse;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{Entity, FormRow, Task};
use crate::pipeline::PipelineStats;
use crate::queue::{Inserted, TaskQueue};
use crate::service::RemoteService;
use crate::utils::shutdown_requested;

/// Periodic producer of tasks for one entity and date
pub struct Scanner {
    service: RemoteService,
    queue: Arc<TaskQueue>,
    entity: Arc<Entity>,
    date: NaiveDate,
    form: Arc<Vec<FormRow>>,
    interval: Duration,
    stats: Arc<PipelineStats>,
}

impl Scanner {
    pub fn new(
        service: RemoteService,
        queue: Arc<TaskQueue>,
        entity: Arc<Entity>,
        date: NaiveDate,
        form: Arc<Vec<FormRow>>,
    ) -> Self {
        Self {
            service,
            queue,
            entity,
            date,
            form,
            interval: Duration::ZERO,
            stats: PipelineStats::new(),
        }
    }

    /// Pause between scan passes
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Fetch the slot listing once and queue every slot; returns the number queued
    pub async fn scan_once(&self) -> Result<usize> {
        let slots = self.service.slots(&self.entity, self.date).await?;
        info!(entity = %self.entity.name, date = %self.date, slots = ?slots, "Available slots");

        for slot in &slots {
            let task = Task::new(
                Arc::clone(&self.entity),
                self.date,
                slot.as_str(),
                Arc::clone(&self.form),
            );
            if let Inserted::Evicted(stale) = self.queue.push(task) {
                debug!(entity = %stale.entity.name, slot = %stale.slot, "Evicted stale task");
                self.stats.record_eviction();
            }
        }

        Ok(slots.len())
    }

    /// Scan until shutdown is raised
    ///
    /// A failed pass is logged and the loop carries on with the next one.
    pub async fn run(self, scanner_id: usize, mut shutdown: watch::Receiver<bool>) {
        debug!(scanner_id, entity = %self.entity.name, date = %self.date, "Scanner started");

        loop {
            tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown) => break,
                result = self.scan_once() => match result {
                    Ok(queued) => self.stats.record_scan(queued),
                    Err(e) if e.is_cancelled() => break,
                    Err(e) => {
                        self.stats.record_scan_failure();
                        warn!(scanner_id, entity = %self.entity.name, error = %e, "Scan failed");
                    }
                },
            }

            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    () = shutdown_requested(&mut shutdown) => break,
                    () = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        debug!(scanner_id, entity = %self.entity.name, "Scanner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use crate::session::mock::{MockTransport, Reply};
    use crate::session::Session;

    fn entity() -> Arc<Entity> {
        Arc::new(Entity {
            name: "Legnica".into(),
            short_name: "LG".into(),
            queue: "11".into(),
            id: "110".into(),
            kind: EntityKind::City,
        })
    }

    fn scanner(transport: Arc<MockTransport>, queue: Arc<TaskQueue>) -> Scanner {
        let service = RemoteService::new(Session::new(transport));
        Scanner::new(
            service,
            queue,
            entity(),
            NaiveDate::from_ymd_opt(2024, 5, 21).unwrap(),
            Arc::new(vec![FormRow::new("Telefon", "500")]),
        )
    }

    #[tokio::test]
    async fn test_scan_once_queues_slots() {
        let transport = Arc::new(MockTransport::new(|_req, _n| {
            Reply::text(r#"<a onclick="lock(1)">09:00</a><a onclick="lock(2)">09:30</a>"#)
        }));
        let queue = Arc::new(TaskQueue::new());

        let queued = scanner(transport, Arc::clone(&queue)).scan_once().await.unwrap();
        assert_eq!(queued, 2);
        assert_eq!(queue.len(), 2);

        let freshest = queue.pop().unwrap();
        assert_eq!(freshest.slot, "09:30");
        assert_eq!(freshest.candidate_time(), "2024-05-21 09:30:00");
    }

    #[tokio::test]
    async fn test_rescan_does_not_duplicate() {
        let transport = Arc::new(MockTransport::new(|_req, _n| {
            Reply::text(r#"<a onclick="lock(1)">09:00</a>"#)
        }));
        let queue = Arc::new(TaskQueue::new());
        let scanner = scanner(transport, Arc::clone(&queue));

        scanner.scan_once().await.unwrap();
        scanner.scan_once().await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let transport = Arc::new(MockTransport::new(|_req, _n| {
            Reply::text(r#"<a onclick="lock(1)">09:00</a>"#)
        }));
        let queue = Arc::new(TaskQueue::new());
        let stats = PipelineStats::new();
        let scanner = scanner(transport, Arc::clone(&queue))
            .with_interval(Duration::from_millis(5))
            .with_stats(Arc::clone(&stats));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scanner.run(0, rx));
        tokio::time::sleep(Duration::from_millis(40)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scanner should stop")
            .unwrap();
        assert!(stats.snapshot().scans >= 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_pass_is_counted() {
        let transport = Arc::new(MockTransport::new(|_req, _n| Reply::Fail));
        let service = RemoteService::new(
            Session::new(transport).with_retry_policy(crate::session::RetryPolicy::bounded(1)),
        );
        let stats = PipelineStats::new();
        let scanner = Scanner::new(
            service,
            Arc::new(TaskQueue::new()),
            entity(),
            NaiveDate::from_ymd_opt(2024, 5, 21).unwrap(),
            Arc::new(Vec::new()),
        )
        .with_interval(Duration::from_millis(5))
        .with_stats(Arc::clone(&stats));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scanner.run(1, rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(stats.snapshot().scan_failures >= 1);
        assert_eq!(stats.snapshot().scans, 0);
    }
}
