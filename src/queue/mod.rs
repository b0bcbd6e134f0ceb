//! Bounded, freshest-first task queue
//!
//! Scanners push every discovered slot here and reservation workers drain it.
//! An older slot is more likely to be gone by the time a worker reaches it, so
//! the queue hands out the most recently pushed task first and, when full,
//! overwrites the stalest one.
//!
//! ```text
//!  scanner ─┐                       ┌─▶ worker ─┐
//!  scanner ─┼─▶ push ─▶ [max-heap] ─┼─▶ worker ─┼─▶ attempt gate
//!  scanner ─┘   (evict oldest)      └─▶ worker ─┘
//! ```

mod heap;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Notify;

use crate::models::Task;
use heap::TaskHeap;

pub use heap::Inserted;

struct QueueState {
    heap: TaskHeap,
    last_priority: u64,
}

/// Thread-safe priority queue of pending reservation attempts
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Notify,
    capacity: Option<usize>,
    origin: Instant,
}

impl TaskQueue {
    /// Create an unbounded queue
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a queue holding at most `capacity` tasks (a capacity of 0 holds one)
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity.max(1)))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: TaskHeap::new(),
                last_priority: 0,
            }),
            available: Notify::new(),
            capacity,
            origin: Instant::now(),
        }
    }

    /// Configured capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Insert a task as the freshest entry
    ///
    /// Pushing a task that is already queued refreshes it instead of adding a
    /// duplicate. A full queue overwrites its stalest task, which is returned
    /// inside [`Inserted::Evicted`].
    pub fn push(&self, task: Task) -> Inserted {
        let inserted = {
            let mut state = self.lock();
            let elapsed = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
            let priority = elapsed.max(state.last_priority.saturating_add(1));
            state.last_priority = priority;
            state.heap.insert(task, priority, self.capacity)
        };
        self.available.notify_one();
        inserted
    }

    /// Remove the freshest task without waiting
    pub fn pop(&self) -> Option<Task> {
        self.lock().heap.pop()
    }

    /// Wait until a task is queued, then remove the freshest one
    ///
    /// Cancel-safe: dropping the future never loses a task.
    pub async fn take(&self) -> Task {
        loop {
            if let Some(task) = self.pop() {
                return task;
            }
            // Another consumer may win the task we were woken for; check again.
            self.available.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
