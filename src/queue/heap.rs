//! Binary max-heap of tasks keyed by priority
//!
//! The heap keeps a key → position index so a resident task can be found
//! (and refreshed) without a scan, and it supports replacing the minimum in
//! place for bounded capacity.

use std::collections::HashMap;

use crate::models::{Task, TaskKey};

struct QueueItem {
    task: Task,
    key: TaskKey,
    priority: u64,
}

/// What `insert` did with the task
#[derive(Debug)]
pub enum Inserted {
    /// Stored in a new slot
    Added,
    /// Same task was already resident; its priority was bumped
    Refreshed,
    /// Capacity reached; the stalest resident task was overwritten
    Evicted(Task),
}

pub(crate) struct TaskHeap {
    items: Vec<QueueItem>,
    positions: HashMap<TaskKey, usize>,
}

impl TaskHeap {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Insert `task` with `priority`, which must exceed every resident priority.
    pub(crate) fn insert(&mut self, task: Task, priority: u64, capacity: Option<usize>) -> Inserted {
        let key = task.key();

        if let Some(&index) = self.positions.get(&key) {
            let item = &mut self.items[index];
            item.task = task;
            item.priority = priority;
            self.sift_up(index);
            return Inserted::Refreshed;
        }

        let full = capacity.is_some_and(|cap| self.items.len() >= cap.max(1));
        if full {
            if let Some(index) = self.lowest() {
                let stale = std::mem::replace(
                    &mut self.items[index],
                    QueueItem {
                        task,
                        key: key.clone(),
                        priority,
                    },
                );
                self.positions.remove(&stale.key);
                self.positions.insert(key, index);
                self.sift_up(index);
                return Inserted::Evicted(stale.task);
            }
        }

        let index = self.items.len();
        self.positions.insert(key.clone(), index);
        self.items.push(QueueItem {
            task,
            key,
            priority,
        });
        self.sift_up(index);
        Inserted::Added
    }

    /// Remove and return the highest-priority task.
    pub(crate) fn pop(&mut self) -> Option<Task> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.swap(0, last);
        let item = self.items.pop()?;
        self.positions.remove(&item.key);
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        Some(item.task)
    }

    /// Index of the lowest-priority item. In a max-heap it is always a leaf.
    fn lowest(&self) -> Option<usize> {
        let len = self.items.len();
        (len / 2..len).min_by_key(|&i| self.items[i].priority)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.items[index].priority <= self.items[parent].priority {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut largest = index;

            if left < len && self.items[left].priority > self.items[largest].priority {
                largest = left;
            }
            if right < len && self.items[right].priority > self.items[largest].priority {
                largest = right;
            }
            if largest == index {
                break;
            }
            self.swap(index, largest);
            index = largest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.items.swap(a, b);
        if let Some(pos) = self.positions.get_mut(&self.items[a].key) {
            *pos = a;
        }
        if let Some(pos) = self.positions.get_mut(&self.items[b].key) {
            *pos = b;
        }
    }

    #[cfg(test)]
    fn is_valid(&self) -> bool {
        let heap_ok = (1..self.items.len())
            .all(|i| self.items[(i - 1) / 2].priority >= self.items[i].priority);
        let index_ok = self.positions.len() == self.items.len()
            && self
                .items
                .iter()
                .enumerate()
                .all(|(i, item)| self.positions.get(&item.key) == Some(&i));
        heap_ok && index_ok
    }
}
