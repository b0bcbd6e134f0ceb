// Core data structures for the reservation pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of bookable entity; decides which weekdays are acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// City office queue (legalization of foreigners)
    City,
    /// Head of a department
    Department,
}

impl EntityKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Department => "department",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookable resource as listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Human readable name, used in logs
    pub name: String,
    /// Short code selected on the command line (e.g. `WRO`, `LP1`)
    pub short_name: String,
    /// Remote queue id
    pub queue: String,
    /// Remote entity id
    pub id: String,
    /// Filled in by the catalog section the entity was loaded from
    #[serde(skip, default = "default_kind")]
    pub kind: EntityKind,
}

fn default_kind() -> EntityKind {
    EntityKind::City
}

/// One label/value pair of the applicant form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormRow {
    pub name: String,
    pub value: String,
}

impl FormRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Candidate reservation attempt
///
/// Cloning is cheap: entity and form data are shared.
#[derive(Debug, Clone)]
pub struct Task {
    pub entity: Arc<Entity>,
    pub date: NaiveDate,
    /// Slot time as published, `HH:MM`
    pub slot: String,
    pub form: Arc<Vec<FormRow>>,
}

/// Identity of a task for queue deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    queue: String,
    entity_id: String,
    date: NaiveDate,
    slot: String,
}

impl Task {
    pub fn new(
        entity: Arc<Entity>,
        date: NaiveDate,
        slot: impl Into<String>,
        form: Arc<Vec<FormRow>>,
    ) -> Self {
        Self {
            entity,
            date,
            slot: slot.into(),
            form,
        }
    }

    /// Candidate time in the format the lock endpoint expects: `YYYY-MM-DD HH:MM:00`
    pub fn candidate_time(&self) -> String {
        format!("{} {}:00", self.date.format("%Y-%m-%d"), self.slot)
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            queue: self.entity.queue.clone(),
            entity_id: self.entity.id.clone(),
            date: self.date,
            slot: self.slot.clone(),
        }
    }
}
