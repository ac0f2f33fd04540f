//! Task domain model
//!
//! The single persisted entity plus the shapes used to create and patch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a task name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

// == Task ==
/// A to-do item as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Whether a stored task is visible. A purged task has no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Active,
    SoftDeleted,
}

impl Task {
    pub fn existence(&self) -> Existence {
        if self.deleted_at.is_some() {
            Existence::SoftDeleted
        } else {
            Existence::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.existence() == Existence::Active
    }
}

// == New Task ==
/// Fields supplied when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_at: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// == Task Patch ==
/// Sparse update. `None` leaves a field untouched; for the nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_at.is_none()
    }

    /// Applies the provided fields to `task`. Timestamps are left to the store.
    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_at) = self.due_at {
            task.due_at = due_at;
        }
    }
}
