//! Request DTOs for the task API
//!
//! Defines the structure of incoming HTTP request bodies and the field
//! validation applied before anything reaches the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Result, TaskError};
use crate::models::task::{NewTask, TaskPatch, MAX_NAME_LENGTH};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Checks the name rules: present, not blank, at most 255 characters.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskError::Validation(
            "The name field is required.".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(TaskError::Validation(format!(
            "The name field must not be greater than {} characters.",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Request body for POST /api/tasks
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    /// Validates the request and converts it into creation fields.
    pub fn into_new_task(self) -> Result<NewTask> {
        let name = self.name.unwrap_or_default();
        validate_name(&name)?;

        Ok(NewTask {
            name,
            description: self.description,
            completed: self.completed.unwrap_or(false),
            due_at: self.due_at,
        })
    }
}

/// Request body for PUT/PATCH /api/tasks/:id
///
/// Every field is optional; `name` may not be explicitly null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateTaskRequest {
    /// Validates the request and converts it into a sparse patch.
    pub fn into_patch(self) -> Result<TaskPatch> {
        let name = match self.name {
            None => None,
            Some(None) => {
                return Err(TaskError::Validation(
                    "The name field is required.".to_string(),
                ))
            }
            Some(Some(name)) => {
                validate_name(&name)?;
                Some(name)
            }
        };

        Ok(TaskPatch {
            name,
            description: self.description,
            completed: self.completed,
            due_at: self.due_at,
        })
    }
}
