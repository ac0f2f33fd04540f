//! Error types for the task service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Task Error Enum ==
/// Unified error type for the task service.
///
/// Only three kinds matter to callers: `NotFound`, `Validation`, and
/// everything else (reported as an internal failure).
#[derive(Error, Debug)]
pub enum TaskError {
    /// The referenced task does not exist or is not active
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Request data failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The persistence layer failed
    #[error("Storage failure: {0}")]
    Storage(String),

    /// The cache layer failed (callers normally degrade instead of surfacing this)
    #[error("Cache failure: {0}")]
    Cache(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TaskError::Storage(_) | TaskError::Cache(_) | TaskError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        TaskError::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(err: tokio::task::JoinError) -> Self {
        TaskError::Internal(format!("blocking task failed: {}", err))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            TaskError::NotFound(_) => "Task not found.".to_string(),
            TaskError::Validation(msg) => msg.clone(),
            other => {
                tracing::error!("Request failed: {}", other);
                other.to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the task service.
pub type Result<T> = std::result::Result<T, TaskError>;
