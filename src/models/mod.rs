//! Domain model and request/response shapes for the task API

pub mod requests;
pub mod responses;
pub mod task;

// Re-export commonly used types
pub use requests::{validate_name, CreateTaskRequest, UpdateTaskRequest};
pub use responses::{ApiResponse, HealthResponse, StatsResponse};
pub use task::{Existence, NewTask, Task, TaskPatch, MAX_NAME_LENGTH};
