//! API Module
//!
//! HTTP handlers and routing for the task REST API.
//!
//! # Endpoints
//! - `GET /api/tasks` - List active tasks
//! - `POST /api/tasks` - Create a task
//! - `GET /api/tasks/:id` - Fetch a task
//! - `PUT|PATCH /api/tasks/:id` - Partially update a task
//! - `DELETE /api/tasks/:id` - Soft-delete a task
//! - `PATCH /api/tasks/:id/toggle` - Flip completion
//! - `POST /api/tasks/:id/restore` - Undo a soft delete
//! - `GET /stats` - Cache and purge queue statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
