//! Mini Tasks - A small task management API
//!
//! Task CRUD over SQLite with a read-through TTL cache and deferred purging
//! of completed tasks.

pub mod api;
pub mod background;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use error::{Result, TaskError};
pub use service::TaskService;
