//! Store Module
//!
//! Durable task persistence with soft-delete semantics, backed by SQLite.

mod schema;
mod sqlite;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, TaskError};
use crate::models::{NewTask, Task, TaskPatch};

pub use sqlite::SqliteTaskStore;

// == Task Store Trait ==
/// Task persistence operations.
///
/// Lookups report a missing (or, for the `*_active` flavors, soft-deleted)
/// record as `TaskError::NotFound`; every other failure is `TaskError::Storage`.
pub trait TaskStore: Send + Sync {
    /// Assigns an id and timestamps, persists, and returns the stored record.
    fn create(&self, task: NewTask) -> Result<Task>;

    /// Returns the task only if it is not soft-deleted.
    fn find_active(&self, id: &str) -> Result<Task>;

    /// Returns the task whatever its deletion state.
    fn find_any(&self, id: &str) -> Result<Task>;

    /// All active tasks, newest first.
    fn list_active(&self) -> Result<Vec<Task>>;

    /// Applies a sparse patch to an active task and bumps `updated_at`.
    fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task>;

    /// Marks an active task deleted. A second call reports `NotFound`.
    fn soft_delete(&self, id: &str) -> Result<()>;

    /// Physically removes the record, deleted or not.
    fn hard_delete(&self, id: &str) -> Result<()>;

    /// Physically removes the record only if it is completed, checking and
    /// deleting in one step. `Ok(false)` means the task exists but is open.
    fn hard_delete_if_completed(&self, id: &str) -> Result<bool>;

    /// Clears the deletion mark of a soft-deleted task.
    fn restore(&self, id: &str) -> Result<Task>;
}

// == Database ==
/// Shared handle to one SQLite connection.
///
/// The task store and the purge queue both live in the same file and share
/// this handle, so an in-memory database is visible to both.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::apply_schema(&conn)?;
        info!("Database opened at {}", path);
        Ok(Self::wrap(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply_schema(&conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TaskError::Storage("database lock poisoned".to_string()))
    }
}

// == Timestamps ==
/// Current time at the precision the database stores.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so lexical order matches time order.
pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}
