//! SQLite DDL for the task database.

use rusqlite::Connection;

/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    completed   INTEGER NOT NULL DEFAULT 0,
    due_at      TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT              -- NULL while active
);

CREATE INDEX IF NOT EXISTS idx_tasks_active_created
    ON tasks(deleted_at, created_at);

-- Delayed purge jobs; a row is consumed when its job is taken.
CREATE TABLE IF NOT EXISTS purge_jobs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id     TEXT NOT NULL,
    not_before  TEXT NOT NULL,
    attempts    INTEGER NOT NULL DEFAULT 0,
    enqueued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_purge_jobs_not_before ON purge_jobs(not_before);
CREATE INDEX IF NOT EXISTS idx_purge_jobs_task ON purge_jobs(task_id);
"#;

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
