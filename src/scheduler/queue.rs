//! Durable delayed-job queue for purges.
//!
//! Jobs are rows in `purge_jobs`; they outlive the process and stay in the
//! table until they have run. Taking a job leases it: its attempt counter is
//! bumped and its `not_before` pushed past the lease, so a worker that dies
//! mid-run leaves the job to be taken again once the lease runs out.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, types::Type, Row};

use crate::error::{Result, TaskError};
use crate::store::{decode_time, encode_time, now, Database};

/// A pending purge of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeJob {
    pub id: i64,
    pub task_id: String,
    pub not_before: DateTime<Utc>,
    /// Attempts made so far, including the one in progress once taken
    pub attempts: u32,
}

// == Purge Queue Trait ==
pub trait PurgeQueue: Send + Sync {
    /// Adds a job that becomes due at `not_before`.
    fn enqueue(&self, task_id: &str, not_before: DateTime<Utc>) -> Result<PurgeJob>;

    /// Leases up to `limit` jobs due at `now`, oldest first.
    ///
    /// Each returned job has its attempt counter already incremented and is
    /// not due again until `now + lease`. The rows stay in the queue.
    fn take_due(&self, now: DateTime<Utc>, lease: Duration, limit: usize) -> Result<Vec<PurgeJob>>;

    /// Removes a job that has run (or been given up on).
    fn complete(&self, job: &PurgeJob) -> Result<()>;

    /// Moves a taken job's due time, keeping its attempt count.
    fn requeue(&self, job: &PurgeJob, not_before: DateTime<Utc>) -> Result<PurgeJob>;

    /// Jobs still waiting for `task_id`, leased ones included.
    fn pending_for(&self, task_id: &str) -> Result<Vec<PurgeJob>>;

    /// Number of jobs waiting, leased ones included.
    fn pending_count(&self) -> Result<usize>;
}

/// `PurgeQueue` stored in the task database.
#[derive(Clone)]
pub struct SqlitePurgeQueue {
    db: Database,
}

impl SqlitePurgeQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const SELECT_JOB: &str = "SELECT id, task_id, not_before, attempts FROM purge_jobs";

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<PurgeJob> {
    let raw: String = row.get(2)?;
    let not_before = decode_time(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(PurgeJob {
        id: row.get(0)?,
        task_id: row.get(1)?,
        not_before,
        attempts: row.get(3)?,
    })
}

impl PurgeQueue for SqlitePurgeQueue {
    fn enqueue(&self, task_id: &str, not_before: DateTime<Utc>) -> Result<PurgeJob> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO purge_jobs (task_id, not_before, attempts, enqueued_at) \
             VALUES (?1, ?2, 0, ?3)",
            params![task_id, encode_time(&not_before), encode_time(&now())],
        )?;

        Ok(PurgeJob {
            id: conn.last_insert_rowid(),
            task_id: task_id.to_string(),
            not_before,
            attempts: 0,
        })
    }

    fn take_due(&self, now: DateTime<Utc>, lease: Duration, limit: usize) -> Result<Vec<PurgeJob>> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let due = {
            let mut stmt = tx.prepare(&format!(
                "{} WHERE not_before <= ?1 ORDER BY not_before, id LIMIT ?2",
                SELECT_JOB
            ))?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![encode_time(&now), limit], row_to_job)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let leased_until = now + lease;
        let mut jobs = Vec::with_capacity(due.len());
        for job in due {
            let attempts = job.attempts + 1;
            tx.execute(
                "UPDATE purge_jobs SET attempts = ?1, not_before = ?2 WHERE id = ?3",
                params![attempts, encode_time(&leased_until), job.id],
            )?;
            jobs.push(PurgeJob {
                attempts,
                not_before: leased_until,
                ..job
            });
        }
        tx.commit()?;

        Ok(jobs)
    }

    fn complete(&self, job: &PurgeJob) -> Result<()> {
        let conn = self.db.lock()?;
        conn.execute("DELETE FROM purge_jobs WHERE id = ?1", params![job.id])?;
        Ok(())
    }

    fn requeue(&self, job: &PurgeJob, not_before: DateTime<Utc>) -> Result<PurgeJob> {
        let conn = self.db.lock()?;
        let moved = conn.execute(
            "UPDATE purge_jobs SET not_before = ?1 WHERE id = ?2",
            params![encode_time(&not_before), job.id],
        )?;
        if moved == 0 {
            return Err(TaskError::Internal(format!(
                "purge job {} is no longer queued",
                job.id
            )));
        }

        Ok(PurgeJob {
            not_before,
            ..job.clone()
        })
    }

    fn pending_for(&self, task_id: &str) -> Result<Vec<PurgeJob>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE task_id = ?1 ORDER BY not_before, id",
            SELECT_JOB
        ))?;
        let jobs = stmt
            .query_map(params![task_id], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn pending_count(&self) -> Result<usize> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM purge_jobs", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
