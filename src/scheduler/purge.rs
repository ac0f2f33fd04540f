//! Deferred deletion of completed tasks.
//!
//! Completing a task queues a purge. When the purge fires it only
//! hard-deletes the task if it still exists and is still completed, so
//! toggling a task back to incomplete defuses any pending purge without
//! cancelling anything.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::cache::{task_key, Cache, LIST_KEY};
use crate::error::{Result, TaskError};
use crate::scheduler::queue::{PurgeJob, PurgeQueue};
use crate::store::TaskStore;

/// Jobs taken from the queue per round trip.
const BATCH_SIZE: usize = 32;

/// What a purge did when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// The task was completed and has been removed.
    Purged,
    /// The task was toggled back to incomplete; left alone.
    StillIncomplete,
    /// No record exists any more (an earlier purge won).
    AlreadyGone,
}

/// Tally of one `run_due` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub purged: usize,
    pub skipped: usize,
    pub retried: usize,
    pub dropped: usize,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct DeferredDeletionScheduler {
    store: Arc<dyn TaskStore>,
    cache: Arc<dyn Cache>,
    queue: Arc<dyn PurgeQueue>,
    max_attempts: u32,
    retry_backoff: Duration,
}

fn to_chrono(delay: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(delay)
        .map_err(|e| TaskError::Internal(format!("delay out of range: {}", e)))
}

impl DeferredDeletionScheduler {
    /// `retry_backoff` is how long a failed job waits before its next attempt;
    /// it is clamped to at least one second.
    pub fn new(
        store: Arc<dyn TaskStore>,
        cache: Arc<dyn Cache>,
        queue: Arc<dyn PurgeQueue>,
        max_attempts: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
            max_attempts: max_attempts.max(1),
            retry_backoff: retry_backoff.max(Duration::from_secs(1)),
        }
    }

    // == Schedule ==
    /// Queues a purge of `task_id` to fire once `delay` has elapsed.
    pub fn schedule_purge(&self, task_id: &str, delay: Duration) -> Result<PurgeJob> {
        let not_before = Utc::now() + to_chrono(delay)?;
        let job = self.queue.enqueue(task_id, not_before)?;
        info!("Purge of task {} scheduled for {}", task_id, not_before);
        Ok(job)
    }

    /// Jobs still waiting for `task_id`.
    pub fn pending_for(&self, task_id: &str) -> Result<Vec<PurgeJob>> {
        self.queue.pending_for(task_id)
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.queue.pending_count()
    }

    // == Purge ==
    /// Hard-deletes `task_id` if it still exists and is still completed.
    ///
    /// The completed check and the delete are one store call, so a toggle
    /// racing the purge either lands first and saves the task or lands on a
    /// missing record. Soft-deleted tasks are purged too.
    pub fn purge(&self, task_id: &str) -> Result<PurgeOutcome> {
        match self.store.hard_delete_if_completed(task_id) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Task {} no longer completed, purge skipped", task_id);
                return Ok(PurgeOutcome::StillIncomplete);
            }
            Err(TaskError::NotFound(_)) => return Ok(PurgeOutcome::AlreadyGone),
            Err(e) => return Err(e),
        }

        self.cache.forget(&[LIST_KEY, task_key(task_id).as_str()]);
        info!("Task {} purged", task_id);
        Ok(PurgeOutcome::Purged)
    }

    // == Run Due ==
    /// Fires every job due at `now`.
    ///
    /// Jobs are leased for the retry backoff while they run and removed only
    /// once they have finished. A job failing with anything other than
    /// `NotFound` is retried after the backoff until it has used up its
    /// attempts, then dropped. Only a failure to lease jobs ends the pass
    /// early.
    pub fn run_due(&self, now: DateTime<Utc>) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let backoff = to_chrono(self.retry_backoff)?;

        loop {
            let jobs = self.queue.take_due(now, backoff, BATCH_SIZE)?;
            if jobs.is_empty() {
                break;
            }

            for job in &jobs {
                self.run_job(job, now + backoff, &mut report);
            }
        }

        Ok(report)
    }

    fn run_job(&self, job: &PurgeJob, retry_at: DateTime<Utc>, report: &mut PurgeReport) {
        match self.purge(&job.task_id) {
            Ok(outcome) => {
                if outcome == PurgeOutcome::Purged {
                    report.purged += 1;
                } else {
                    report.skipped += 1;
                }
                self.finish(job);
            }
            Err(e) if job.attempts < self.max_attempts => {
                warn!(
                    "Purge of task {} failed (attempt {}), retrying: {}",
                    job.task_id, job.attempts, e
                );
                report.retried += 1;
                if let Err(e) = self.queue.requeue(job, retry_at) {
                    error!(
                        "Could not requeue purge job {}, it stays leased: {}",
                        job.id, e
                    );
                }
            }
            Err(e) => {
                error!(
                    "Purge of task {} failed after {} attempts, dropping: {}",
                    job.task_id, job.attempts, e
                );
                report.dropped += 1;
                self.finish(job);
            }
        }
    }

    /// Removes a finished job. If that fails the job fires again after its
    /// lease and finds nothing left to do.
    fn finish(&self, job: &PurgeJob) {
        if let Err(e) = self.queue.complete(job) {
            warn!("Could not remove purge job {}: {}", job.id, e);
        }
    }
}
