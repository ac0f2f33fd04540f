//! Purge Worker
//!
//! Polls the purge queue and fires due jobs on the blocking pool. Because
//! jobs live in the database, anything queued before a restart is picked up
//! on the first poll after it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::scheduler::DeferredDeletionScheduler;

pub fn spawn_purge_worker(
    scheduler: Arc<DeferredDeletionScheduler>,
    poll_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(poll_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting purge worker with poll interval of {} seconds",
            interval.as_secs()
        );

        loop {
            let scheduler = scheduler.clone();
            let run = tokio::task::spawn_blocking(move || scheduler.run_due(Utc::now())).await;

            match run {
                Ok(Ok(report)) if report.is_empty() => debug!("Purge run: nothing due"),
                Ok(Ok(report)) => info!(
                    "Purge run: {} purged, {} skipped, {} retried, {} dropped",
                    report.purged, report.skipped, report.retried, report.dropped
                ),
                Ok(Err(e)) => error!("Purge run failed: {}", e),
                Err(e) => error!("Purge run panicked: {}", e),
            }

            tokio::time::sleep(interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::{NewTask, TaskPatch};
    use crate::scheduler::SqlitePurgeQueue;
    use crate::store::{Database, SqliteTaskStore, TaskStore};

    #[tokio::test]
    async fn test_worker_purges_due_jobs() {
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(SqliteTaskStore::new(db.clone()));
        let scheduler = Arc::new(DeferredDeletionScheduler::new(
            store.clone(),
            Arc::new(MemoryCache::new()),
            Arc::new(SqlitePurgeQueue::new(db)),
            3,
            Duration::from_secs(5),
        ));

        let done = store.create(NewTask::named("done")).unwrap();
        store.update(&done.id, &TaskPatch::completed(true)).unwrap();
        let open = store.create(NewTask::named("open")).unwrap();
        scheduler.schedule_purge(&done.id, Duration::ZERO).unwrap();
        scheduler.schedule_purge(&open.id, Duration::ZERO).unwrap();

        let handle = spawn_purge_worker(scheduler.clone(), 1);
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        assert!(store.find_any(&done.id).is_err());
        assert!(store.find_active(&open.id).is_ok());
        assert_eq!(scheduler.pending_count().unwrap(), 0);
    }
}
