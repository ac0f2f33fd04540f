//! Task Lifecycle Service
//!
//! The operations the HTTP layer calls. Reads go through the cache, writes
//! go straight to the store, and every write invalidates the list key and
//! the affected task key before returning.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{task_key, Cache, LIST_KEY};
use crate::error::Result;
use crate::models::{NewTask, Task, TaskPatch};
use crate::scheduler::DeferredDeletionScheduler;
use crate::store::TaskStore;

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    cache: Arc<dyn Cache>,
    scheduler: Arc<DeferredDeletionScheduler>,
    cache_ttl: Duration,
    purge_delay: Duration,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        cache: Arc<dyn Cache>,
        scheduler: Arc<DeferredDeletionScheduler>,
        cache_ttl: Duration,
        purge_delay: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            scheduler,
            cache_ttl,
            purge_delay,
        }
    }

    fn invalidate(&self, id: Option<&str>) {
        match id {
            Some(id) => self.cache.forget(&[LIST_KEY, task_key(id).as_str()]),
            None => self.cache.forget(&[LIST_KEY]),
        }
    }

    // == List ==
    /// All active tasks, newest first. May lag writes by up to one TTL.
    pub fn list(&self) -> Result<Vec<Task>> {
        self.cache
            .get_or_compute(LIST_KEY, self.cache_ttl, || self.store.list_active())
    }

    // == Get ==
    pub fn get(&self, id: &str) -> Result<Task> {
        self.cache
            .get_or_compute(&task_key(id), self.cache_ttl, || self.store.find_active(id))
    }

    // == Create ==
    /// Persists a task. Field validation is the caller's job.
    pub fn create(&self, task: NewTask) -> Result<Task> {
        let created = self.store.create(task)?;
        self.invalidate(None);

        info!("Task {} created", created.id);
        Ok(created)
    }

    // == Update ==
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let updated = self.store.update(id, patch)?;
        self.invalidate(Some(id));

        info!("Task {} updated", id);
        Ok(updated)
    }

    // == Delete ==
    /// Soft-deletes a task. Deleting it again reports `NotFound`.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.soft_delete(id)?;
        self.invalidate(Some(id));

        info!("Task {} deleted", id);
        Ok(())
    }

    // == Toggle ==
    /// Flips `completed`. Completing a task schedules its purge; reopening
    /// it schedules nothing and cancels nothing.
    ///
    /// The purge is queued before the flip is saved. If queueing fails the
    /// task is left as it was; if saving fails the queued purge finds the
    /// task still open when it fires and does nothing.
    pub fn toggle(&self, id: &str) -> Result<Task> {
        let current = self.store.find_active(id)?;
        let completing = !current.completed;

        if completing {
            self.scheduler.schedule_purge(id, self.purge_delay)?;
        }
        let toggled = self.store.update(id, &TaskPatch::completed(completing))?;
        self.invalidate(Some(id));

        info!("Task {} toggled, completed={}", id, toggled.completed);
        Ok(toggled)
    }

    // == Restore ==
    /// Brings a soft-deleted task back into listings.
    pub fn restore(&self, id: &str) -> Result<Task> {
        let restored = self.store.restore(id)?;
        self.invalidate(Some(id));

        info!("Task {} restored", id);
        Ok(restored)
    }
}
