//! Deferred Deletion Module
//!
//! Durable delayed purge jobs and the re-check-on-fire purge action.

mod purge;
mod queue;

pub use purge::{DeferredDeletionScheduler, PurgeOutcome, PurgeReport};
pub use queue::{PurgeJob, PurgeQueue, SqlitePurgeQueue};
