//! Background Tasks Module
//!
//! Long-running loops started alongside the HTTP server.
//!
//! # Tasks
//! - Cache sweeper: removes expired cache entries at configured intervals
//! - Purge worker: fires due deferred-deletion jobs

mod cache_sweeper;
mod purge_worker;

pub use cache_sweeper::spawn_cache_sweeper;
pub use purge_worker::spawn_purge_worker;
