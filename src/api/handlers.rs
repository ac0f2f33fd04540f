//! API Handlers
//!
//! HTTP request handlers for each task endpoint. Service calls hit SQLite,
//! so they run on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::background::{spawn_cache_sweeper, spawn_purge_worker};
use crate::cache::{Cache, MemoryCache};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ApiResponse, CreateTaskRequest, HealthResponse, StatsResponse, Task, UpdateTaskRequest,
};
use crate::scheduler::{DeferredDeletionScheduler, SqlitePurgeQueue};
use crate::service::TaskService;
use crate::store::{Database, SqliteTaskStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TaskService>,
    pub scheduler: Arc<DeferredDeletionScheduler>,
    /// Concrete cache handle, kept for statistics and sweeping
    pub cache: Arc<MemoryCache>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Opens the database named in `config` and wires the components together.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let store = Arc::new(SqliteTaskStore::new(db.clone()));
        let cache = Arc::new(MemoryCache::new());
        let shared_cache: Arc<dyn Cache> = cache.clone();

        let scheduler = Arc::new(DeferredDeletionScheduler::new(
            store.clone(),
            shared_cache.clone(),
            Arc::new(SqlitePurgeQueue::new(db)),
            config.purge_max_attempts,
            Duration::from_secs(config.purge_poll_interval),
        ));
        let service = Arc::new(TaskService::new(
            store,
            shared_cache,
            scheduler.clone(),
            config.cache_ttl(),
            config.purge_delay(),
        ));

        Ok(Self {
            service,
            scheduler,
            cache,
            config: Arc::new(config.clone()),
        })
    }

    /// Starts the cache sweeper and purge worker.
    pub fn spawn_background(&self) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            spawn_cache_sweeper(self.cache.clone(), self.config.cache_cleanup_interval),
            spawn_purge_worker(self.scheduler.clone(), self.config.purge_poll_interval),
        ]
    }
}

/// Runs a service call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&TaskService) -> Result<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service)).await?
}

/// Handler for GET /api/tasks
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Task>>>> {
    let tasks = blocking(&state, |service| service.list()).await?;
    Ok(Json(ApiResponse::ok(tasks, "Tasks listed successfully.")))
}

/// Handler for POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>)> {
    let new_task = req.into_new_task()?;
    let task = blocking(&state, move |service| service.create(new_task)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(task, "Task created successfully.")),
    ))
}

/// Handler for GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = blocking(&state, move |service| service.get(&id)).await?;
    Ok(Json(ApiResponse::ok(task, "Task found successfully.")))
}

/// Handler for PUT/PATCH /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<ApiResponse<Task>>> {
    let patch = req.into_patch()?;
    let task = blocking(&state, move |service| service.update(&id, &patch)).await?;
    Ok(Json(ApiResponse::ok(task, "Task updated successfully.")))
}

/// Handler for DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    blocking(&state, move |service| service.delete(&id)).await?;
    Ok(Json(ApiResponse::message("Task deleted successfully.")))
}

/// Handler for PATCH /api/tasks/:id/toggle
pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = blocking(&state, move |service| service.toggle(&id)).await?;
    let message = if task.completed {
        "Task marked as completed."
    } else {
        "Task marked as not completed."
    };
    Ok(Json(ApiResponse::ok(task, message)))
}

/// Handler for POST /api/tasks/:id/restore
pub async fn restore_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = blocking(&state, move |service| service.restore(&id)).await?;
    Ok(Json(ApiResponse::ok(task, "Task restored successfully.")))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let scheduler = state.scheduler.clone();
    let pending = tokio::task::spawn_blocking(move || scheduler.pending_count()).await??;
    Ok(Json(StatsResponse::new(&state.cache.stats(), pending)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
