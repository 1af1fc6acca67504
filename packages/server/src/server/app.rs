//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};
use control_plane::{
    CleanupRegistry, JobServiceController, PostgresStore, RedisJobService, RegistryBlobStore,
    RequestContext, SchedulerController, SystemArtifactManager,
};
use sqlx::PgPool;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::server::routes::{
    cleanup_handler, get_job_log_handler, health_handler, list_pools_handler,
    list_queues_handler, list_schedules_handler, list_workers_handler, queue_action_handler,
    scheduler_paused_handler, stop_job_handler, storage_size_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jobservice: RedisJobService,
    pub controller: Arc<JobServiceController>,
    pub scheduler: Arc<SchedulerController>,
    pub artifacts: Arc<SystemArtifactManager>,
    /// Parent of every request context. Cancelled at shutdown.
    pub root_ctx: RequestContext,
}

impl AppState {
    /// Wire the controllers over Postgres, the job service Redis and the
    /// registry. The Redis pool is checked with a `PING` before returning.
    pub async fn connect(config: &Config, db_pool: PgPool) -> Result<Self> {
        let jobservice = RedisJobService::connect(&config.jobservice())
            .await
            .context("Failed to connect to job service redis")?;
        let store = Arc::new(PostgresStore::from_pool(db_pool.clone()));
        let blobs = Arc::new(RegistryBlobStore::new(config.registry()));

        let service = Arc::new(jobservice.clone());
        let controller = JobServiceController::new(service.clone(), service, store.clone(), store.clone());
        let scheduler = SchedulerController::new(store.clone(), store.clone());
        let artifacts = SystemArtifactManager::new(store, blobs, CleanupRegistry::new());

        Ok(Self {
            db_pool,
            jobservice,
            controller: Arc::new(controller),
            scheduler: Arc::new(scheduler),
            artifacts: Arc::new(artifacts),
            root_ctx: RequestContext::background(),
        })
    }

    /// Tie the root request context to a process-wide shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.root_ctx = RequestContext::with_token(shutdown);
        self
    }

    /// A context for one request. It is cancelled when the returned guard
    /// drops, which happens when axum drops the handler future.
    pub fn request_ctx(&self) -> (RequestContext, DropGuard) {
        let ctx = self.root_ctx.child();
        let guard = ctx.drop_guard();
        (ctx, guard)
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/jobservice/pools", get(list_pools_handler))
        .route("/jobservice/pools/:pool_id/workers", get(list_workers_handler))
        .route("/jobservice/jobs/:job_id", put(stop_job_handler))
        .route("/jobservice/jobs/:job_id/log", get(get_job_log_handler))
        .route("/jobservice/queues", get(list_queues_handler))
        .route("/jobservice/queues/:job_type", put(queue_action_handler))
        .route("/schedules", get(list_schedules_handler))
        .route("/schedules/:job_type/paused", get(scheduler_paused_handler))
        .route("/system/artifacts/size", get(storage_size_handler))
        .route("/system/artifacts/cleanup", post(cleanup_handler));

    Router::new()
        .nest("/api/v2.0", api)
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
