//! Job service monitor and control routes.

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use control_plane::{Queue, Worker, WorkerPool};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Stop,
    Pause,
    Resume,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
}

pub async fn list_pools_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<WorkerPool>>, ApiError> {
    Ok(Json(state.controller.list_pools().await?))
}

pub async fn list_workers_handler(
    Extension(state): Extension<AppState>,
    Path(pool_id): Path<String>,
) -> Result<Json<Vec<Worker>>, ApiError> {
    Ok(Json(state.controller.list_workers(&pool_id).await?))
}

/// Stop one running job, or every running job for `all`.
pub async fn stop_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<StatusCode, ApiError> {
    if request.action != Action::Stop {
        return Err(ApiError::BadRequest(format!(
            "action {:?} is not supported for running jobs",
            request.action
        )));
    }
    let (ctx, _cancel_on_drop) = state.request_ctx();
    state.controller.stop_running_jobs(Some(&ctx), &job_id).await?;
    Ok(StatusCode::OK)
}

pub async fn get_job_log_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let log = state.controller.get_job_log(&job_id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], log))
}

pub async fn list_queues_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Queue>>, ApiError> {
    Ok(Json(state.controller.list_queues().await?))
}

/// Drain, pause or resume one job type, or every job type for `all`.
pub async fn queue_action_handler(
    Extension(state): Extension<AppState>,
    Path(job_type): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<StatusCode, ApiError> {
    let (ctx, _cancel_on_drop) = state.request_ctx();
    let controller = &state.controller;
    match request.action {
        Action::Stop => controller.stop_pending_jobs(Some(&ctx), &job_type).await?,
        Action::Pause => controller.pause_job_queues(Some(&ctx), &job_type).await?,
        Action::Resume => controller.resume_job_queues(Some(&ctx), &job_type).await?,
    }
    Ok(StatusCode::OK)
}
