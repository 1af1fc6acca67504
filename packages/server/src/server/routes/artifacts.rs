//! System-artifact maintenance routes.

use axum::{extract::Extension, Json};
use control_plane::CleanupReport;
use serde::Serialize;

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
pub struct StorageSize {
    pub total_size: i64,
}

pub async fn storage_size_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<StorageSize>, ApiError> {
    let total_size = state.artifacts.get_storage_size().await?;
    Ok(Json(StorageSize { total_size }))
}

/// Run one cleanup pass now, outside the daily schedule.
pub async fn cleanup_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<CleanupReport>, ApiError> {
    let report = state.artifacts.cleanup().await?;
    tracing::info!(
        deleted = report.deleted,
        reclaimed_bytes = report.reclaimed_bytes,
        "system artifact cleanup finished"
    );
    Ok(Json(report))
}
