//! Schedule routes.

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use control_plane::ScheduleQuery;
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListSchedulesParams {
    pub vendor_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub paused: bool,
}

pub async fn list_schedules_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListSchedulesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ScheduleQuery {
        vendor_type: params.vendor_type,
        vendor_id: None,
    };
    let schedules = state.scheduler.list(&query).await?;
    let total = state.scheduler.count(&query).await?;
    Ok(([("x-total-count", total.to_string())], Json(schedules)))
}

/// Whether the scheduler job type is paused. Only `all` is accepted.
pub async fn scheduler_paused_handler(
    Extension(state): Extension<AppState>,
    Path(job_type): Path<String>,
) -> Result<Json<SchedulerStatus>, ApiError> {
    if !job_type.eq_ignore_ascii_case("all") {
        return Err(ApiError::BadRequest(format!(
            "job type {job_type} is not supported, only all"
        )));
    }
    let paused = state.scheduler.paused().await?;
    Ok(Json(SchedulerStatus { paused }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use control_plane::testing::MemoryJobService;
    use control_plane::{CreateSchedule, MemoryStore, QueueStatus, QueueStatusStore, ScheduleStore};
    use tower::ServiceExt;

    use crate::server::app::{build_app, test_support::memory_state};

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn schedules_filter_by_vendor_type() {
        let store = Arc::new(MemoryStore::new());
        for vendor_type in ["GARBAGE_COLLECTION", "SCAN_ALL", "GARBAGE_COLLECTION"] {
            let schedule = CreateSchedule::builder()
                .vendor_type(vendor_type)
                .cron("0 0 * * * *")
                .callback_func_name("callback")
                .build();
            ScheduleStore::create(store.as_ref(), &schedule).await.unwrap();
        }
        let app = build_app(memory_state(MemoryJobService::new(), store));

        let resp = app
            .oneshot(get("/api/v2.0/schedules?vendor_type=GARBAGE_COLLECTION"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["x-total-count"], "2");
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn scheduler_paused_reflects_the_scheduler_row() {
        let store = Arc::new(MemoryStore::new());
        let app = build_app(memory_state(MemoryJobService::new(), store.clone()));

        let resp = app.clone().oneshot(get("/api/v2.0/schedules/all/paused")).await.unwrap();
        assert_eq!(body_json(resp).await["paused"], false);

        store
            .insert_or_update(&QueueStatus::new("SCHEDULER", true))
            .await
            .unwrap();
        let resp = app.oneshot(get("/api/v2.0/schedules/all/paused")).await.unwrap();
        assert_eq!(body_json(resp).await["paused"], true);
    }

    #[tokio::test]
    async fn scheduler_paused_only_accepts_all() {
        let app = build_app(memory_state(MemoryJobService::new(), Arc::new(MemoryStore::new())));
        let resp = app
            .oneshot(get("/api/v2.0/schedules/GARBAGE_COLLECTION/paused"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }
}
