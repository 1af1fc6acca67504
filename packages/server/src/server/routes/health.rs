use std::future::Future;
use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: ComponentHealth,
    redis: ComponentHealth,
    connection_pool: ConnectionPoolHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_connections: Option<u32>,
}

async fn probe<F, E>(check: F) -> ComponentHealth
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(())) => ComponentHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => ComponentHealth {
            status: "error".to_string(),
            error: Some(format!("Check failed: {}", e)),
        },
        Err(_) => ComponentHealth {
            status: "error".to_string(),
            error: Some(format!("Check timeout (>{}s)", CHECK_TIMEOUT.as_secs())),
        },
    }
}

/// Health check endpoint
///
/// Checks:
/// - Database connectivity and responsiveness
/// - Job service Redis connectivity
///
/// Returns 200 OK if both are healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = probe(async {
        sqlx::query("SELECT 1")
            .execute(&state.db_pool)
            .await
            .map(|_| ())
    })
    .await;
    let redis = probe(state.jobservice.ping()).await;

    let pool_options = state.db_pool.options();
    let connection_pool = ConnectionPoolHealth {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
        max_connections: Some(pool_options.get_max_connections()),
    };

    let is_healthy = database.status == "ok" && redis.status == "ok";
    let (status_code, status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            redis,
            connection_pool,
        }),
    )
}
