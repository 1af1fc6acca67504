//! Row and keyspace fixtures for integration tests.

use anyhow::Result;
use control_plane::{JobStatus, RedisKeys};
use redis::AsyncCommands;
use sqlx::PgPool;

pub async fn insert_execution(pool: &PgPool, vendor_type: &str, status: JobStatus) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO execution (vendor_type, status) VALUES ($1, $2) RETURNING id",
    )
    .bind(vendor_type)
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn insert_task(
    pool: &PgPool,
    execution_id: i64,
    job_id: &str,
    vendor_type: &str,
    status: JobStatus,
) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO task (execution_id, job_id, vendor_type, status, end_time)
        VALUES ($1, $2, $3, $4, CASE WHEN $5 THEN NOW() END)
        RETURNING id
        "#,
    )
    .bind(execution_id)
    .bind(job_id)
    .bind(vendor_type)
    .bind(status.as_str())
    .bind(status.is_final())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn task_status(pool: &PgPool, task_id: i64) -> Result<String> {
    let (status,): (String,) = sqlx::query_as("SELECT status FROM task WHERE id = $1")
        .bind(task_id)
        .fetch_one(pool)
        .await?;
    Ok(status)
}

pub async fn execution_status(pool: &PgPool, execution_id: i64) -> Result<String> {
    let (status,): (String,) = sqlx::query_as("SELECT status FROM execution WHERE id = $1")
        .bind(execution_id)
        .fetch_one(pool)
        .await?;
    Ok(status)
}

/// Append pending jobs to a job type's queue in the given order.
pub async fn push_pending(
    conn: &mut redis::aio::MultiplexedConnection,
    keys: &RedisKeys,
    job_type: &str,
    job_ids: &[String],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    conn.sadd::<_, _, ()>(keys.known_jobs(), job_type).await?;
    for chunk in job_ids.chunks(500) {
        let elements: Vec<String> = chunk
            .iter()
            .map(|id| serde_json::json!({ "id": id, "name": job_type, "t": now }).to_string())
            .collect();
        conn.rpush::<_, _, ()>(keys.jobs(job_type), elements).await?;
    }
    Ok(())
}
