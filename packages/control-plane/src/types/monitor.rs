//! Snapshots read from the job service's observation schema, and the views
//! projected from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heartbeat of one worker pool process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub worker_pool_id: String,
    pub pid: i64,
    /// Unix seconds.
    pub started_at: i64,
    /// Unix seconds.
    pub heartbeat_at: i64,
    pub concurrency: u32,
    pub host: String,
    pub job_names: Vec<String>,
    pub worker_ids: Vec<String>,
}

/// What one worker is doing right now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub worker_id: String,
    pub is_busy: bool,
    pub job_name: String,
    pub job_id: String,
    pub args_json: String,
    /// Unix seconds.
    pub started_at: i64,
    pub check_in: String,
    /// Unix seconds.
    pub check_in_at: i64,
}

/// Depth and latency of one job-type queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSample {
    pub job_name: String,
    pub count: i64,
    /// Seconds the oldest pending job has been waiting.
    pub latency: i64,
}

/// A worker pool as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPool {
    pub pool_id: String,
    pub pid: i64,
    pub host: String,
    pub concurrency: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
}

/// A worker as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: String,
    /// Empty when no heartbeat in the same snapshot owns the worker.
    pub pool_id: String,
    pub is_busy: bool,
    pub job_name: String,
    pub job_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub check_in: String,
    pub check_in_at: Option<DateTime<Utc>>,
}

/// Convert unix seconds into a timestamp; zero means "never".
pub(crate) fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}
