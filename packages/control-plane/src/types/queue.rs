//! Queue views and the durable queue status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One job-type queue, merged from live depth and durable pause status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub job_type: String,
    pub count: i64,
    pub latency: i64,
    pub paused: bool,
}

/// Row of the `job_queue_status` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct QueueStatus {
    pub id: i64,
    pub job_type: String,
    pub paused: bool,
    pub update_time: DateTime<Utc>,
}

impl QueueStatus {
    /// A row that has not been stored yet.
    pub fn new(job_type: impl Into<String>, paused: bool) -> Self {
        Self {
            id: 0,
            job_type: job_type.into(),
            paused,
            update_time: Utc::now(),
        }
    }
}

/// Filter for [`QueueStatusStore::query`](crate::traits::QueueStatusStore::query).
#[derive(Debug, Clone, Default)]
pub struct QueueStatusQuery {
    pub job_type: Option<String>,
    pub paused: Option<bool>,
}

impl QueueStatusQuery {
    pub fn matches(&self, row: &QueueStatus) -> bool {
        self.job_type.as_deref().map_or(true, |t| t == row.job_type)
            && self.paused.map_or(true, |p| p == row.paused)
    }
}
