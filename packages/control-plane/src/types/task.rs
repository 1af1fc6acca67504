//! Task and execution records.
//!
//! Tasks are created by job submission elsewhere; the control plane only
//! moves their `status` and refreshes the owning execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Row of the `task` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Task {
    pub id: i64,
    pub execution_id: i64,
    pub job_id: String,
    pub vendor_type: String,
    pub status: String,
    pub status_message: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Parsed status; `None` for values written by an unknown producer.
    pub fn job_status(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }
}

/// Row of the `execution` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Execution {
    pub id: i64,
    pub vendor_type: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub update_time: DateTime<Utc>,
}

/// Keyword filter for listing tasks. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub job_id: Option<String>,
    pub vendor_type: Option<String>,
    pub status: Option<JobStatus>,
    pub execution_id: Option<i64>,
}

impl TaskQuery {
    pub fn by_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.job_id.as_deref().map_or(true, |j| j == task.job_id)
            && self.vendor_type.as_deref().map_or(true, |v| v == task.vendor_type)
            && self.status.map_or(true, |s| s.as_str() == task.status)
            && self.execution_id.map_or(true, |e| e == task.execution_id)
    }
}

/// Result of refreshing an execution's aggregate status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRefresh {
    pub changed: bool,
    /// `None` when the execution has no tasks and was left alone.
    pub status: Option<JobStatus>,
}
