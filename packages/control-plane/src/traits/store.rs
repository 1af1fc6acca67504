//! Relational store traits.
//!
//! The relational side is split into focused traits:
//! - `QueueStatusStore`: durable pause flag per job type
//! - `TaskStore`: task/execution projection
//! - `ArtifactIndex`: metadata rows of system artifacts
//! - `ScheduleStore`: persisted schedules

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::tx::TxName;
use crate::types::{
    artifact::{ArtifactQuery, SystemArtifact},
    job::JobStatus,
    queue::{QueueStatus, QueueStatusQuery},
    schedule::{CreateSchedule, Schedule, ScheduleQuery},
    task::{StatusRefresh, Task, TaskQuery},
};

/// Durable `job_type → paused` mapping.
#[async_trait]
pub trait QueueStatusStore: Send + Sync {
    async fn get_by_job_type(&self, job_type: &str) -> Result<Option<QueueStatus>>;

    async fn query(&self, query: &QueueStatusQuery) -> Result<Vec<QueueStatus>>;

    /// Upsert keyed by `job_type`. The returned id is stable across updates.
    async fn insert_or_update(&self, row: &QueueStatus) -> Result<i64>;

    /// Upsert `paused` for a job type inside the named transaction.
    async fn update_status(&self, job_type: &str, paused: bool, tx: TxName) -> Result<()>;

    /// Snapshot of every stored pause flag.
    async fn all_job_type_status(&self) -> Result<HashMap<String, bool>> {
        Ok(self
            .query(&QueueStatusQuery::default())
            .await?
            .into_iter()
            .map(|row| (row.job_type, row.paused))
            .collect())
    }
}

/// Task and execution records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>>;

    /// Move one task to `Stopped` inside the named transaction. Tasks already
    /// in a final status are left alone.
    async fn stop(&self, task_id: i64, tx: TxName) -> Result<()>;

    /// Executions with at least one task of `vendor_type` in `status`.
    async fn execution_ids_by_vendor_and_status(
        &self,
        vendor_type: &str,
        status: JobStatus,
    ) -> Result<Vec<i64>>;

    /// Set the status of the tasks behind `job_ids`, at most `batch_size` rows
    /// per statement. Only non-final tasks change.
    async fn update_status_in_batch(
        &self,
        job_ids: &[String],
        status: JobStatus,
        batch_size: usize,
    ) -> Result<()>;

    /// Recompute the aggregate status of an execution from its tasks.
    async fn refresh_status(&self, execution_id: i64) -> Result<StatusRefresh>;

    /// Raw log of one job.
    async fn get_log_by_job_id(&self, job_id: &str) -> Result<Vec<u8>>;
}

/// Metadata index of system artifacts.
#[async_trait]
pub trait ArtifactIndex: Send + Sync {
    /// Insert a row. Duplicates fail with `Conflict`.
    async fn create(&self, artifact: &SystemArtifact) -> Result<i64>;

    async fn get(&self, vendor: &str, repository: &str, digest: &str) -> Result<SystemArtifact>;

    async fn delete(&self, vendor: &str, repository: &str, digest: &str) -> Result<()>;

    async fn list(&self, query: &ArtifactQuery) -> Result<Vec<SystemArtifact>>;

    /// Sum of `size` over all rows.
    async fn size(&self) -> Result<i64>;
}

/// Persisted schedules.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, schedule: &CreateSchedule) -> Result<i64>;

    async fn get(&self, id: i64) -> Result<Schedule>;

    async fn list(&self, query: &ScheduleQuery) -> Result<Vec<Schedule>>;

    async fn count(&self, query: &ScheduleQuery) -> Result<i64> {
        Ok(self.list(query).await?.len() as i64)
    }

    async fn delete(&self, id: i64) -> Result<()>;
}
