//! Traits over the job service's Redis namespace.
//!
//! - `JobKeyspace`: the writes the control plane is allowed to make
//! - `MonitorClient`: read-only observation snapshots

use async_trait::async_trait;

use crate::error::Result;
use crate::types::monitor::{Heartbeat, Observation, QueueSample};

/// Typed operations over the job service's key layout.
#[async_trait]
pub trait JobKeyspace: Send + Sync {
    /// Every job type a worker has registered.
    async fn all_job_types(&self) -> Result<Vec<String>>;

    /// Set the pause flag of a job type. Idempotent.
    async fn pause_job(&self, job_type: &str) -> Result<()>;

    /// Clear the pause flag of a job type. Idempotent.
    async fn unpause_job(&self, job_type: &str) -> Result<()>;

    /// Drain the pending queue of a job type and return the drained job ids
    /// in queue order.
    ///
    /// Returns [`ControlError::NoJobRemoved`](crate::ControlError::NoJobRemoved)
    /// when the queue disappeared between reading and deleting it.
    async fn stop_pending_jobs(&self, job_type: &str) -> Result<Vec<String>>;
}

/// Read-only snapshots of worker pools, workers and queues.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn worker_pool_heartbeats(&self) -> Result<Vec<Heartbeat>>;

    async fn worker_observations(&self) -> Result<Vec<Observation>>;

    async fn queues(&self) -> Result<Vec<QueueSample>>;
}
