//! Testing utilities including in-memory doubles.
//!
//! These are useful for testing code that drives the control plane without a
//! running Redis or registry.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::error::{ControlError, Result};
use crate::traits::{
    blob::{BlobReader, BlobStore},
    jobservice::{JobKeyspace, MonitorClient},
    selector::Selector,
    store::ArtifactIndex,
};
use crate::types::{
    artifact::SystemArtifact,
    job::PendingJob,
    monitor::{Heartbeat, Observation, QueueSample},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record of a call made to [`MemoryJobService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobServiceCall {
    PauseJob { job_type: String },
    UnpauseJob { job_type: String },
    StopPendingJobs { job_type: String },
}

#[derive(Default)]
struct JobServiceState {
    known_jobs: BTreeSet<String>,
    /// Raw list elements, head first.
    pending: HashMap<String, Vec<String>>,
    paused: HashSet<String>,
    job_status: HashSet<String>,
    in_progress: HashSet<String>,
    heartbeats: Vec<Heartbeat>,
    observations: Vec<Observation>,
    failing_job_types: HashSet<String>,
    concurrently_drained: HashSet<String>,
    monitor_down: bool,
    calls: Vec<JobServiceCall>,
}

/// In-memory stand-in for the job service's Redis namespace.
///
/// Implements both [`JobKeyspace`] and [`MonitorClient`] so the keyspace
/// writes and the observation reads share one state.
#[derive(Default, Clone)]
pub struct MemoryJobService {
    state: Arc<Mutex<JobServiceState>>,
}

impl MemoryJobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type, as a worker would on start.
    pub fn with_job_type(self, job_type: &str) -> Self {
        lock(&self.state).known_jobs.insert(job_type.to_string());
        self
    }

    pub fn with_heartbeat(self, heartbeat: Heartbeat) -> Self {
        lock(&self.state).heartbeats.push(heartbeat);
        self
    }

    pub fn with_observation(self, observation: Observation) -> Self {
        lock(&self.state).observations.push(observation);
        self
    }

    /// Every keyspace call on this job type fails with a Redis error.
    pub fn with_failing_job_type(self, job_type: &str) -> Self {
        lock(&self.state)
            .failing_job_types
            .insert(job_type.to_string());
        self
    }

    /// Another actor deletes the pending list of this job type between the
    /// read and the delete of the next drain.
    pub fn with_concurrent_drain(self, job_type: &str) -> Self {
        lock(&self.state)
            .concurrently_drained
            .insert(job_type.to_string());
        self
    }

    /// Monitor reads fail.
    pub fn with_monitor_down(self) -> Self {
        lock(&self.state).monitor_down = true;
        self
    }

    /// Append a raw element to the tail of a pending list.
    pub fn push_raw(&self, job_type: &str, element: &str) {
        let mut state = lock(&self.state);
        state.known_jobs.insert(job_type.to_string());
        state
            .pending
            .entry(job_type.to_string())
            .or_default()
            .push(element.to_string());
    }

    /// Append a pending job with tracking keys to the tail of its list.
    pub fn push_pending(&self, job_type: &str, job_id: &str, enqueued_at: i64) {
        let job = PendingJob {
            id: job_id.to_string(),
            name: Some(job_type.to_string()),
            enqueued_at: Some(enqueued_at),
        };
        let element = serde_json::to_string(&job).unwrap_or_default();
        self.push_raw(job_type, &element);
        let mut state = lock(&self.state);
        state.job_status.insert(job_id.to_string());
        state.in_progress.insert(job_id.to_string());
    }

    pub fn pending_len(&self, job_type: &str) -> usize {
        lock(&self.state).pending.get(job_type).map_or(0, Vec::len)
    }

    /// Whether the pending list key exists.
    pub fn has_pending_list(&self, job_type: &str) -> bool {
        lock(&self.state).pending.contains_key(job_type)
    }

    pub fn is_paused(&self, job_type: &str) -> bool {
        lock(&self.state).paused.contains(job_type)
    }

    /// Whether the per-job tracking keys still exist.
    pub fn is_tracked(&self, job_id: &str) -> bool {
        let state = lock(&self.state);
        state.job_status.contains(job_id) || state.in_progress.contains(job_id)
    }

    pub fn calls(&self) -> Vec<JobServiceCall> {
        lock(&self.state).calls.clone()
    }

    fn check(state: &JobServiceState, job_type: &str) -> Result<()> {
        if state.failing_job_types.contains(job_type) {
            return Err(ControlError::redis(format!("injected failure for {job_type}")));
        }
        Ok(())
    }
}

#[async_trait]
impl JobKeyspace for MemoryJobService {
    async fn all_job_types(&self) -> Result<Vec<String>> {
        Ok(lock(&self.state).known_jobs.iter().cloned().collect())
    }

    async fn pause_job(&self, job_type: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(JobServiceCall::PauseJob {
            job_type: job_type.to_string(),
        });
        Self::check(&state, job_type)?;
        state.paused.insert(job_type.to_string());
        Ok(())
    }

    async fn unpause_job(&self, job_type: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(JobServiceCall::UnpauseJob {
            job_type: job_type.to_string(),
        });
        Self::check(&state, job_type)?;
        state.paused.remove(job_type);
        Ok(())
    }

    async fn stop_pending_jobs(&self, job_type: &str) -> Result<Vec<String>> {
        let mut state = lock(&self.state);
        state.calls.push(JobServiceCall::StopPendingJobs {
            job_type: job_type.to_string(),
        });
        Self::check(&state, job_type)?;

        let elements = state.pending.get(job_type).cloned().unwrap_or_default();
        if elements.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(elements.len());
        for element in &elements {
            match serde_json::from_str::<PendingJob>(element) {
                Ok(job) => ids.push(job.id),
                Err(e) => warn!(job_type, error = %e, "skipping malformed pending job"),
            }
        }

        let removed = state.pending.remove(job_type).is_some()
            && !state.concurrently_drained.remove(job_type);
        if !removed {
            return Err(ControlError::NoJobRemoved);
        }

        for id in &ids {
            state.job_status.remove(id);
            state.in_progress.remove(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl MonitorClient for MemoryJobService {
    async fn worker_pool_heartbeats(&self) -> Result<Vec<Heartbeat>> {
        let state = lock(&self.state);
        if state.monitor_down {
            return Err(ControlError::monitor("monitor unavailable"));
        }
        Ok(state.heartbeats.clone())
    }

    async fn worker_observations(&self) -> Result<Vec<Observation>> {
        let state = lock(&self.state);
        if state.monitor_down {
            return Err(ControlError::monitor("monitor unavailable"));
        }
        Ok(state.observations.clone())
    }

    async fn queues(&self) -> Result<Vec<QueueSample>> {
        let state = lock(&self.state);
        if state.monitor_down {
            return Err(ControlError::monitor("monitor unavailable"));
        }
        let now = Utc::now().timestamp();
        let mut samples: Vec<QueueSample> = state
            .known_jobs
            .iter()
            .map(|name| {
                let list = state.pending.get(name);
                let latency = list
                    .and_then(|l| l.last())
                    .and_then(|tail| serde_json::from_str::<PendingJob>(tail).ok())
                    .and_then(|job| job.enqueued_at)
                    .map_or(0, |t| (now - t).max(0));
                QueueSample {
                    job_name: name.clone(),
                    count: list.map_or(0, |l| l.len() as i64),
                    latency,
                }
            })
            .collect();
        samples.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        Ok(samples)
    }
}

/// In-memory blob store with failure injection.
#[derive(Default, Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<(String, String), Bytes>>>,
    fail_push: Arc<Mutex<bool>>,
    fail_delete: Arc<Mutex<bool>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every push fail.
    pub fn fail_pushes(&self, fail: bool) {
        *lock(&self.fail_push) = fail;
    }

    /// Make every delete fail.
    pub fn fail_deletes(&self, fail: bool) {
        *lock(&self.fail_delete) = fail;
    }

    pub fn contains(&self, repository: &str, digest: &str) -> bool {
        lock(&self.blobs).contains_key(&(repository.to_string(), digest.to_string()))
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn push_blob(&self, repository: &str, digest: &str, _size: i64, mut content: BlobReader) -> Result<()> {
        if *lock(&self.fail_push) {
            return Err(ControlError::blob(format!("push of {repository}@{digest} rejected")));
        }
        let mut buf = Vec::new();
        content
            .read_to_end(&mut buf)
            .await
            .map_err(ControlError::blob)?;
        lock(&self.blobs).insert((repository.to_string(), digest.to_string()), Bytes::from(buf));
        Ok(())
    }

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<BlobReader> {
        let blob = lock(&self.blobs)
            .get(&(repository.to_string(), digest.to_string()))
            .cloned()
            .ok_or_else(|| ControlError::NotFound(format!("blob {repository}@{digest}")))?;
        Ok(Box::new(std::io::Cursor::new(blob)))
    }

    async fn delete_blob(&self, repository: &str, digest: &str) -> Result<()> {
        if *lock(&self.fail_delete) {
            return Err(ControlError::blob(format!("delete of {repository}@{digest} rejected")));
        }
        lock(&self.blobs)
            .remove(&(repository.to_string(), digest.to_string()))
            .map(|_| ())
            .ok_or_else(|| ControlError::NotFound(format!("blob {repository}@{digest}")))
    }

    async fn blob_exists(&self, repository: &str, digest: &str) -> Result<bool> {
        Ok(self.contains(repository, digest))
    }
}

/// Selector that returns a fixed list, or fails.
pub struct StaticSelector {
    result: std::result::Result<Vec<SystemArtifact>, String>,
}

impl StaticSelector {
    pub fn new(artifacts: Vec<SystemArtifact>) -> Self {
        Self {
            result: Ok(artifacts),
        }
    }

    /// A selector whose enumeration fails with a database error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
        }
    }
}

#[async_trait]
impl Selector for StaticSelector {
    async fn list(&self, _index: &dyn ArtifactIndex) -> Result<Vec<SystemArtifact>> {
        self.result
            .clone()
            .map_err(ControlError::database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_returns_ids_in_list_order_and_skips_malformed() {
        let service = MemoryJobService::new();
        service.push_pending("GC", "a", 1);
        service.push_raw("GC", "not json");
        service.push_pending("GC", "b", 2);

        let ids = service.stop_pending_jobs("GC").await.unwrap();

        assert_eq!(ids, vec!["a", "b"]);
        assert!(!service.has_pending_list("GC"));
        assert!(!service.is_tracked("a"));
    }

    #[tokio::test]
    async fn concurrent_drain_reports_no_job_removed() {
        let service = MemoryJobService::new().with_concurrent_drain("GC");
        service.push_pending("GC", "a", 1);

        let result = service.stop_pending_jobs("GC").await;

        assert!(matches!(result, Err(ControlError::NoJobRemoved)));
    }

    #[tokio::test]
    async fn queue_latency_uses_tail_element() {
        let service = MemoryJobService::new().with_job_type("IDLE");
        let now = Utc::now().timestamp();
        service.push_pending("GC", "a", now - 5);
        service.push_pending("GC", "b", now - 30);

        let queues = service.queues().await.unwrap();

        assert_eq!(queues[0].job_name, "GC");
        assert_eq!(queues[0].count, 2);
        assert!(queues[0].latency >= 30);
        assert_eq!(queues[1].job_name, "IDLE");
        assert_eq!(queues[1].latency, 0);
    }
}
