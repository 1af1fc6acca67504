//! In-memory storage implementation for testing and development.
//!
//! Implements every relational store trait over plain collections and records
//! the mutations it receives, so tests can assert on transaction names and
//! batch sizes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ControlError, Result};
use crate::traits::store::{ArtifactIndex, QueueStatusStore, ScheduleStore, TaskStore};
use crate::tx::TxName;
use crate::types::{
    artifact::{ArtifactQuery, SystemArtifact},
    job::JobStatus,
    queue::{QueueStatus, QueueStatusQuery},
    schedule::{CreateSchedule, Schedule, ScheduleQuery},
    task::{Execution, StatusRefresh, Task, TaskQuery},
};

/// Record of a mutation received by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    UpdateQueueStatus {
        job_type: String,
        paused: bool,
        tx: TxName,
    },
    StopTask {
        task_id: i64,
        tx: TxName,
    },
    /// One statement of a batched status update.
    UpdateStatusBatch {
        job_ids: Vec<String>,
        status: JobStatus,
    },
    RefreshStatus {
        execution_id: i64,
    },
}

/// In-memory relational store.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    queue_status: Mutex<Vec<QueueStatus>>,
    executions: Mutex<Vec<Execution>>,
    tasks: Mutex<Vec<Task>>,
    logs: Mutex<HashMap<String, String>>,
    artifacts: Mutex<Vec<SystemArtifact>>,
    schedules: Mutex<Vec<Schedule>>,
    calls: Mutex<Vec<StoreCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    /// Every mutation received so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Insert an execution with no tasks.
    pub fn insert_execution(&self, vendor_type: &str, status: JobStatus) -> i64 {
        let id = self.next_id();
        let now = Utc::now();
        lock(&self.executions).push(Execution {
            id,
            vendor_type: vendor_type.to_string(),
            status: status.to_string(),
            start_time: now,
            end_time: None,
            update_time: now,
        });
        id
    }

    /// Insert a task under an existing execution.
    pub fn insert_task(
        &self,
        execution_id: i64,
        job_id: &str,
        vendor_type: &str,
        status: JobStatus,
    ) -> i64 {
        let id = self.next_id();
        let now = Utc::now();
        lock(&self.tasks).push(Task {
            id,
            execution_id,
            job_id: job_id.to_string(),
            vendor_type: vendor_type.to_string(),
            status: status.to_string(),
            status_message: None,
            creation_time: now,
            update_time: now,
            end_time: status.is_final().then_some(now),
        });
        id
    }

    /// Store the log of one job.
    pub fn insert_log(&self, job_id: &str, content: &str) {
        lock(&self.logs).insert(job_id.to_string(), content.to_string());
    }

    pub fn task(&self, task_id: i64) -> Option<Task> {
        lock(&self.tasks).iter().find(|t| t.id == task_id).cloned()
    }

    pub fn execution(&self, execution_id: i64) -> Option<Execution> {
        lock(&self.executions)
            .iter()
            .find(|e| e.id == execution_id)
            .cloned()
    }

    /// Number of stored artifact rows.
    pub fn artifact_count(&self) -> usize {
        lock(&self.artifacts).len()
    }

    fn upsert_queue_status(&self, job_type: &str, paused: bool) -> i64 {
        let mut rows = lock(&self.queue_status);
        if let Some(row) = rows.iter_mut().find(|r| r.job_type == job_type) {
            row.paused = paused;
            row.update_time = Utc::now();
            return row.id;
        }
        let id = self.next_id();
        rows.push(QueueStatus {
            id,
            ..QueueStatus::new(job_type, paused)
        });
        id
    }

    fn refresh(&self, execution_id: i64) -> Result<StatusRefresh> {
        let (status, end_time) = {
            let tasks = lock(&self.tasks);
            let owned: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.execution_id == execution_id)
                .collect();
            let status = JobStatus::aggregate(owned.iter().filter_map(|t| t.job_status()));
            let end_time: Option<DateTime<Utc>> = owned.iter().filter_map(|t| t.end_time).max();
            (status, end_time)
        };

        let mut executions = lock(&self.executions);
        let execution = executions
            .iter_mut()
            .find(|e| e.id == execution_id)
            .ok_or_else(|| ControlError::NotFound(format!("execution {execution_id}")))?;

        let Some(status) = status else {
            return Ok(StatusRefresh {
                changed: false,
                status: None,
            });
        };
        let end_time = if status.is_final() { end_time } else { None };
        let changed = execution.status != status.as_str() || execution.end_time != end_time;
        if changed {
            execution.status = status.to_string();
            execution.end_time = end_time;
            execution.update_time = Utc::now();
        }
        Ok(StatusRefresh {
            changed,
            status: Some(status),
        })
    }
}

#[async_trait]
impl QueueStatusStore for MemoryStore {
    async fn get_by_job_type(&self, job_type: &str) -> Result<Option<QueueStatus>> {
        Ok(lock(&self.queue_status)
            .iter()
            .find(|r| r.job_type == job_type)
            .cloned())
    }

    async fn query(&self, query: &QueueStatusQuery) -> Result<Vec<QueueStatus>> {
        Ok(lock(&self.queue_status)
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn insert_or_update(&self, row: &QueueStatus) -> Result<i64> {
        Ok(self.upsert_queue_status(&row.job_type, row.paused))
    }

    async fn update_status(&self, job_type: &str, paused: bool, tx: TxName) -> Result<()> {
        self.record(StoreCall::UpdateQueueStatus {
            job_type: job_type.to_string(),
            paused,
            tx,
        });
        self.upsert_queue_status(job_type, paused);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        Ok(lock(&self.tasks)
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn stop(&self, task_id: i64, tx: TxName) -> Result<()> {
        self.record(StoreCall::StopTask { task_id, tx });
        let execution_id = {
            let mut tasks = lock(&self.tasks);
            let task = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ControlError::NotFound(format!("task {task_id}")))?;
            if !task.job_status().is_some_and(|s| s.is_final()) {
                let now = Utc::now();
                task.status = JobStatus::Stopped.to_string();
                task.update_time = now;
                task.end_time = Some(now);
            }
            task.execution_id
        };
        self.refresh(execution_id)?;
        Ok(())
    }

    async fn execution_ids_by_vendor_and_status(
        &self,
        vendor_type: &str,
        status: JobStatus,
    ) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = lock(&self.tasks)
            .iter()
            .filter(|t| t.vendor_type == vendor_type && t.status == status.as_str())
            .map(|t| t.execution_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn update_status_in_batch(
        &self,
        job_ids: &[String],
        status: JobStatus,
        batch_size: usize,
    ) -> Result<()> {
        if batch_size == 0 {
            return Err(ControlError::InvalidInput("batch size must be positive".into()));
        }
        for chunk in job_ids.chunks(batch_size) {
            self.record(StoreCall::UpdateStatusBatch {
                job_ids: chunk.to_vec(),
                status,
            });
            let now = Utc::now();
            let mut tasks = lock(&self.tasks);
            for task in tasks.iter_mut().filter(|t| chunk.contains(&t.job_id)) {
                if task.job_status().is_some_and(|s| s.is_final()) {
                    continue;
                }
                task.status = status.to_string();
                task.update_time = now;
                if status.is_final() {
                    task.end_time = Some(now);
                }
            }
        }
        Ok(())
    }

    async fn refresh_status(&self, execution_id: i64) -> Result<StatusRefresh> {
        self.record(StoreCall::RefreshStatus { execution_id });
        self.refresh(execution_id)
    }

    async fn get_log_by_job_id(&self, job_id: &str) -> Result<Vec<u8>> {
        lock(&self.logs)
            .get(job_id)
            .map(|content| content.as_bytes().to_vec())
            .ok_or_else(|| ControlError::NotFound(format!("log of job {job_id}")))
    }
}

#[async_trait]
impl ArtifactIndex for MemoryStore {
    async fn create(&self, artifact: &SystemArtifact) -> Result<i64> {
        let mut rows = lock(&self.artifacts);
        let duplicate = rows.iter().any(|a| {
            a.vendor == artifact.vendor
                && a.repository == artifact.repository
                && a.digest == artifact.digest
        });
        if duplicate {
            return Err(ControlError::Conflict(format!(
                "system artifact {}/{}@{}",
                artifact.vendor, artifact.repository, artifact.digest
            )));
        }
        let id = self.next_id();
        rows.push(SystemArtifact {
            id,
            ..artifact.clone()
        });
        Ok(id)
    }

    async fn get(&self, vendor: &str, repository: &str, digest: &str) -> Result<SystemArtifact> {
        lock(&self.artifacts)
            .iter()
            .find(|a| a.vendor == vendor && a.repository == repository && a.digest == digest)
            .cloned()
            .ok_or_else(|| {
                ControlError::NotFound(format!("system artifact {vendor}/{repository}@{digest}"))
            })
    }

    async fn delete(&self, vendor: &str, repository: &str, digest: &str) -> Result<()> {
        let mut rows = lock(&self.artifacts);
        let before = rows.len();
        rows.retain(|a| !(a.vendor == vendor && a.repository == repository && a.digest == digest));
        if rows.len() == before {
            return Err(ControlError::NotFound(format!(
                "system artifact {vendor}/{repository}@{digest}"
            )));
        }
        Ok(())
    }

    async fn list(&self, query: &ArtifactQuery) -> Result<Vec<SystemArtifact>> {
        Ok(lock(&self.artifacts)
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect())
    }

    async fn size(&self) -> Result<i64> {
        Ok(lock(&self.artifacts).iter().map(|a| a.size).sum())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn create(&self, schedule: &CreateSchedule) -> Result<i64> {
        let id = self.next_id();
        let now = Utc::now();
        lock(&self.schedules).push(Schedule {
            id,
            vendor_type: schedule.vendor_type.clone(),
            vendor_id: schedule.vendor_id,
            cron_type: schedule.cron_type.clone(),
            cron: schedule.cron.clone(),
            callback_func_name: schedule.callback_func_name.clone(),
            callback_func_param: schedule.callback_func_param.to_string(),
            extra_attrs: schedule.extra_attrs.to_string(),
            creation_time: now,
            update_time: now,
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Schedule> {
        lock(&self.schedules)
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(format!("schedule {id}")))
    }

    async fn list(&self, query: &ScheduleQuery) -> Result<Vec<Schedule>> {
        Ok(lock(&self.schedules)
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut rows = lock(&self.schedules);
        let before = rows.len();
        rows.retain(|s| s.id != id);
        if rows.len() == before {
            return Err(ControlError::NotFound(format!("schedule {id}")));
        }
        Ok(())
    }
}
