//! Job service controller: lifecycle control and observation views.
//!
//! Every mutation takes `Option<&RequestContext>`. `None` means there is no
//! live request to act for: the call is logged and returns `Ok(())` without
//! touching either store.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::context::RequestContext;
use crate::error::{ControlError, Result};
use crate::managers::{pool, queue, worker};
use crate::ordered::ordered;
use crate::reconcile::{ReconcileRequest, Reconciler};
use crate::traits::{JobKeyspace, MonitorClient, QueueStatusStore, TaskStore};
use crate::tx::TxName;
use crate::types::job::{is_all, ALL};
use crate::types::monitor::{Worker, WorkerPool};
use crate::types::queue::Queue;
use crate::types::task::TaskQuery;

/// How a fan-out over many job types or job ids treats a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Return the first error. Items already handled stay handled.
    AbortOnFirstError,
    /// Log the error and continue with the next item.
    BestEffort,
}

impl FanOut {
    fn on_error(self, op: &'static str, item: &str, err: ControlError) -> Result<()> {
        match self {
            FanOut::AbortOnFirstError => Err(err),
            FanOut::BestEffort => {
                warn!(op, item, error = %err, "fan-out item failed, continuing");
                Ok(())
            }
        }
    }
}

/// Coordinates the job service keyspace, the monitor and the relational stores.
#[derive(Clone)]
pub struct JobServiceController {
    keyspace: Arc<dyn JobKeyspace>,
    monitor: Arc<dyn MonitorClient>,
    queue_status: Arc<dyn QueueStatusStore>,
    tasks: Arc<dyn TaskStore>,
    reconciler: Reconciler,
}

impl JobServiceController {
    /// Create a controller. Spawns the pending-job reconciler on the current
    /// runtime.
    pub fn new(
        keyspace: Arc<dyn JobKeyspace>,
        monitor: Arc<dyn MonitorClient>,
        queue_status: Arc<dyn QueueStatusStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        let reconciler = Reconciler::spawn(tasks.clone());
        Self {
            keyspace,
            monitor,
            queue_status,
            tasks,
            reconciler,
        }
    }

    /// Handle to the background reconciler, e.g. to flush it on shutdown.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub async fn list_pools(&self) -> Result<Vec<WorkerPool>> {
        pool::list(self.monitor.as_ref()).await
    }

    /// Workers of `pool_id`, or of every pool for `all`.
    pub async fn list_workers(&self, pool_id: &str) -> Result<Vec<Worker>> {
        worker::list(self.monitor.as_ref(), pool_id).await
    }

    pub async fn list_queues(&self) -> Result<Vec<Queue>> {
        queue::list(self.monitor.as_ref(), self.queue_status.as_ref()).await
    }

    pub async fn get_job_log(&self, job_id: &str) -> Result<Vec<u8>> {
        self.tasks.get_log_by_job_id(job_id).await
    }

    // =========================================================================
    // Running jobs
    // =========================================================================

    /// Stop one running job, or every running job for `all`.
    #[instrument(skip(self, ctx))]
    pub async fn stop_running_jobs(&self, ctx: Option<&RequestContext>, job_id: &str) -> Result<()> {
        let Some(ctx) = ctx else {
            info!("no request context, skipping stop of running jobs");
            return Ok(());
        };

        if !is_all(job_id) {
            return self.stop_running_job(ctx, job_id).await;
        }

        let workers = ctx.run(worker::list(self.monitor.as_ref(), ALL)).await?;
        let job_ids: Vec<String> = workers
            .into_iter()
            .map(|w| w.job_id)
            .filter(|id| !id.is_empty())
            .collect();
        info!(count = job_ids.len(), "stopping all running jobs");

        for job_id in &job_ids {
            if let Err(e) = self.stop_running_job(ctx, job_id).await {
                FanOut::AbortOnFirstError.on_error("stop_running_job", job_id, e)?;
            }
        }
        Ok(())
    }

    async fn stop_running_job(&self, ctx: &RequestContext, job_id: &str) -> Result<()> {
        let tasks = ctx.run(self.tasks.list(&TaskQuery::by_job_id(job_id))).await?;
        match tasks.as_slice() {
            [] => {
                info!(job_id, "no task found for running job, nothing to stop");
                Ok(())
            }
            [task] => {
                ctx.run(self.tasks.stop(task.id, TxName::STOP_JOB)).await?;
                info!(job_id, task_id = task.id, "stopped running job");
                Ok(())
            }
            _ => Err(ControlError::InvariantViolation(
                "multiple tasks with same job ID".to_string(),
            )),
        }
    }

    // =========================================================================
    // Pending jobs
    // =========================================================================

    /// Drain the pending queue of one job type, or of every type for `all`.
    ///
    /// Returns once Redis is drained. Task records converge in the background.
    #[instrument(skip(self, ctx))]
    pub async fn stop_pending_jobs(&self, ctx: Option<&RequestContext>, job_type: &str) -> Result<()> {
        let Some(ctx) = ctx else {
            info!("no request context, skipping stop of pending jobs");
            return Ok(());
        };

        if !is_all(job_type) {
            return self.stop_pending_job(ctx, job_type).await;
        }

        for job_type in ctx.run(self.keyspace.all_job_types()).await? {
            if let Err(e) = self.stop_pending_job(ctx, &job_type).await {
                FanOut::BestEffort.on_error("stop_pending_jobs", &job_type, e)?;
            }
        }
        Ok(())
    }

    async fn stop_pending_job(&self, ctx: &RequestContext, job_type: &str) -> Result<()> {
        let job_ids = ctx.run(self.keyspace.stop_pending_jobs(job_type)).await?;
        info!(job_type, count = job_ids.len(), "drained pending jobs");
        self.reconciler.dispatch(ReconcileRequest {
            vendor_type: job_type.to_string(),
            job_ids,
        });
        Ok(())
    }

    // =========================================================================
    // Queue pause / resume
    // =========================================================================

    /// Pause one job type, or every type for `all`.
    #[instrument(skip(self, ctx))]
    pub async fn pause_job_queues(&self, ctx: Option<&RequestContext>, job_type: &str) -> Result<()> {
        self.set_paused(ctx, job_type, true).await
    }

    /// Resume one job type, or every type for `all`.
    #[instrument(skip(self, ctx))]
    pub async fn resume_job_queues(&self, ctx: Option<&RequestContext>, job_type: &str) -> Result<()> {
        self.set_paused(ctx, job_type, false).await
    }

    async fn set_paused(&self, ctx: Option<&RequestContext>, job_type: &str, paused: bool) -> Result<()> {
        let Some(ctx) = ctx else {
            info!(paused, "no request context, skipping queue status change");
            return Ok(());
        };

        if !is_all(job_type) {
            return self.set_paused_one(ctx, job_type, paused).await;
        }

        for job_type in ctx.run(self.keyspace.all_job_types()).await? {
            if let Err(e) = self.set_paused_one(ctx, &job_type, paused).await {
                FanOut::AbortOnFirstError.on_error("set_paused", &job_type, e)?;
            }
        }
        Ok(())
    }

    /// Redis flag first, then the durable row.
    async fn set_paused_one(&self, ctx: &RequestContext, job_type: &str, paused: bool) -> Result<()> {
        let flag = async {
            if paused {
                self.keyspace.pause_job(job_type).await
            } else {
                self.keyspace.unpause_job(job_type).await
            }
        };
        ordered(
            "update_queue_status",
            ctx.run(flag),
            ctx.run(
                self.queue_status
                    .update_status(job_type, paused, TxName::UPDATE_QUEUE_STATUS),
            ),
        )
        .await?;
        info!(job_type, paused, "queue status updated");
        Ok(())
    }
}
