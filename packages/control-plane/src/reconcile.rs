//! Background reconciliation of drained pending jobs.
//!
//! Draining a pending queue only touches Redis. The task records of the
//! drained jobs are moved to `Stopped` afterwards by one background task that
//! owns its own root context, so a finished API request never cancels it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::context::RequestContext;
use crate::error::Result;
use crate::traits::TaskStore;
use crate::types::job::JobStatus;

/// Maximum job ids per batched status update.
pub const BATCH_SIZE: usize = 1000;

/// Jobs drained from the pending queue of one job type.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub vendor_type: String,
    pub job_ids: Vec<String>,
}

enum Message {
    Reconcile(ReconcileRequest),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background reconciler. Cheap to clone.
///
/// The background task exits once every handle is dropped.
#[derive(Clone)]
pub struct Reconciler {
    tx: mpsc::UnboundedSender<Message>,
}

impl Reconciler {
    /// Spawn the background task on the current runtime.
    pub fn spawn(tasks: Arc<dyn TaskStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let ctx = RequestContext::background();
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Reconcile(request) => {
                        let vendor_type = request.vendor_type.clone();
                        if let Err(e) = reconcile(tasks.as_ref(), &ctx, request).await {
                            error!(vendor_type = %vendor_type, error = %e, "pending job reconciliation failed");
                        }
                    }
                    Message::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("reconciler stopped");
        });
        Self { tx }
    }

    /// Queue a reconciliation. Never blocks and never fails the caller.
    pub fn dispatch(&self, request: ReconcileRequest) {
        if self.tx.send(Message::Reconcile(request)).is_err() {
            warn!("reconciler is gone, dropping reconciliation request");
        }
    }

    /// Resolves once every request dispatched before this call was processed.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Message::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

/// Stop the tasks of drained jobs and refresh the executions that owned them.
pub async fn reconcile(
    tasks: &dyn TaskStore,
    ctx: &RequestContext,
    request: ReconcileRequest,
) -> Result<()> {
    let executions = ctx
        .run(tasks.execution_ids_by_vendor_and_status(&request.vendor_type, JobStatus::Pending))
        .await?;

    ctx.run(tasks.update_status_in_batch(&request.job_ids, JobStatus::Stopped, BATCH_SIZE))
        .await?;

    let mut refreshed = 0;
    for execution_id in &executions {
        match ctx.run(tasks.refresh_status(*execution_id)).await {
            Ok(refresh) if refresh.changed => refreshed += 1,
            Ok(_) => {}
            Err(e) => warn!(execution_id, error = %e, "failed to refresh execution status"),
        }
    }

    info!(
        vendor_type = %request.vendor_type,
        jobs = request.job_ids.len(),
        executions = executions.len(),
        refreshed,
        "reconciled stopped pending jobs"
    );
    Ok(())
}
