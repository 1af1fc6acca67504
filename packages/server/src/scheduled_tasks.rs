//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! - System-artifact cleanup, once a day by default
//!
//! A run is skipped while the `SCHEDULER` job type is paused, the same flag
//! that holds back every other scheduled job.

use std::sync::Arc;

use anyhow::Result;
use control_plane::{CleanupReport, SchedulerController, SystemArtifactManager};
use tokio_cron_scheduler::{Job, JobScheduler};

/// Start all scheduled tasks
pub async fn start_scheduler(
    cleanup_cron: &str,
    artifacts: Arc<SystemArtifactManager>,
    scheduler: Arc<SchedulerController>,
) -> Result<JobScheduler> {
    let jobs = JobScheduler::new().await?;

    let cleanup_job = Job::new_async(cleanup_cron, move |_uuid, _lock| {
        let artifacts = artifacts.clone();
        let scheduler = scheduler.clone();
        Box::pin(async move {
            if let Err(e) = run_cleanup(&artifacts, &scheduler).await {
                tracing::error!(error = %e, "System artifact cleanup task failed");
            }
        })
    })?;

    jobs.add(cleanup_job).await?;
    jobs.start().await?;

    tracing::info!(cron = cleanup_cron, "Scheduled tasks started (system artifact cleanup)");
    Ok(jobs)
}

/// Run one system-artifact cleanup unless the scheduler is paused.
///
/// Returns `None` when the run was skipped.
pub async fn run_cleanup(
    artifacts: &SystemArtifactManager,
    scheduler: &SchedulerController,
) -> Result<Option<CleanupReport>> {
    if scheduler.paused().await? {
        tracing::info!("Scheduler is paused, skipping system artifact cleanup");
        return Ok(None);
    }

    tracing::info!("Running system artifact cleanup task");
    let report = artifacts.cleanup().await?;
    tracing::info!(
        deleted = report.deleted,
        reclaimed_bytes = report.reclaimed_bytes,
        "System artifact cleanup complete"
    );
    Ok(Some(report))
}
