//! Persisted schedules and the global scheduler pause flag.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ControlError, Result};
use crate::traits::{QueueStatusStore, ScheduleStore};
use crate::types::job::SCHEDULER_JOB_TYPE;
use crate::types::schedule::{CreateSchedule, Schedule, ScheduleQuery};

/// CRUD over schedules plus [`paused`](SchedulerController::paused).
#[derive(Clone)]
pub struct SchedulerController {
    schedules: Arc<dyn ScheduleStore>,
    queue_status: Arc<dyn QueueStatusStore>,
}

impl SchedulerController {
    pub fn new(schedules: Arc<dyn ScheduleStore>, queue_status: Arc<dyn QueueStatusStore>) -> Self {
        Self {
            schedules,
            queue_status,
        }
    }

    /// Persist a schedule after validating its cron spec.
    pub async fn create(&self, schedule: &CreateSchedule) -> Result<i64> {
        cron::Schedule::from_str(&schedule.cron).map_err(|e| {
            ControlError::InvalidInput(format!("invalid cron {:?}: {e}", schedule.cron))
        })?;
        if schedule.callback_func_name.is_empty() {
            return Err(ControlError::InvalidInput("empty callback function name".into()));
        }
        let id = self.schedules.create(schedule).await?;
        info!(
            id,
            vendor_type = %schedule.vendor_type,
            vendor_id = schedule.vendor_id,
            cron = %schedule.cron,
            "schedule created"
        );
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Schedule> {
        self.schedules.get(id).await
    }

    /// The first schedule of a vendor.
    pub async fn get_by_vendor(&self, vendor_type: &str, vendor_id: i64) -> Result<Schedule> {
        self.schedules
            .list(&vendor_query(vendor_type, vendor_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ControlError::NotFound(format!("schedule for {vendor_type}/{vendor_id}"))
            })
    }

    pub async fn list(&self, query: &ScheduleQuery) -> Result<Vec<Schedule>> {
        self.schedules.list(query).await
    }

    pub async fn count(&self, query: &ScheduleQuery) -> Result<i64> {
        self.schedules.count(query).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.schedules.delete(id).await?;
        info!(id, "schedule deleted");
        Ok(())
    }

    /// Delete every schedule of a vendor. Deleting none is not an error.
    pub async fn delete_by_vendor(&self, vendor_type: &str, vendor_id: i64) -> Result<()> {
        let schedules = self
            .schedules
            .list(&vendor_query(vendor_type, vendor_id))
            .await?;
        debug!(vendor_type, vendor_id, count = schedules.len(), "deleting vendor schedules");
        for schedule in schedules {
            self.delete(schedule.id).await?;
        }
        Ok(())
    }

    /// Whether every schedule is paused, read from the queue status of the
    /// synthetic `SCHEDULER` job type. No row means not paused.
    pub async fn paused(&self) -> Result<bool> {
        Ok(self
            .queue_status
            .get_by_job_type(SCHEDULER_JOB_TYPE)
            .await?
            .is_some_and(|row| row.paused))
    }
}

fn vendor_query(vendor_type: &str, vendor_id: i64) -> ScheduleQuery {
    ScheduleQuery {
        vendor_type: Some(vendor_type.to_string()),
        vendor_id: Some(vendor_id),
    }
}
