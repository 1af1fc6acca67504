//! Job types and job statuses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Wildcard accepted by the fan-out operations in place of a job type, job id
/// or pool id.
pub const ALL: &str = "all";

/// Synthetic job type whose queue status gates every scheduled task.
pub const SCHEDULER_JOB_TYPE: &str = "SCHEDULER";

/// Job types that are internal or deprecated and never shown in queue views.
pub const HIDDEN_JOB_TYPES: [&str; 5] = [
    "DEMO",
    "IMAGE_REPLICATE",
    "IMAGE_SCAN_ALL",
    "IMAGE_GC",
    "PURGE_AUDIT",
];

/// Returns `true` when `value` is the `all` wildcard (case-insensitive).
pub fn is_all(value: &str) -> bool {
    value.eq_ignore_ascii_case(ALL)
}

/// Returns `true` when the job type is filtered out of queue views.
pub fn is_hidden_job_type(job_type: &str) -> bool {
    HIDDEN_JOB_TYPES.contains(&job_type)
}

/// Status of a task, as stored in the `task.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Scheduled,
    Stopped,
    Error,
    Success,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Scheduled => "Scheduled",
            JobStatus::Stopped => "Stopped",
            JobStatus::Error => "Error",
            JobStatus::Success => "Success",
        }
    }

    /// Final statuses never transition again.
    pub fn is_final(&self) -> bool {
        matches!(self, JobStatus::Stopped | JobStatus::Error | JobStatus::Success)
    }

    /// Statuses that still count as work in flight.
    pub fn non_final() -> [JobStatus; 3] {
        [JobStatus::Pending, JobStatus::Running, JobStatus::Scheduled]
    }

    /// Aggregate status of an execution from the statuses of its tasks.
    ///
    /// Returns `None` when there are no tasks.
    pub fn aggregate<I>(statuses: I) -> Option<JobStatus>
    where
        I: IntoIterator<Item = JobStatus>,
    {
        let (mut in_flight, mut error, mut stopped, mut success) = (false, false, false, false);
        let mut any = false;
        for status in statuses {
            any = true;
            match status {
                JobStatus::Pending | JobStatus::Running | JobStatus::Scheduled => in_flight = true,
                JobStatus::Error => error = true,
                JobStatus::Stopped => stopped = true,
                JobStatus::Success => success = true,
            }
        }
        if !any {
            return None;
        }
        Some(if in_flight {
            JobStatus::Running
        } else if error {
            JobStatus::Error
        } else if stopped {
            JobStatus::Stopped
        } else {
            debug_assert!(success);
            JobStatus::Success
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(JobStatus::Pending),
            "Running" => Ok(JobStatus::Running),
            "Scheduled" => Ok(JobStatus::Scheduled),
            "Stopped" => Ok(JobStatus::Stopped),
            "Error" => Ok(JobStatus::Error),
            "Success" => Ok(JobStatus::Success),
            other => Err(ControlError::InvalidInput(format!("unknown job status: {other}"))),
        }
    }
}

/// A pending job as serialized in the `{ns}:jobs:<type>` list.
///
/// Only `id` is required; the enqueue time `t` feeds queue latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingJob {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "t")]
    pub enqueued_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_wildcard_is_case_insensitive() {
        assert!(is_all("all"));
        assert!(is_all("ALL"));
        assert!(is_all("All"));
        assert!(!is_all("GARBAGE_COLLECTION"));
    }

    #[test]
    fn aggregate_prefers_in_flight_then_error_then_stopped() {
        use JobStatus::*;
        assert_eq!(JobStatus::aggregate([Success, Pending, Error]), Some(Running));
        assert_eq!(JobStatus::aggregate([Success, Stopped, Error]), Some(Error));
        assert_eq!(JobStatus::aggregate([Success, Stopped]), Some(Stopped));
        assert_eq!(JobStatus::aggregate([Success, Success]), Some(Success));
        assert_eq!(JobStatus::aggregate([]), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Scheduled,
            JobStatus::Stopped,
            JobStatus::Error,
            JobStatus::Success,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("Unknown".parse::<JobStatus>().is_err());
    }

    #[test]
    fn pending_job_parses_minimal_and_full_payloads() {
        let minimal: PendingJob = serde_json::from_str(r#"{"id":"j1"}"#).unwrap();
        assert_eq!(minimal.id, "j1");
        assert!(minimal.enqueued_at.is_none());

        let full: PendingJob =
            serde_json::from_str(r#"{"name":"GC","id":"j2","t":1700000000,"args":{}}"#).unwrap();
        assert_eq!(full.enqueued_at, Some(1_700_000_000));
    }
}
