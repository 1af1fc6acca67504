// Job Service Control Plane - Server Core
//
// HTTP control API over the job service: worker pools, workers, queues,
// job stop/pause/resume, schedules and system-artifact maintenance.
// The control logic itself lives in the control-plane crate.

pub mod config;
pub mod scheduled_tasks;
pub mod server;

pub use config::*;
