//! Control plane for a Redis-backed background job service.
//!
//! Observes worker pools, workers and per-job-type queues, and controls job
//! lifecycles: stop one or all running jobs, drain pending queues, pause and
//! resume job types. Every change is mirrored into relational records so the
//! durable view converges with Redis.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use control_plane::{JobServiceController, RequestContext, MemoryStore};
//! use control_plane::testing::MemoryJobService;
//!
//! let service = MemoryJobService::new().with_job_type("GARBAGE_COLLECTION");
//! let store = Arc::new(MemoryStore::new());
//! let controller = JobServiceController::new(
//!     Arc::new(service.clone()),
//!     Arc::new(service),
//!     store.clone(),
//!     store,
//! );
//!
//! let ctx = RequestContext::background();
//! controller.pause_job_queues(Some(&ctx), "GARBAGE_COLLECTION").await?;
//! let queues = controller.list_queues().await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Store and client seams (keyspace, monitor, stores, blobs)
//! - [`types`] - Domain types
//! - [`managers`] - Read-side projections of monitor snapshots
//! - [`controller`] - Lifecycle control and observation
//! - [`scheduler`] - Schedules and the scheduler pause flag
//! - [`sysartifact`] - System-artifact storage and cleanup
//! - [`stores`] - Storage implementations (MemoryStore, Postgres, Redis, registry)
//! - [`testing`] - In-memory doubles for testing

pub mod context;
pub mod controller;
pub mod error;
pub mod keys;
pub mod managers;
pub mod ordered;
pub mod reconcile;
pub mod scheduler;
pub mod stores;
pub mod sysartifact;
pub mod testing;
pub mod traits;
pub mod tx;
pub mod types;

// Re-export core types at crate root
pub use context::RequestContext;
pub use controller::{FanOut, JobServiceController};
pub use error::{ControlError, Result};
pub use keys::RedisKeys;
pub use reconcile::{ReconcileRequest, Reconciler};
pub use scheduler::SchedulerController;
pub use stores::MemoryStore;
pub use sysartifact::{CleanupRegistry, DefaultSelector, SystemArtifactManager};
pub use traits::{
    ArtifactIndex, BlobReader, BlobStore, JobKeyspace, MonitorClient, QueueStatusStore,
    ScheduleStore, Selector, TaskStore,
};
pub use tx::TxName;
pub use types::{
    artifact::{ArtifactQuery, CleanupReport, SystemArtifact},
    config::{JobServiceConfig, RegistryConfig},
    job::{JobStatus, PendingJob, ALL, SCHEDULER_JOB_TYPE},
    monitor::{Heartbeat, Observation, QueueSample, Worker, WorkerPool},
    queue::{Queue, QueueStatus, QueueStatusQuery},
    schedule::{CreateSchedule, Schedule, ScheduleQuery},
    task::{Execution, StatusRefresh, Task, TaskQuery},
};

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "redis")]
pub use stores::RedisJobService;

#[cfg(feature = "registry")]
pub use stores::RegistryBlobStore;
