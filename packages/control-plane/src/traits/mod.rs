//! Core trait abstractions.
//!
//! These traits define the seams between the control logic and the stores it
//! coordinates, so every backend can be swapped for an in-memory double.

pub mod blob;
pub mod jobservice;
pub mod selector;
pub mod store;

pub use blob::{BlobReader, BlobStore};
pub use jobservice::{JobKeyspace, MonitorClient};
pub use selector::Selector;
pub use store::{ArtifactIndex, QueueStatusStore, ScheduleStore, TaskStore};
