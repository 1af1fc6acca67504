//! Read-side projections over monitor snapshots.
//!
//! - `pool`: heartbeats → worker pools
//! - `worker`: observations → workers, decorated with their pool
//! - `queue`: queue samples merged with durable pause flags

pub mod pool;
pub mod queue;
pub mod worker;
