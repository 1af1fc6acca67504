//! Data types shared by the stores, managers and controllers.

pub mod artifact;
pub mod config;
pub mod job;
pub mod monitor;
pub mod queue;
pub mod schedule;
pub mod task;
