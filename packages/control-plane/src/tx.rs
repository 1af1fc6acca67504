//! Named database transactions.
//!
//! Stores open one transaction per call that takes a [`TxName`]; the name is
//! attached to the tracing span so a stop or pause can be followed in logs.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxName(&'static str);

impl TxName {
    /// Stopping the task behind one running job.
    pub const STOP_JOB: TxName = TxName("tx-stop-job");

    /// Upserting the durable pause flag of one job type.
    pub const UPDATE_QUEUE_STATUS: TxName = TxName("tx-update-queue-status");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
