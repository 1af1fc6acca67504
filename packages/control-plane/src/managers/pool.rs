//! Worker pool views.

use crate::error::Result;
use crate::traits::MonitorClient;
use crate::types::monitor::{unix_time, Heartbeat, WorkerPool};

/// Project heartbeats into pool records, one per heartbeat.
pub fn project(heartbeats: &[Heartbeat]) -> Vec<WorkerPool> {
    heartbeats
        .iter()
        .map(|hb| WorkerPool {
            pool_id: hb.worker_pool_id.clone(),
            pid: hb.pid,
            host: hb.host.clone(),
            concurrency: hb.concurrency,
            started_at: unix_time(hb.started_at),
            heartbeat_at: unix_time(hb.heartbeat_at),
        })
        .collect()
}

/// Every worker pool with a live heartbeat.
pub async fn list(monitor: &dyn MonitorClient) -> Result<Vec<WorkerPool>> {
    let heartbeats = monitor.worker_pool_heartbeats().await?;
    Ok(project(&heartbeats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timestamps_become_none() {
        let pools = project(&[Heartbeat {
            worker_pool_id: "p1".into(),
            pid: 42,
            host: "node-a".into(),
            concurrency: 10,
            started_at: 1_700_000_000,
            heartbeat_at: 0,
            ..Default::default()
        }]);

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].pool_id, "p1");
        assert_eq!(pools[0].concurrency, 10);
        assert!(pools[0].started_at.is_some());
        assert!(pools[0].heartbeat_at.is_none());
    }
}
