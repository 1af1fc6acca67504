//! Worker views, decorated with the pool that owns each worker.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::traits::MonitorClient;
use crate::types::job::is_all;
use crate::types::monitor::{unix_time, Heartbeat, Observation, Worker};

/// `worker_id → pool_id` from one heartbeat snapshot.
fn owners(heartbeats: &[Heartbeat]) -> HashMap<&str, &str> {
    heartbeats
        .iter()
        .flat_map(|hb| {
            hb.worker_ids
                .iter()
                .map(move |w| (w.as_str(), hb.worker_pool_id.as_str()))
        })
        .collect()
}

fn project(observation: Observation, pool_id: &str) -> Worker {
    Worker {
        worker_id: observation.worker_id,
        pool_id: pool_id.to_string(),
        is_busy: observation.is_busy,
        job_name: observation.job_name,
        job_id: observation.job_id,
        started_at: unix_time(observation.started_at),
        check_in: observation.check_in,
        check_in_at: unix_time(observation.check_in_at),
    }
}

/// Workers of one pool, or of every pool when `pool_id` is `all`.
///
/// With `all`, workers whose pool is missing from the heartbeat snapshot are
/// returned with an empty `pool_id`.
pub async fn list(monitor: &dyn MonitorClient, pool_id: &str) -> Result<Vec<Worker>> {
    let heartbeats = monitor.worker_pool_heartbeats().await?;
    let owners = owners(&heartbeats);
    let observations = monitor.worker_observations().await?;

    let all = is_all(pool_id);
    let workers: Vec<Worker> = observations
        .into_iter()
        .filter_map(|obs| {
            let owner = owners.get(obs.worker_id.as_str()).copied().unwrap_or("");
            (all || owner == pool_id).then(|| project(obs, owner))
        })
        .collect();

    debug!(pool_id, count = workers.len(), "listed workers");
    Ok(workers)
}
