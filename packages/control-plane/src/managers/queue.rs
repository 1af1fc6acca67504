//! Queue views: live depth and latency merged with the durable pause flag.

use std::collections::HashMap;

use crate::error::Result;
use crate::traits::{MonitorClient, QueueStatusStore};
use crate::types::job::is_hidden_job_type;
use crate::types::monitor::QueueSample;
use crate::types::queue::Queue;

/// Merge queue samples with the paused map, dropping hidden job types.
pub fn merge(samples: Vec<QueueSample>, paused: &HashMap<String, bool>) -> Vec<Queue> {
    samples
        .into_iter()
        .filter(|s| !is_hidden_job_type(&s.job_name))
        .map(|s| Queue {
            paused: paused.get(&s.job_name).copied().unwrap_or(false),
            job_type: s.job_name,
            count: s.count,
            latency: s.latency,
        })
        .collect()
}

/// Every visible job-type queue.
pub async fn list(
    monitor: &dyn MonitorClient,
    statuses: &dyn QueueStatusStore,
) -> Result<Vec<Queue>> {
    let samples = monitor.queues().await?;
    let paused = statuses.all_job_type_status().await?;
    Ok(merge(samples, &paused))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, count: i64, latency: i64) -> QueueSample {
        QueueSample {
            job_name: name.into(),
            count,
            latency,
        }
    }

    #[test]
    fn hidden_types_dropped_and_pause_flags_merged() {
        let paused = HashMap::from([("REPLICATION".to_string(), true)]);

        let queues = merge(
            vec![
                sample("REPLICATION", 2, 3),
                sample("DEMO", 1, 1),
                sample("GARBAGE_COLLECTION", 0, 0),
            ],
            &paused,
        );

        assert_eq!(
            queues,
            vec![
                Queue {
                    job_type: "REPLICATION".into(),
                    count: 2,
                    latency: 3,
                    paused: true,
                },
                Queue {
                    job_type: "GARBAGE_COLLECTION".into(),
                    count: 0,
                    latency: 0,
                    paused: false,
                },
            ]
        );
    }

    #[test]
    fn every_hidden_type_is_filtered() {
        let samples = ["DEMO", "IMAGE_REPLICATE", "IMAGE_SCAN_ALL", "IMAGE_GC", "PURGE_AUDIT"]
            .into_iter()
            .map(|name| sample(name, 1, 1))
            .collect();

        assert!(merge(samples, &HashMap::new()).is_empty());
    }
}
