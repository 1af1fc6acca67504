//! Key layout of the job service's Redis namespace.
//!
//! Every key starts with the namespace wrapped in a hash tag (`{ns}`) so the
//! whole namespace maps to one cluster slot. The layout is shared with the
//! worker runtime and must not change.

/// Key builder for one job service namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    /// Create a key builder. A bare namespace is wrapped in `{}`; an already
    /// wrapped one is used as-is.
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim();
        let prefix = if namespace.starts_with('{') && namespace.ends_with('}') {
            namespace.to_string()
        } else {
            format!("{{{namespace}}}")
        };
        Self { prefix }
    }

    /// The hash-tagged namespace, e.g. `{harbor}`.
    pub fn namespace(&self) -> &str {
        &self.prefix
    }

    /// Set of every job type a worker has registered.
    pub fn known_jobs(&self) -> String {
        format!("{}:known_jobs", self.prefix)
    }

    /// Pending queue (list of JSON jobs) for a job type.
    pub fn jobs(&self, job_type: &str) -> String {
        format!("{}:jobs:{}", self.prefix, job_type)
    }

    /// Pause flag for a job type.
    pub fn jobs_paused(&self, job_type: &str) -> String {
        format!("{}:jobs:{}:paused", self.prefix, job_type)
    }

    /// Tracking hash of one job.
    pub fn job_status(&self, job_id: &str) -> String {
        format!("{}:job_status:{}", self.prefix, job_id)
    }

    /// Hash of in-progress jobs keyed by job id.
    pub fn job_in_progress(&self) -> String {
        format!("{}:job:inprogress", self.prefix)
    }

    /// Set of live worker pool ids.
    pub fn worker_pools(&self) -> String {
        format!("{}:worker_pools", self.prefix)
    }

    /// Heartbeat hash of one worker pool.
    pub fn heartbeat(&self, pool_id: &str) -> String {
        format!("{}:worker_pools:{}", self.prefix, pool_id)
    }

    /// Observation hash of one worker.
    pub fn worker_observation(&self, worker_id: &str) -> String {
        format!("{}:worker:{}", self.prefix, worker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_namespace_is_hash_tagged() {
        let keys = RedisKeys::new("harbor");

        assert_eq!(keys.known_jobs(), "{harbor}:known_jobs");
        assert_eq!(keys.jobs("GARBAGE_COLLECTION"), "{harbor}:jobs:GARBAGE_COLLECTION");
        assert_eq!(
            keys.jobs_paused("GARBAGE_COLLECTION"),
            "{harbor}:jobs:GARBAGE_COLLECTION:paused"
        );
        assert_eq!(keys.job_status("j1"), "{harbor}:job_status:j1");
        assert_eq!(keys.job_in_progress(), "{harbor}:job:inprogress");
    }

    #[test]
    fn wrapped_namespace_is_not_wrapped_twice() {
        let keys = RedisKeys::new("{harbor_job_service_namespace}");
        assert_eq!(keys.namespace(), "{harbor_job_service_namespace}");
        assert_eq!(
            keys.worker_pools(),
            "{harbor_job_service_namespace}:worker_pools"
        );
    }

    #[test]
    fn observation_keys() {
        let keys = RedisKeys::new("ns");
        assert_eq!(keys.heartbeat("p1"), "{ns}:worker_pools:p1");
        assert_eq!(keys.worker_observation("w1"), "{ns}:worker:w1");
    }
}
