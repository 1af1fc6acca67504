//! Configuration types for the job service connection and the blob registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the job service's Redis namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobServiceConfig {
    /// Redis URL, e.g. `redis://localhost:6379/2`.
    pub redis_url: String,

    /// Job service namespace. Wrapped in `{}` when building keys unless it
    /// already is.
    pub namespace: String,

    /// Pooled connections unused for longer than this are evicted.
    ///
    /// Default: 1 hour.
    pub idle_timeout: Duration,

    /// Maximum pooled connections.
    ///
    /// Default: 16.
    pub pool_size: usize,
}

impl Default for JobServiceConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            namespace: "harbor_job_service_namespace".to_string(),
            idle_timeout: Duration::from_secs(3600),
            pool_size: 16,
        }
    }
}

impl JobServiceConfig {
    /// Create a config for the given Redis URL and namespace.
    pub fn new(redis_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }
}

/// Settings for the registry that stores system-artifact blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry, e.g. `http://registry:5000`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Use basic auth for every registry call.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}
