use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use control_plane::{JobServiceConfig, RegistryConfig};
use dotenvy::dotenv;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jobservice_namespace: String,
    pub redis_idle_timeout: Duration,
    pub redis_pool_size: usize,
    pub port: u16,
    pub registry_url: String,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub cleanup_cron: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jobservice_namespace: env::var("JOBSERVICE_NAMESPACE")
                .unwrap_or_else(|_| "harbor_job_service_namespace".to_string()),
            redis_idle_timeout: Duration::from_secs(
                env::var("REDIS_IDLE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("REDIS_IDLE_TIMEOUT_SECONDS must be a number of seconds")?,
            ),
            redis_pool_size: env::var("REDIS_POOL_SIZE")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("REDIS_POOL_SIZE must be a valid number")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            registry_url: env::var("REGISTRY_URL").unwrap_or_else(|_| "http://registry:5000".to_string()),
            registry_username: env::var("REGISTRY_USERNAME").ok(),
            registry_password: env::var("REGISTRY_PASSWORD").ok(),
            cleanup_cron: env::var("SYSTEM_ARTIFACT_CLEANUP_CRON")
                .unwrap_or_else(|_| "0 0 0 * * *".to_string()),
        })
    }

    pub fn jobservice(&self) -> JobServiceConfig {
        JobServiceConfig::new(&self.redis_url, &self.jobservice_namespace)
            .with_idle_timeout(self.redis_idle_timeout)
            .with_pool_size(self.redis_pool_size)
    }

    pub fn registry(&self) -> RegistryConfig {
        let config = RegistryConfig::new(&self.registry_url);
        match &self.registry_username {
            Some(user) => config.with_basic_auth(user, self.registry_password.clone().unwrap_or_default()),
            None => config,
        }
    }
}
