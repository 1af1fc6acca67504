//! Redis backend for the job service namespace.
//!
//! One pooled client serves both the keyspace writes and the monitor reads.
//! Keys follow the worker runtime's layout (see [`RedisKeys`]).
//!
//! # Pending queue drain
//!
//! The pending list is read in pages of [`PAGE_SIZE`] and then deleted with a
//! single `DEL`. The per-job tracking keys are cleared by a detached task
//! afterwards; failures there are only logged.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ControlError, Result};
use crate::keys::RedisKeys;
use crate::traits::jobservice::{JobKeyspace, MonitorClient};
use crate::types::config::JobServiceConfig;
use crate::types::job::PendingJob;
use crate::types::monitor::{Heartbeat, Observation, QueueSample};

/// Elements fetched per `LRANGE` while draining a pending list.
pub const PAGE_SIZE: isize = 1000;

/// Redis-backed [`JobKeyspace`] and [`MonitorClient`].
#[derive(Clone)]
pub struct RedisJobService {
    pool: Pool,
    keys: RedisKeys,
    idle_timeout: Duration,
}

impl RedisJobService {
    /// Build a pool from `config` and check it with a `PING`.
    pub async fn connect(config: &JobServiceConfig) -> Result<Self> {
        info!(namespace = %config.namespace, "creating job service redis pool");

        let pool = Config::from_url(&config.redis_url)
            .builder()
            .map_err(ControlError::redis)?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(ControlError::redis)?;

        let service = Self::from_pool(pool, &config.namespace).with_idle_timeout(config.idle_timeout);
        service.ping().await?;
        Ok(service)
    }

    /// Reuse an existing pool.
    pub fn from_pool(pool: Pool, namespace: &str) -> Self {
        Self {
            pool,
            keys: RedisKeys::new(namespace),
            idle_timeout: JobServiceConfig::default().idle_timeout,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn keys(&self) -> &RedisKeys {
        &self.keys
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(ControlError::redis)?;
        Ok(())
    }

    /// Periodically evict pooled connections idle for longer than the idle
    /// timeout. Stops when `cancel` fires.
    pub fn spawn_idle_reaper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let idle_timeout = self.idle_timeout;
        let period = idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let result = pool.retain(|_, metrics| metrics.last_used() < idle_timeout);
                        if !result.removed.is_empty() {
                            debug!(evicted = result.removed.len(), retained = result.retained, "evicted idle redis connections");
                        }
                    }
                }
            }
        })
    }

    /// Drain the pending queue of `job_type`, awaiting `before_delete` after
    /// the queue has been read and before it is deleted.
    #[instrument(skip(self, before_delete))]
    pub async fn drain_pending_with<F>(&self, job_type: &str, before_delete: F) -> Result<Vec<String>>
    where
        F: Future<Output = ()> + Send,
    {
        let key = self.keys.jobs(job_type);
        let mut conn = self.conn().await?;

        let len: isize = conn.llen(&key).await.map_err(ControlError::redis)?;
        if len == 0 {
            debug!("pending queue is empty");
            return Ok(Vec::new());
        }

        let mut job_ids = Vec::with_capacity(len as usize);
        let mut start = 0;
        while start < len {
            let page: Vec<String> = conn
                .lrange(&key, start, start + PAGE_SIZE - 1)
                .await
                .map_err(ControlError::redis)?;
            if page.is_empty() {
                break;
            }
            for element in &page {
                match serde_json::from_str::<PendingJob>(element) {
                    Ok(job) => job_ids.push(job.id),
                    Err(e) => warn!(error = %e, "skipping malformed pending job"),
                }
            }
            start += PAGE_SIZE;
        }

        before_delete.await;
        let removed: i64 = conn.del(&key).await.map_err(ControlError::redis)?;
        if removed == 0 {
            return Err(ControlError::NoJobRemoved);
        }

        let pool = self.pool.clone();
        let keys = self.keys.clone();
        let tracked = job_ids.clone();
        tokio::spawn(async move { clear_tracking(&pool, &keys, &tracked).await });

        info!(count = job_ids.len(), "pending queue drained");
        Ok(job_ids)
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool.get().await.map_err(ControlError::redis)
    }

    async fn hash(&self, conn: &mut Connection, key: &str) -> Result<HashMap<String, String>> {
        conn.hgetall(key).await.map_err(ControlError::monitor)
    }
}

fn field<T: FromStr + Default>(hash: &HashMap<String, String>, name: &str) -> T {
    hash.get(name).and_then(|v| v.parse().ok()).unwrap_or_default()
}

fn text(hash: &HashMap<String, String>, name: &str) -> String {
    hash.get(name).cloned().unwrap_or_default()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn heartbeat(pool_id: &str, hash: &HashMap<String, String>) -> Heartbeat {
    Heartbeat {
        worker_pool_id: pool_id.to_string(),
        pid: field(hash, "pid"),
        started_at: field(hash, "started_at"),
        heartbeat_at: field(hash, "heartbeat_at"),
        concurrency: field(hash, "concurrency"),
        host: text(hash, "host"),
        job_names: split_list(&text(hash, "job_names")),
        worker_ids: split_list(&text(hash, "worker_ids")),
    }
}

fn observation(worker_id: &str, hash: &HashMap<String, String>) -> Observation {
    let job_id = text(hash, "job_id");
    Observation {
        worker_id: worker_id.to_string(),
        is_busy: !job_id.is_empty(),
        job_name: text(hash, "job_name"),
        job_id,
        args_json: text(hash, "args"),
        started_at: field(hash, "started_at"),
        check_in: text(hash, "checkin"),
        check_in_at: field(hash, "checkin_at"),
    }
}

/// Delete the tracking keys of drained jobs.
async fn clear_tracking(pool: &Pool, keys: &RedisKeys, job_ids: &[String]) {
    let mut conn = match pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, jobs = job_ids.len(), "no redis connection to clear job tracking keys");
            return;
        }
    };
    let in_progress = keys.job_in_progress();
    for job_id in job_ids {
        let mut pipe = redis::pipe();
        pipe.del(keys.job_status(job_id))
            .ignore()
            .hdel(&in_progress, job_id)
            .ignore();
        if let Err(e) = pipe.query_async::<()>(&mut *conn).await {
            warn!(job_id = %job_id, error = %e, "failed to clear job tracking keys");
        }
    }
    debug!(jobs = job_ids.len(), "cleared job tracking keys");
}

#[async_trait]
impl JobKeyspace for RedisJobService {
    async fn all_job_types(&self) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let mut types: Vec<String> = conn
            .smembers(self.keys.known_jobs())
            .await
            .map_err(ControlError::redis)?;
        types.sort();
        Ok(types)
    }

    #[instrument(skip(self))]
    async fn pause_job(&self, job_type: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(self.keys.jobs_paused(job_type), "1")
            .await
            .map_err(ControlError::redis)
    }

    #[instrument(skip(self))]
    async fn unpause_job(&self, job_type: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.keys.jobs_paused(job_type))
            .await
            .map_err(ControlError::redis)
    }

    async fn stop_pending_jobs(&self, job_type: &str) -> Result<Vec<String>> {
        self.drain_pending_with(job_type, std::future::ready(())).await
    }
}

#[async_trait]
impl MonitorClient for RedisJobService {
    async fn worker_pool_heartbeats(&self) -> Result<Vec<Heartbeat>> {
        let mut conn = self.conn().await?;
        let mut pool_ids: Vec<String> = conn
            .smembers(self.keys.worker_pools())
            .await
            .map_err(ControlError::monitor)?;
        pool_ids.sort();

        let mut heartbeats = Vec::with_capacity(pool_ids.len());
        for pool_id in &pool_ids {
            let hash = self.hash(&mut conn, &self.keys.heartbeat(pool_id)).await?;
            if hash.is_empty() {
                continue;
            }
            heartbeats.push(heartbeat(pool_id, &hash));
        }
        Ok(heartbeats)
    }

    async fn worker_observations(&self) -> Result<Vec<Observation>> {
        let heartbeats = self.worker_pool_heartbeats().await?;
        let mut conn = self.conn().await?;

        let mut observations = Vec::new();
        for worker_id in heartbeats.iter().flat_map(|hb| hb.worker_ids.iter()) {
            let hash = self
                .hash(&mut conn, &self.keys.worker_observation(worker_id))
                .await?;
            observations.push(observation(worker_id, &hash));
        }
        Ok(observations)
    }

    async fn queues(&self) -> Result<Vec<QueueSample>> {
        let mut conn = self.conn().await?;
        let mut names: Vec<String> = conn
            .smembers(self.keys.known_jobs())
            .await
            .map_err(ControlError::monitor)?;
        names.sort();

        let now = Utc::now().timestamp();
        let mut samples = Vec::with_capacity(names.len());
        for name in names {
            let key = self.keys.jobs(&name);
            let count: i64 = conn.llen(&key).await.map_err(ControlError::monitor)?;
            let latency = if count == 0 {
                0
            } else {
                let oldest: Option<String> = conn.lindex(&key, -1).await.map_err(ControlError::monitor)?;
                oldest
                    .and_then(|raw| serde_json::from_str::<PendingJob>(&raw).ok())
                    .and_then(|job| job.enqueued_at)
                    .map_or(0, |t| (now - t).max(0))
            };
            samples.push(QueueSample {
                job_name: name,
                count,
                latency,
            });
        }
        Ok(samples)
    }
}
