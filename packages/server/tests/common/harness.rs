//! Test harness with testcontainers for integration testing.
//!
//! Uses shared containers across all tests in a test binary.
//! Containers and migrations are initialized once on first test, then reused.
//! Every harness gets its own Redis namespace so tests do not see each
//! other's queues.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use control_plane::{JobServiceConfig, PostgresStore, RedisJobService};
use server_core::{server::AppState, Config};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    redis_url: String,
    // Keep containers alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
    _redis: ContainerAsync<Redis>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

static NAMESPACE_SEQ: AtomicUsize = AtomicUsize::new(0);

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let redis = Redis::default()
            .start()
            .await
            .context("Failed to start Redis container")?;

        let redis_host = redis.get_host().await?;
        let redis_port = redis.get_host_port_ipv4(6379).await?;
        let redis_url = format!("redis://{}:{}", redis_host, redis_port);

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            redis_url,
            _postgres: postgres,
            _redis: redis,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness over the shared Postgres and Redis containers.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let service = ctx.jobservice().await.unwrap();
/// }
/// ```
pub struct TestHarness {
    /// Database pool - use this for fixtures.
    pub db_pool: PgPool,
    pub db_url: String,
    pub redis_url: String,
    /// Redis namespace private to this harness.
    pub namespace: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let seq = NAMESPACE_SEQ.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            db_pool,
            db_url: infra.db_url.clone(),
            redis_url: infra.redis_url.clone(),
            namespace: format!("test_ns_{}_{}", std::process::id(), seq),
        })
    }

    /// Unique name for job types, job ids and vendors created by this test.
    pub fn unique(&self, name: &str) -> String {
        format!("{}_{}", name, self.namespace)
    }

    pub fn store(&self) -> Arc<PostgresStore> {
        Arc::new(PostgresStore::from_pool(self.db_pool.clone()))
    }

    pub fn config(&self) -> Config {
        Config {
            database_url: self.db_url.clone(),
            redis_url: self.redis_url.clone(),
            jobservice_namespace: self.namespace.clone(),
            redis_idle_timeout: Duration::from_secs(60),
            redis_pool_size: 4,
            port: 0,
            registry_url: "http://127.0.0.1:1".to_string(),
            registry_username: None,
            registry_password: None,
            cleanup_cron: "0 0 0 * * *".to_string(),
        }
    }

    pub async fn jobservice(&self) -> Result<RedisJobService> {
        let config = JobServiceConfig::new(&self.redis_url, &self.namespace).with_pool_size(4);
        RedisJobService::connect(&config)
            .await
            .context("Failed to connect to job service redis")
    }

    /// Raw connection for seeding the job service keyspace.
    pub async fn redis(&self) -> Result<redis::aio::MultiplexedConnection> {
        redis::Client::open(self.redis_url.as_str())?
            .get_multiplexed_async_connection()
            .await
            .context("Failed to open redis connection")
    }

    pub async fn state(&self) -> Result<AppState> {
        AppState::connect(&self.config(), self.db_pool.clone()).await
    }
}
