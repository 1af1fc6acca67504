//! Storage implementations for the control plane.
//!
//! Available backends:
//! - `MemoryStore` - In-memory relational store (always available)
//! - `PostgresStore` - PostgreSQL relational store (requires `postgres` feature)
//! - `RedisJobService` - Job service keyspace and monitor (requires `redis` feature)
//! - `RegistryBlobStore` - OCI registry blob store (requires `registry` feature)

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "registry")]
pub mod registry;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisJobService;

#[cfg(feature = "registry")]
pub use registry::RegistryBlobStore;
