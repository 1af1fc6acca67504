//! System-artifact engine.
//!
//! System artifacts are blobs the platform writes into its own registry, for
//! example exported scan data. Each blob has a metadata row; the two are kept
//! in step by ordering the writes:
//!
//! - create: row first, then blob; the row is removed again if the push fails
//! - delete: blob first, then row
//!
//! A cleanup run asks every registered [`Selector`] for its victims, then the
//! default selector for old artifacts of every unregistered type.

mod cleanup;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use cleanup::{CleanupRegistry, DefaultSelector, DEFAULT_MAX_AGE_SECONDS};

use crate::error::{ControlError, Result};
use crate::ordered::{ordered, ordered_with_compensation};
use crate::traits::{ArtifactIndex, BlobReader, BlobStore, Selector};
use crate::types::artifact::{CleanupReport, SystemArtifact};

/// Keeps system-artifact rows and blobs consistent and runs cleanups.
#[derive(Clone)]
pub struct SystemArtifactManager {
    index: Arc<dyn ArtifactIndex>,
    blobs: Arc<dyn BlobStore>,
    registry: CleanupRegistry,
    default_selector: Arc<dyn Selector>,
}

impl SystemArtifactManager {
    pub fn new(
        index: Arc<dyn ArtifactIndex>,
        blobs: Arc<dyn BlobStore>,
        registry: CleanupRegistry,
    ) -> Self {
        Self {
            index,
            blobs,
            registry,
            default_selector: Arc::new(DefaultSelector::default()),
        }
    }

    /// Replace the selector used for unregistered artifact types.
    pub fn with_default_selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.default_selector = selector;
        self
    }

    /// Store a new artifact and its content. Returns the row id.
    #[instrument(skip(self, artifact, content), fields(repository = %artifact.repository, digest = %artifact.digest))]
    pub async fn create(&self, artifact: &SystemArtifact, content: BlobReader) -> Result<i64> {
        let (id, ()) = ordered_with_compensation(
            "create_system_artifact",
            self.index.create(artifact),
            self.blobs.push_blob(
                &artifact.repository,
                &artifact.digest,
                artifact.size,
                content,
            ),
            self.index
                .delete(&artifact.vendor, &artifact.repository, &artifact.digest),
        )
        .await?;
        info!(id, vendor = %artifact.vendor, size = artifact.size, "system artifact created");
        Ok(id)
    }

    /// Content of an artifact. Fails with `NotFound` if the row is missing.
    pub async fn read(&self, vendor: &str, repository: &str, digest: &str) -> Result<BlobReader> {
        let artifact = self.index.get(vendor, repository, digest).await?;
        self.blobs
            .pull_blob(&artifact.repository, &artifact.digest)
            .await
    }

    /// Delete the blob, then the row. The row survives a failed blob delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, vendor: &str, repository: &str, digest: &str) -> Result<()> {
        ordered(
            "delete_system_artifact",
            self.blobs.delete_blob(repository, digest),
            self.index.delete(vendor, repository, digest),
        )
        .await?;
        debug!("system artifact deleted");
        Ok(())
    }

    /// Whether both the row and the blob exist.
    pub async fn exists(&self, vendor: &str, repository: &str, digest: &str) -> Result<bool> {
        match self.index.get(vendor, repository, digest).await {
            Ok(_) => self.blobs.blob_exists(repository, digest).await,
            Err(ControlError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Total size in bytes of every indexed artifact.
    pub async fn get_storage_size(&self) -> Result<i64> {
        self.index.size().await
    }

    /// The selector for a vendor and artifact type, or the default one.
    pub fn get_cleanup_criteria(&self, vendor: &str, artifact_type: &str) -> Arc<dyn Selector> {
        self.registry
            .get(vendor, artifact_type)
            .unwrap_or_else(|| self.default_selector.clone())
    }

    /// Delete every artifact picked by the registered selectors, then by the
    /// default selector.
    ///
    /// A failed delete is logged and skipped. A registered selector that fails
    /// to list aborts the run with [`ControlError::CleanupAborted`] carrying the
    /// totals so far; later selectors do not run. A failing default selector is
    /// logged and the totals so far are returned.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for (key, selector) in self.registry.iter() {
            let victims = self.select(key, selector.as_ref(), &report).await?;
            self.delete_all(victims, &mut report).await;
        }

        match self.default_selector.list(self.index.as_ref()).await {
            Ok(listed) => {
                let victims = listed
                    .into_iter()
                    .filter(|a| self.registry.get(&a.vendor, &a.artifact_type).is_none())
                    .collect();
                self.delete_all(victims, &mut report).await;
            }
            Err(e) => warn!(error = %e, "default cleanup selector failed"),
        }

        info!(
            deleted = report.deleted,
            reclaimed_bytes = report.reclaimed_bytes,
            "system artifact cleanup finished"
        );
        Ok(report)
    }

    async fn select(
        &self,
        key: &str,
        selector: &dyn Selector,
        report: &CleanupReport,
    ) -> Result<Vec<SystemArtifact>> {
        selector.list(self.index.as_ref()).await.map_err(|e| {
            warn!(selector = key, error = %e, "cleanup selector failed, aborting cleanup");
            ControlError::CleanupAborted {
                deleted: report.deleted,
                reclaimed_bytes: report.reclaimed_bytes,
                source: Box::new(e),
            }
        })
    }

    async fn delete_all(&self, victims: Vec<SystemArtifact>, report: &mut CleanupReport) {
        for victim in victims {
            match self
                .delete(&victim.vendor, &victim.repository, &victim.digest)
                .await
            {
                Ok(()) => {
                    report.deleted += 1;
                    report.reclaimed_bytes += victim.size;
                }
                Err(e) => warn!(
                    vendor = %victim.vendor,
                    repository = %victim.repository,
                    digest = %victim.digest,
                    error = %e,
                    "failed to delete system artifact, skipping"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MemoryBlobStore, StaticSelector};
    use chrono::{Duration, Utc};

    fn artifact(n: u32, size: i64) -> SystemArtifact {
        SystemArtifact::builder()
            .vendor(format!("vendor{n}"))
            .repository(format!("repo{n}"))
            .digest(format!("sha256:{n}"))
            .artifact_type(format!("type{n}"))
            .size(size)
            .build()
    }

    fn content(bytes: &'static [u8]) -> BlobReader {
        Box::new(bytes)
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        blobs: MemoryBlobStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                blobs: MemoryBlobStore::new(),
            }
        }

        fn manager(&self, registry: CleanupRegistry) -> SystemArtifactManager {
            SystemArtifactManager::new(
                self.store.clone(),
                Arc::new(self.blobs.clone()),
                registry,
            )
        }

        async fn seed(&self, manager: &SystemArtifactManager, artifact: &SystemArtifact) {
            manager.create(artifact, content(b"payload")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn create_then_exists_then_delete() {
        let fx = Fixture::new();
        let manager = fx.manager(CleanupRegistry::new());
        let a = artifact(1, 7);

        fx.seed(&manager, &a).await;
        assert!(manager.exists("vendor1", "repo1", "sha256:1").await.unwrap());
        assert_eq!(manager.get_storage_size().await.unwrap(), 7);

        let mut reader = manager.read("vendor1", "repo1", "sha256:1").await.unwrap();
        let mut body = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut body)
            .await
            .unwrap();
        assert_eq!(body, b"payload");

        manager.delete("vendor1", "repo1", "sha256:1").await.unwrap();
        assert!(!manager.exists("vendor1", "repo1", "sha256:1").await.unwrap());
        assert!(fx.blobs.is_empty());
        assert_eq!(fx.store.artifact_count(), 0);
    }

    #[tokio::test]
    async fn failed_push_removes_row() {
        let fx = Fixture::new();
        let manager = fx.manager(CleanupRegistry::new());
        fx.blobs.fail_pushes(true);

        let err = manager.create(&artifact(1, 7), content(b"x")).await.unwrap_err();

        assert!(matches!(err, ControlError::BlobStore(_)));
        assert_eq!(fx.store.artifact_count(), 0);
        assert!(!manager.exists("vendor1", "repo1", "sha256:1").await.unwrap());
    }

    #[tokio::test]
    async fn failed_blob_delete_keeps_row() {
        let fx = Fixture::new();
        let manager = fx.manager(CleanupRegistry::new());
        fx.seed(&manager, &artifact(1, 7)).await;
        fx.blobs.fail_deletes(true);

        assert!(manager.delete("vendor1", "repo1", "sha256:1").await.is_err());
        assert_eq!(fx.store.artifact_count(), 1);
    }

    #[tokio::test]
    async fn read_of_missing_artifact_is_not_found() {
        let fx = Fixture::new();
        let manager = fx.manager(CleanupRegistry::new());

        let err = manager.read("v", "r", "d").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn criteria_fall_back_to_default() {
        let fx = Fixture::new();
        let custom: Arc<dyn Selector> = Arc::new(StaticSelector::new(vec![]));
        let manager = fx.manager(CleanupRegistry::new().register("v", "t", custom.clone()));

        assert!(Arc::ptr_eq(&manager.get_cleanup_criteria("v", "t"), &custom));
        assert!(!Arc::ptr_eq(&manager.get_cleanup_criteria("v", "other"), &custom));
    }

    #[tokio::test]
    async fn cleanup_runs_custom_selectors_then_default() {
        let fx = Fixture::new();
        let (a1, a2, a3) = (artifact(1, 100), artifact(2, 300), artifact(3, 300));
        let seeder = fx.manager(CleanupRegistry::new());
        for a in [&a1, &a2, &a3] {
            fx.seed(&seeder, a).await;
        }

        let manager = fx
            .manager(
                CleanupRegistry::new()
                    .register("vendor1", "type1", Arc::new(StaticSelector::new(vec![a1])))
                    .register("vendor2", "type2", Arc::new(StaticSelector::new(vec![a2]))),
            )
            .with_default_selector(Arc::new(StaticSelector::new(vec![a3])));

        let report = manager.cleanup().await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 3, reclaimed_bytes: 700 });
        assert!(fx.blobs.is_empty());
        assert_eq!(fx.store.artifact_count(), 0);
    }

    #[tokio::test]
    async fn selector_failure_aborts_with_partial_counts() {
        let fx = Fixture::new();
        let (a1, a3) = (artifact(1, 100), artifact(3, 300));
        let seeder = fx.manager(CleanupRegistry::new());
        fx.seed(&seeder, &a1).await;
        fx.seed(&seeder, &a3).await;

        let manager = fx
            .manager(
                CleanupRegistry::new()
                    .register("vendor1", "type1", Arc::new(StaticSelector::new(vec![a1])))
                    .register("vendor2", "type2", Arc::new(StaticSelector::failing("test error"))),
            )
            .with_default_selector(Arc::new(StaticSelector::new(vec![a3])));

        let err = manager.cleanup().await.unwrap_err();

        match err {
            ControlError::CleanupAborted {
                deleted,
                reclaimed_bytes,
                ..
            } => {
                assert_eq!(deleted, 1);
                assert_eq!(reclaimed_bytes, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(manager.exists("vendor3", "repo3", "sha256:3").await.unwrap());
    }

    #[tokio::test]
    async fn default_selector_failure_keeps_partial_counts() {
        let fx = Fixture::new();
        let (a1, a2) = (artifact(1, 200), artifact(2, 200));
        let seeder = fx.manager(CleanupRegistry::new());
        fx.seed(&seeder, &a1).await;
        fx.seed(&seeder, &a2).await;

        let manager = fx
            .manager(
                CleanupRegistry::new()
                    .register("vendor1", "type1", Arc::new(StaticSelector::new(vec![a1])))
                    .register("vendor2", "type2", Arc::new(StaticSelector::new(vec![a2]))),
            )
            .with_default_selector(Arc::new(StaticSelector::failing("test error")));

        let report = manager.cleanup().await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 2, reclaimed_bytes: 400 });
        assert!(fx.blobs.is_empty());
    }

    #[tokio::test]
    async fn failed_victim_is_skipped() {
        let fx = Fixture::new();
        let (a1, ghost) = (artifact(1, 100), artifact(2, 300));
        let seeder = fx.manager(CleanupRegistry::new());
        fx.seed(&seeder, &a1).await;

        let manager = fx.manager(CleanupRegistry::new().register(
            "vendor1",
            "type1",
            Arc::new(StaticSelector::new(vec![ghost, a1])),
        ));

        let report = manager.cleanup().await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 1, reclaimed_bytes: 100 });
    }

    #[tokio::test]
    async fn default_selector_leaves_registered_types_alone() {
        let fx = Fixture::new();
        let seeder = fx.manager(CleanupRegistry::new());
        let mut old_registered = artifact(1, 100);
        old_registered.create_time = Utc::now() - Duration::days(2);
        let mut old_unregistered = artifact(2, 300);
        old_unregistered.create_time = Utc::now() - Duration::days(2);
        fx.seed(&seeder, &old_registered).await;
        fx.seed(&seeder, &old_unregistered).await;

        let manager = fx.manager(CleanupRegistry::new().register(
            "vendor1",
            "type1",
            Arc::new(StaticSelector::new(vec![])),
        ));

        let report = manager.cleanup().await.unwrap();

        assert_eq!(report, CleanupReport { deleted: 1, reclaimed_bytes: 300 });
        assert!(manager.exists("vendor1", "repo1", "sha256:1").await.unwrap());
    }
}
