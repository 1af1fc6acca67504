//! Cleanup criteria: the selector registry and the age-based default.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use indexmap::IndexMap;

use crate::error::Result;
use crate::traits::{ArtifactIndex, Selector};
use crate::types::artifact::{selector_key, ArtifactQuery, SystemArtifact};

/// Age after which the default selector picks an artifact.
pub const DEFAULT_MAX_AGE_SECONDS: i64 = 86_400;

/// Selects every artifact older than a fixed age.
#[derive(Debug, Clone)]
pub struct DefaultSelector {
    max_age: Duration,
}

impl Default for DefaultSelector {
    fn default() -> Self {
        Self {
            max_age: Duration::seconds(DEFAULT_MAX_AGE_SECONDS),
        }
    }
}

impl DefaultSelector {
    pub fn with_max_age(max_age: Duration) -> Self {
        Self { max_age }
    }
}

#[async_trait]
impl Selector for DefaultSelector {
    async fn list(&self, index: &dyn ArtifactIndex) -> Result<Vec<SystemArtifact>> {
        index
            .list(&ArtifactQuery {
                created_before: Some(Utc::now() - self.max_age),
                ..Default::default()
            })
            .await
    }
}

/// Cleanup selectors keyed by `vendor:artifact_type`, in registration order.
///
/// Built once at start-up and handed to the artifact manager.
#[derive(Default, Clone)]
pub struct CleanupRegistry {
    selectors: IndexMap<String, Arc<dyn Selector>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the selector of one vendor and artifact type. A later
    /// registration for the same key replaces the earlier one in place.
    pub fn register(
        mut self,
        vendor: &str,
        artifact_type: &str,
        selector: Arc<dyn Selector>,
    ) -> Self {
        self.selectors
            .insert(selector_key(vendor, artifact_type), selector);
        self
    }

    pub fn get(&self, vendor: &str, artifact_type: &str) -> Option<Arc<dyn Selector>> {
        self.selectors
            .get(&selector_key(vendor, artifact_type))
            .cloned()
    }

    /// Registered selectors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Selector>)> {
        self.selectors.iter().map(|(key, s)| (key.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::StaticSelector;

    #[tokio::test]
    async fn default_selector_picks_only_old_artifacts() {
        let store = MemoryStore::new();
        for (digest, age_hours) in [("sha256:old", 25), ("sha256:new", 1)] {
            let artifact = SystemArtifact::builder()
                .vendor("vendor")
                .repository("repo")
                .digest(digest)
                .artifact_type("type")
                .create_time(Utc::now() - Duration::hours(age_hours))
                .build();
            ArtifactIndex::create(&store, &artifact).await.unwrap();
        }

        let victims = DefaultSelector::default().list(&store).await.unwrap();

        assert_eq!(victims.len(), 1);
        assert_eq!(victims[0].digest, "sha256:old");
    }

    #[test]
    fn registration_order_is_kept_and_keys_replace() {
        let registry = CleanupRegistry::new()
            .register("b", "t", Arc::new(StaticSelector::new(vec![])))
            .register("a", "t", Arc::new(StaticSelector::new(vec![])))
            .register("b", "t", Arc::new(StaticSelector::failing("boom")));

        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b:t", "a:t"]);
        assert!(registry.get("a", "t").is_some());
        assert!(registry.get("c", "t").is_none());
    }
}
