//! Cleanup selectors for system artifacts.

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::store::ArtifactIndex;
use crate::types::artifact::SystemArtifact;

/// Picks the system artifacts that a cleanup run should delete.
///
/// One selector is registered per `vendor:artifact_type`; artifacts of types
/// without a registration fall back to the age-based default.
#[async_trait]
pub trait Selector: Send + Sync {
    /// Artifacts to delete, read from `index`.
    async fn list(&self, index: &dyn ArtifactIndex) -> Result<Vec<SystemArtifact>>;
}
