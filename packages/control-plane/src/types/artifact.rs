//! System artifacts: blobs the platform stores in its own registry,
//! indexed in the `system_artifact` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Row of the `system_artifact` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[builder(field_defaults(setter(into)))]
pub struct SystemArtifact {
    #[builder(default)]
    pub id: i64,
    pub repository: String,
    pub digest: String,
    #[builder(default)]
    pub size: i64,
    pub vendor: String,
    #[cfg_attr(feature = "postgres", sqlx(rename = "type"))]
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[builder(default = Utc::now())]
    pub create_time: DateTime<Utc>,
    #[builder(default)]
    pub extra_attrs: String,
}

impl SystemArtifact {
    /// Key used by the cleanup registry.
    pub fn selector_key(&self) -> String {
        selector_key(&self.vendor, &self.artifact_type)
    }
}

/// Registry key for a (vendor, artifact type) pair.
pub fn selector_key(vendor: &str, artifact_type: &str) -> String {
    format!("{vendor}:{artifact_type}")
}

/// Filter for listing artifacts. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ArtifactQuery {
    pub vendor: Option<String>,
    pub repository: Option<String>,
    pub artifact_type: Option<String>,
    /// Only artifacts created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl ArtifactQuery {
    pub fn matches(&self, artifact: &SystemArtifact) -> bool {
        self.vendor.as_deref().map_or(true, |v| v == artifact.vendor)
            && self.repository.as_deref().map_or(true, |r| r == artifact.repository)
            && self
                .artifact_type
                .as_deref()
                .map_or(true, |t| t == artifact.artifact_type)
            && self
                .created_before
                .map_or(true, |before| artifact.create_time < before)
    }
}

/// Totals of one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: i64,
    pub reclaimed_bytes: i64,
}
