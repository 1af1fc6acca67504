//! Content-addressed blob storage for system artifacts.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Readable blob content. Reading is lazy; nothing is fetched until polled.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `content` as `digest` in `repository`.
    async fn push_blob(&self, repository: &str, digest: &str, size: i64, content: BlobReader) -> Result<()>;

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<BlobReader>;

    async fn delete_blob(&self, repository: &str, digest: &str) -> Result<()>;

    async fn blob_exists(&self, repository: &str, digest: &str) -> Result<bool>;
}
