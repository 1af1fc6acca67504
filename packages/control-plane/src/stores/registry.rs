//! Registry blob store speaking the OCI distribution API.
//!
//! - exists: `HEAD /v2/<repo>/blobs/<digest>`
//! - pull: `GET /v2/<repo>/blobs/<digest>`, streamed
//! - delete: `DELETE /v2/<repo>/blobs/<digest>`
//! - push: monolithic upload, `POST /v2/<repo>/blobs/uploads/` then
//!   `PUT <location>?digest=<digest>` with the whole body

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header, Response, StatusCode};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, instrument};

use crate::error::{ControlError, Result};
use crate::traits::blob::{BlobReader, BlobStore};
use crate::types::config::RegistryConfig;

pub struct RegistryBlobStore {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl RegistryBlobStore {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn blob_url(&self, repository: &str, digest: &str) -> String {
        format!("{}/v2/{}/blobs/{}", self.base(), repository, digest)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_deref()),
            None => builder,
        }
    }

    /// Absolute upload URL with the digest query appended.
    fn commit_url(&self, location: &str, digest: &str) -> String {
        let location = if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/{}", self.base(), location.trim_start_matches('/'))
        };
        let sep = if location.contains('?') { '&' } else { '?' };
        format!("{location}{sep}digest={digest}")
    }
}

async fn unexpected(resp: Response, what: &str) -> ControlError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    ControlError::blob(format!("{what}: registry returned {status}: {body}"))
}

#[async_trait]
impl BlobStore for RegistryBlobStore {
    #[instrument(skip(self, content))]
    async fn push_blob(&self, repository: &str, digest: &str, size: i64, content: BlobReader) -> Result<()> {
        let start = format!("{}/v2/{}/blobs/uploads/", self.base(), repository);
        let resp = self
            .request(reqwest::Method::POST, &start)
            .send()
            .await
            .map_err(ControlError::blob)?;
        if resp.status() != StatusCode::ACCEPTED {
            return Err(unexpected(resp, "start upload").await);
        }
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ControlError::blob("upload response without location"))?
            .to_string();

        let resp = self
            .request(reqwest::Method::PUT, &self.commit_url(&location, digest))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(content)))
            .send()
            .await
            .map_err(ControlError::blob)?;
        if resp.status() != StatusCode::CREATED {
            return Err(unexpected(resp, "commit upload").await);
        }
        debug!("blob pushed");
        Ok(())
    }

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<BlobReader> {
        let resp = self
            .request(reqwest::Method::GET, &self.blob_url(repository, digest))
            .send()
            .await
            .map_err(ControlError::blob)?;
        match resp.status() {
            StatusCode::OK => {
                let stream = resp.bytes_stream().map_err(std::io::Error::other);
                Ok(Box::new(StreamReader::new(Box::pin(stream))))
            }
            StatusCode::NOT_FOUND => Err(ControlError::NotFound(format!("blob {repository}@{digest}"))),
            _ => Err(unexpected(resp, "pull blob").await),
        }
    }

    #[instrument(skip(self))]
    async fn delete_blob(&self, repository: &str, digest: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, &self.blob_url(repository, digest))
            .send()
            .await
            .map_err(ControlError::blob)?;
        match resp.status() {
            StatusCode::ACCEPTED | StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(ControlError::NotFound(format!("blob {repository}@{digest}"))),
            _ => Err(unexpected(resp, "delete blob").await),
        }
    }

    async fn blob_exists(&self, repository: &str, digest: &str) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::HEAD, &self.blob_url(repository, digest))
            .send()
            .await
            .map_err(ControlError::blob)?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(resp, "stat blob").await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RegistryBlobStore {
        RegistryBlobStore::new(RegistryConfig::new("http://registry:5000/"))
    }

    #[test]
    fn blob_url_trims_trailing_slash() {
        assert_eq!(
            store().blob_url("trivy-adapter/scandata_export_1", "sha256:abc"),
            "http://registry:5000/v2/trivy-adapter/scandata_export_1/blobs/sha256:abc"
        );
    }

    #[test]
    fn relative_and_absolute_locations_get_the_digest() {
        let store = store();
        assert_eq!(
            store.commit_url("/v2/repo/blobs/uploads/u1", "sha256:abc"),
            "http://registry:5000/v2/repo/blobs/uploads/u1?digest=sha256:abc"
        );
        assert_eq!(
            store.commit_url("http://other:5000/v2/repo/blobs/uploads/u1?_state=x", "sha256:abc"),
            "http://other:5000/v2/repo/blobs/uploads/u1?_state=x&digest=sha256:abc"
        );
    }
}
