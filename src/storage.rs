//! First-party object storage for rehosted images.
//!
//! The catalog never serves a third-party image URL, so every preview is
//! uploaded to an S3-compatible bucket and referenced by its public URL.
//! [`InMemoryObjectStore`] backs tests without network access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tokio::sync::RwLock;

/// What went wrong while storing an object.
#[derive(Debug, Error)]
pub enum StorageError {
    /// What: the upload was rejected or the transfer failed.
    /// Why: bucket misconfiguration, bad credentials, or network loss.
    /// Fix: verify the bucket settings and credentials, then retry.
    #[error("object upload failed: {0}")]
    Upload(String),

    /// What: the public base URL could not absorb the object path.
    /// Why: the configured base URL is not a valid absolute URL.
    /// Fix: set a base URL like `https://cdn.example.com/`.
    #[error("invalid public base URL: {0}")]
    PublicUrl(#[from] url::ParseError),
}

/// Write-side interface over an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `path` and returns the public URL the object
    /// is served from.
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom endpoint for S3-compatible providers; path-style addressing
    /// is enabled whenever this is set.
    pub endpoint: Option<String>,
    /// Base URL objects are publicly served from.
    pub public_base_url: String,
}

/// S3-compatible object store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: url::Url,
}

impl S3ObjectStore {
    /// Builds a client from static credentials.
    pub fn new(settings: &S3Settings) -> Result<Self, StorageError> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "static",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest());

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());
        let public_base_url = url::Url::parse(&settings.public_base_url)?;

        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
            public_base_url,
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let public = self.public_base_url.join(path)?;
        Ok(public.to_string())
    }
}

/// Map-backed store for tests.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// True when nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Returns the stored bytes and content type for `path`.
    pub async fn get(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects.read().await.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.write().await;
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!("https://cdn.test/{path}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_put_returns_public_url() {
        let store = InMemoryObjectStore::new();
        let url = store
            .put("mods/braid-1.jpg", vec![0xFF, 0xD8], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.test/mods/braid-1.jpg");
        assert_eq!(store.len().await, 1);

        let (bytes, content_type) = store.get("mods/braid-1.jpg").await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8]);
        assert_eq!(content_type, "image/jpeg");
    }

    #[test]
    fn test_s3_store_rejects_relative_base_url() {
        let settings = S3Settings {
            region: "us-east-1".into(),
            bucket: "previews".into(),
            access_key: "k".into(),
            secret_key: "s".into(),
            endpoint: None,
            public_base_url: "not-a-url".into(),
        };
        assert!(S3ObjectStore::new(&settings).is_err());
    }
}
