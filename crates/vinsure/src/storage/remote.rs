use super::{ArtifactStore, StoreError, StoreResult};
use crate::services::RemoteConfig;
use anyhow::{Context, Result};
use object_store::{aws::AmazonS3Builder, path::Path as ObjectPath, ObjectStore, PutPayload};
use std::sync::Arc;

/// Object-storage artifact store (S3 in production, in-memory in tests).
///
/// Keys are placed under an optional prefix: `<prefix>/<slot>/<file>`.
pub struct RemoteStore {
    inner: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: Option<String>,
}

impl RemoteStore {
    pub fn new(
        inner: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: Option<String>,
    ) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self {
            inner,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Build an S3 client from config. Credentials come from the usual `AWS_*` variables.
    ///
    /// Construction makes no network calls, so an unreachable bucket is only
    /// discovered by [`ArtifactStore::probe`].
    pub fn s3(config: &RemoteConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .as_deref()
            .context("remote.bucket is not configured")?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().context("Failed to build S3 client")?;
        Ok(Self::new(Arc::new(store), bucket, config.prefix.clone()))
    }

    fn object_path(&self, key: &str) -> ObjectPath {
        match &self.prefix {
            Some(prefix) => ObjectPath::from(format!("{}/{}", prefix, key)),
            None => ObjectPath::from(key),
        }
    }

    fn map_error(&self, key: &str, error: object_store::Error) -> StoreError {
        match error {
            object_store::Error::NotFound { .. } => StoreError::NotFound(self.location(key)),
            other => StoreError::Unreachable(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for RemoteStore {
    fn identifier(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.object_path(key))
    }

    async fn probe(&self) -> StoreResult<()> {
        let prefix = self.prefix.as_deref().map(ObjectPath::from);
        self.inner
            .list_with_delimiter(prefix.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match self.inner.head(&self.object_path(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StoreError::Unreachable(e.to_string())),
        }
    }

    async fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let result = self
            .inner
            .get(&self.object_path(key))
            .await
            .map_err(|e| self.map_error(key, e))?;
        let bytes = result.bytes().await.map_err(|e| self.map_error(key, e))?;
        Ok(bytes.to_vec())
    }

    // A single PUT is atomic on object stores.
    async fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.inner
            .put(&self.object_path(key), PutPayload::from(bytes.to_vec()))
            .await
            .map(|_| ())
            .map_err(|e| self.map_error(key, e))
    }
}
