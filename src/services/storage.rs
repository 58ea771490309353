//! Durable storage for uploaded assets.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::models::AssetReference;

use super::local::LocalStore;
use super::s3::S3Service;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("presign failed: {0}")]
    PresignFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Writes the staged file under `key` and returns how records should refer to it.
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> StorageResult<AssetReference>;

    /// Removes the object behind a reference this store handed out.
    async fn delete_object(&self, _reference: &AssetReference) -> StorageResult<()> {
        Err(StorageError::Unsupported("deleting"))
    }

    /// Time-limited GET URL for `key`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Bucket that addressed references must name, if this backend has one.
    fn bucket(&self) -> Option<&str>;
}

pub async fn build_store(config: &StorageConfig) -> StorageResult<Arc<dyn AssetStore>> {
    match config {
        StorageConfig::Local {
            assets_root,
            base_url,
        } => {
            let store = LocalStore::new(assets_root, base_url).await?;
            tracing::info!(root = %assets_root.display(), "Using local asset storage");
            Ok(Arc::new(store))
        }
        StorageConfig::S3 { .. } => {
            let store = S3Service::new(config).await?;
            store.ensure_bucket_exists().await?;
            tracing::info!(bucket = %store.bucket_name, "Using S3 asset storage");
            Ok(Arc::new(store))
        }
    }
}
