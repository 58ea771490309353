use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use url::Url;

use super::storage::{AssetStore, StorageError, StorageResult};
use crate::models::AssetReference;

/// Route prefix local assets are served under.
pub const ASSETS_ROUTE: &str = "/assets";

/// Filesystem-backed store; records get direct URLs under [`ASSETS_ROUTE`].
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
    base_url: Url,
}

impl LocalStore {
    pub async fn new(root: impl Into<PathBuf>, base_url: &str) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let base = format!("{}{}/", base_url.trim_end_matches('/'), ASSETS_ROUTE);
        let base_url = Url::parse(&base)
            .map_err(|e| StorageError::ConfigError(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;

        Ok(Self { root, base_url })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
    }

    fn url_for(&self, key: &str) -> StorageResult<String> {
        self.base_url
            .join(key)
            .map(String::from)
            .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> StorageResult<AssetReference> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Copy next to the target and rename so readers never see a partial file.
        let partial = path.with_extension("partial");
        let size = fs::copy(source, &partial).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write {}: {}", partial.display(), e))
        })?;
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(path = %path.display(), key = %key, size_bytes = size, "Local storage upload successful");
        Ok(AssetReference::direct(self.url_for(key)?))
    }

    async fn delete_object(&self, reference: &AssetReference) -> StorageResult<()> {
        let key = match reference {
            AssetReference::Direct { url } => self.key_for_url(url),
            AssetReference::Addressed { .. } => None,
        }
        .ok_or_else(|| StorageError::InvalidKey(format!("{:?} is not a local asset", reference)))?;
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to remove {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(path = %path.display(), key = %key, "Local asset removed");
        Ok(())
    }

    async fn presign_get(&self, _key: &str, _expires_in: Duration) -> StorageResult<String> {
        Err(StorageError::Unsupported("presigning"))
    }

    fn bucket(&self) -> Option<&str> {
        None
    }
}
