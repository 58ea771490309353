//! Turns stored asset references into URLs clients can fetch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::storage::{AssetStore, StorageError};
use crate::error::AppError;
use crate::models::{AssetReference, VideoRecord, VideoResponse};

/// Lifetime of every presigned GET URL handed to clients.
pub const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("bucket mismatch: expected {expected:?}, got {found}")]
    LocationMismatch {
        expected: Option<String>,
        found: String,
    },
    #[error("invalid key: empty string")]
    EmptyKey,
    #[error("failed to generate presigned URL: {0}")]
    Presign(#[from] StorageError),
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        AppError::InternalServerError(format!("Unable to resolve asset URL: {}", err))
    }
}

#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn AssetStore>,
}

impl AssetResolver {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Presigns addressed references on every call; nothing is cached.
    pub async fn resolve(
        &self,
        reference: Option<&AssetReference>,
    ) -> Result<Option<String>, ResolutionError> {
        let Some(reference) = reference else {
            return Ok(None);
        };

        match reference {
            AssetReference::Direct { url } => Ok(Some(url.clone())),
            AssetReference::Addressed { bucket, key } => {
                let configured = self.store.bucket();
                if configured != Some(bucket.as_str()) {
                    tracing::warn!(expected = ?configured, found = %bucket, "Asset reference names a foreign bucket");
                    return Err(ResolutionError::LocationMismatch {
                        expected: configured.map(str::to_string),
                        found: bucket.clone(),
                    });
                }
                if key.is_empty() {
                    return Err(ResolutionError::EmptyKey);
                }

                let url = self.store.presign_get(key, PRESIGN_TTL).await?;
                Ok(Some(url))
            }
        }
    }

    pub async fn resolve_record(
        &self,
        record: VideoRecord,
    ) -> Result<VideoResponse, ResolutionError> {
        let thumbnail_url = self.resolve(record.thumbnail.as_ref()).await?;
        let video_url = self.resolve(record.video.as_ref()).await?;

        Ok(VideoResponse {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            thumbnail_url,
            video_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
