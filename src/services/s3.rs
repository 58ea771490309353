use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::storage::{AssetStore, StorageError, StorageResult};
use crate::config::StorageConfig;
use crate::models::AssetReference;

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    pub bucket_name: String,
}

impl S3Service {
    /// Static keys win; without them the default AWS credential chain applies.
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } = config
        else {
            return Err(StorageError::ConfigError(
                "S3 storage requested without S3 settings".to_string(),
            ));
        };

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));

        match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "tubekit_env",
                );
                loader = loader.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(StorageError::ConfigError(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
                ))
            }
        }

        let shared_config = loader.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config_builder.build()),
            bucket_name: bucket.clone(),
        })
    }

    /// Creates the bucket on first start against a fresh MinIO or localstack.
    pub async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        tracing::warn!(bucket = %self.bucket_name, "Bucket does not exist, attempting to create it");
        self.client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create S3 bucket {}: {}",
                    self.bucket_name, e
                ))
            })?;

        Ok(())
    }
}

#[async_trait]
impl AssetStore for S3Service {
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> StorageResult<AssetReference> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to read staged file: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 upload error");
                StorageError::UploadFailed(format!("Failed to upload file to S3: {}", e))
            })?;

        tracing::info!(bucket = %self.bucket_name, key = %key, "S3 upload successful");
        Ok(AssetReference::addressed(&self.bucket_name, key))
    }

    async fn delete_object(&self, reference: &AssetReference) -> StorageResult<()> {
        let key = match reference {
            AssetReference::Addressed { bucket, key } if *bucket == self.bucket_name => key,
            other => {
                return Err(StorageError::InvalidKey(format!(
                    "{:?} is not an object in bucket {}",
                    other, self.bucket_name
                )))
            }
        };

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 delete error");
                StorageError::DeleteFailed(format!("Failed to delete file from S3: {}", e))
            })?;

        tracing::info!(bucket = %self.bucket_name, key = %key, "S3 object deleted");
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(format!("Failed to configure presigner: {}", e)))?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    fn bucket(&self) -> Option<&str> {
        Some(&self.bucket_name)
    }
}
