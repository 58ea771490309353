//! Upload intake: validate, stage, measure, classify, commit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::probe::{classify, MediaProbe, ProbeError};
use super::storage::{AssetStore, StorageError};
use crate::error::AppError;
use crate::models::{AssetReference, StoredAsset};
use crate::utils::media_type::{extension_for, parse_media_type};

pub const THUMBNAIL_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png"];
pub const VIDEO_MEDIA_TYPES: &[&str] = &["video/mp4"];

const STAGING_CHUNK: usize = 64 * 1024;

/// Limits and behaviour for one kind of upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub size_limit: u64,
    pub allowed: &'static [&'static str],
    /// Probe the payload and prefix its key with the geometry class.
    pub classify: bool,
}

impl UploadPolicy {
    pub fn thumbnail(size_limit: u64) -> Self {
        Self {
            size_limit,
            allowed: THUMBNAIL_MEDIA_TYPES,
            classify: false,
        }
    }

    pub fn video(size_limit: u64) -> Self {
        Self {
            size_limit,
            allowed: VIDEO_MEDIA_TYPES,
            classify: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid file type: {0}")]
    BadContentType(String),
    #[error("file too large: limit is {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("allow-listed media type {0} has no file extension")]
    UnmappedMediaType(String),
    #[error("unable to read upload: {0}")]
    Read(#[source] std::io::Error),
    #[error("staging failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::BadContentType(_)
            | IntakeError::TooLarge { .. }
            | IntakeError::Read(_) => AppError::BadRequest(err.to_string()),
            IntakeError::UnmappedMediaType(_) => AppError::InternalServerError(err.to_string()),
            IntakeError::Io(_) => {
                AppError::InternalServerError(format!("Unable to stage upload: {}", err))
            }
            IntakeError::Probe(_) => {
                AppError::InternalServerError(format!("Unable to get video aspect ratio: {}", err))
            }
            IntakeError::Storage(_) => {
                AppError::InternalServerError(format!("Unable to upload file: {}", err))
            }
        }
    }
}

/// An upload while it is being validated. Dropping it removes the staging file.
struct UploadCandidate {
    media_type: String,
    extension: &'static str,
    size: u64,
    staged: NamedTempFile,
}

impl UploadCandidate {
    fn path(&self) -> &Path {
        self.staged.path()
    }
}

/// `[prefix]<base64url of 32 random bytes><extension>`.
pub fn generate_storage_key(prefix: &str, extension: &str) -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    format!(
        "{}{}{}",
        prefix,
        general_purpose::URL_SAFE_NO_PAD.encode(random_bytes),
        extension
    )
}

#[derive(Clone)]
pub struct UploadIntake {
    store: Arc<dyn AssetStore>,
    probe: Arc<dyn MediaProbe>,
    staging_dir: Option<PathBuf>,
}

impl UploadIntake {
    pub fn new(store: Arc<dyn AssetStore>, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            store,
            probe,
            staging_dir: None,
        }
    }

    /// Stage uploads under `dir` instead of the system temp directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub async fn intake<R>(
        &self,
        content_type: Option<&str>,
        reader: R,
        policy: &UploadPolicy,
    ) -> Result<StoredAsset, IntakeError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let declared = content_type.unwrap_or_default();
        let media_type = parse_media_type(declared)
            .ok_or_else(|| IntakeError::BadContentType(format!("unparsable content type {:?}", declared)))?;
        if !policy.allowed.contains(&media_type.as_str()) {
            return Err(IntakeError::BadContentType(format!(
                "expected one of {}, got {}",
                policy.allowed.join(", "),
                media_type
            )));
        }

        let extension = extension_for(&media_type)
            .ok_or_else(|| IntakeError::UnmappedMediaType(media_type.clone()))?;

        let candidate = self
            .stage(media_type, extension, reader, policy.size_limit)
            .await?;

        let prefix = if policy.classify {
            let class = classify(self.probe.as_ref(), candidate.path()).await?;
            tracing::debug!(class = %class, "Classified video geometry");
            class.key_prefix()
        } else {
            ""
        };

        let key = generate_storage_key(prefix, candidate.extension);
        let reference = self
            .store
            .put_object(&key, candidate.path(), &candidate.media_type)
            .await?;

        tracing::info!(key = %key, media_type = %candidate.media_type, size_bytes = candidate.size, "Upload committed");

        Ok(StoredAsset {
            reference,
            media_type: candidate.media_type,
            key,
            size: candidate.size,
        })
    }

    /// Best-effort removal of a committed object nothing points at any more.
    pub async fn discard(&self, reference: &AssetReference) {
        match self.store.delete_object(reference).await {
            Ok(()) => tracing::info!(reference = ?reference, "Removed unreferenced asset"),
            Err(e) => {
                tracing::warn!(reference = ?reference, error = %e, "Unreferenced asset left in storage")
            }
        }
    }

    /// Copies at most `limit + 1` bytes so an oversized body is detected without
    /// draining it, and measures what actually arrived.
    async fn stage<R>(
        &self,
        media_type: String,
        extension: &'static str,
        reader: R,
        limit: u64,
    ) -> Result<UploadCandidate, IntakeError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tubekit-upload-").suffix(extension);
        let staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut sink = tokio::fs::File::from_std(staged.reopen()?);
        let mut bounded = reader.take(limit.saturating_add(1));
        let mut buf = vec![0u8; STAGING_CHUNK];
        let mut size: u64 = 0;
        loop {
            let n = bounded.read(&mut buf).await.map_err(IntakeError::Read)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await?;
            size += n as u64;
        }

        if size > limit {
            tracing::info!(limit_bytes = limit, "Rejected oversized upload");
            return Err(IntakeError::TooLarge { limit });
        }

        sink.flush().await?;
        sink.sync_all().await?;

        Ok(UploadCandidate {
            media_type,
            extension,
            size,
            staged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::probe::ProbeOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<(String, Vec<u8>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl AssetStore for RecordingStore {
        async fn put_object(
            &self,
            key: &str,
            source: &Path,
            content_type: &str,
        ) -> Result<AssetReference, StorageError> {
            if self.fail {
                return Err(StorageError::UploadFailed("bucket on fire".into()));
            }
            let bytes = std::fs::read(source)?;
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), bytes, content_type.to_string()));
            Ok(AssetReference::addressed("tubes", key))
        }

        async fn presign_get(&self, key: &str, _expires_in: Duration) -> Result<String, StorageError> {
            Ok(format!("https://tubes.example/{}", key))
        }

        fn bucket(&self) -> Option<&str> {
            Some("tubes")
        }
    }

    struct SizedProbe(u32, u32);

    #[async_trait]
    impl MediaProbe for SizedProbe {
        async fn probe(&self, path: &Path) -> Result<ProbeOutput, ProbeError> {
            assert!(path.exists(), "probe must see the staged file");
            ProbeOutput::parse(
                format!(r#"{{"streams":[{{"width":{},"height":{}}}]}}"#, self.0, self.1).as_bytes(),
            )
        }
    }

    fn intake_with(store: Arc<RecordingStore>, probe: SizedProbe, dir: &Path) -> UploadIntake {
        UploadIntake::new(store, Arc::new(probe)).with_staging_dir(dir)
    }

    fn staging_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn thumbnail_is_committed_without_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(0, 0), dir.path());

        let asset = intake
            .intake(Some("image/png"), &b"png-bytes"[..], &UploadPolicy::thumbnail(1024))
            .await
            .unwrap();

        assert!(asset.key.ends_with(".png"));
        assert!(!asset.key.contains('/'));
        assert_eq!(asset.size, 9);
        assert_eq!(asset.media_type, "image/png");
        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].1, b"png-bytes");
        assert_eq!(puts[0].2, "image/png");
        assert!(staging_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn video_key_carries_geometry_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1920, 1080), dir.path());

        let asset = intake
            .intake(Some("video/mp4; codecs=avc1"), &b"mp4"[..], &UploadPolicy::video(1024))
            .await
            .unwrap();

        assert!(asset.key.starts_with("landscape/"));
        assert!(asset.key.ends_with(".mp4"));
        assert_eq!(asset.reference, AssetReference::addressed("tubes", asset.key.clone()));
        assert!(staging_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn keys_are_fresh_and_url_safe() {
        let a = generate_storage_key("other/", ".mp4");
        let b = generate_storage_key("other/", ".mp4");
        assert_ne!(a, b);
        let random = a.trim_start_matches("other/").trim_end_matches(".mp4");
        assert_eq!(random.len(), 43);
        assert!(random
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_'));
    }

    #[tokio::test]
    async fn rejects_types_outside_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1920, 1080), dir.path());

        for content_type in [Some("image/gif"), Some("image/webp"), Some("video/mp4"), Some("garbage"), None] {
            let result = intake
                .intake(content_type, &b"x"[..], &UploadPolicy::thumbnail(1024))
                .await;
            assert!(matches!(result, Err(IntakeError::BadContentType(_))), "{content_type:?}");
        }
        for content_type in ["image/png", "video/quicktime"] {
            let result = intake
                .intake(Some(content_type), &b"x"[..], &UploadPolicy::video(1024))
                .await;
            assert!(matches!(result, Err(IntakeError::BadContentType(_))), "{content_type}");
        }
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn allow_listed_type_without_extension_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1, 1), dir.path());
        let policy = UploadPolicy {
            size_limit: 1024,
            allowed: &["image/webp"],
            classify: false,
        };

        let err = intake
            .intake(Some("image/webp"), &b"x"[..], &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::UnmappedMediaType(_)));
        assert_eq!(AppError::from(err).status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_payload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1920, 1080), dir.path());
        let payload = vec![7u8; 2048];

        let err = intake
            .intake(Some("video/mp4"), &payload[..], &UploadPolicy::video(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::TooLarge { limit: 1024 }));
        assert_eq!(AppError::from(err).status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(store.puts.lock().unwrap().is_empty());
        assert!(staging_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn payload_exactly_at_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1, 1), dir.path());
        let payload = vec![1u8; 1024];

        let asset = intake
            .intake(Some("image/jpeg"), &payload[..], &UploadPolicy::thumbnail(1024))
            .await
            .unwrap();
        assert_eq!(asset.size, 1024);
        assert!(asset.key.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn probe_failure_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1920, 0), dir.path());

        let err = intake
            .intake(Some("video/mp4"), &b"mp4"[..], &UploadPolicy::video(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::Probe(ProbeError::ZeroHeight)));
        assert!(store.puts.lock().unwrap().is_empty());
        assert!(staging_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn storage_failure_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let intake = intake_with(store, SizedProbe(1, 1), dir.path());

        let err = intake
            .intake(Some("image/png"), &b"png"[..], &UploadPolicy::thumbnail(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::Storage(_)));
        assert!(staging_is_empty(dir.path()));
    }

    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            )))
        }
    }

    #[tokio::test]
    async fn client_read_failure_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let intake = intake_with(store.clone(), SizedProbe(1, 1), dir.path());

        let err = intake
            .intake(Some("image/png"), BrokenReader, &UploadPolicy::thumbnail(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::Read(_)));
        assert_eq!(AppError::from(err).status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(store.puts.lock().unwrap().is_empty());
        assert!(staging_is_empty(dir.path()));
    }
}
