//! Shared fixtures: an in-memory app with a fake bucket and a fixed probe.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use tubekit::auth::{issue_jwt, ACCESS_TOKEN_TTL};
use tubekit::config::{Config, StorageConfig};
use tubekit::models::{AssetReference, NewVideo, VideoRecord};
use tubekit::repository::{MemoryUserRepository, MemoryVideoRepository, VideoRepository};
use tubekit::routes::create_routes;
use tubekit::services::probe::{MediaProbe, ProbeError, ProbeOutput, ProbeStream};
use tubekit::services::storage::{AssetStore, StorageError, StorageResult};
use tubekit::state::AppState;

pub const BUCKET: &str = "tubes";
pub const JWT_SECRET: &str = "test-secret";
const BOUNDARY: &str = "tubekit-test-boundary";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Bucket in a map; every presign gets a new signature.
#[derive(Default)]
pub struct FakeBucket {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    presigned: AtomicU64,
}

impl FakeBucket {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl AssetStore for FakeBucket {
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> StorageResult<AssetReference> {
        let bytes = tokio::fs::read(source).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(AssetReference::addressed(BUCKET, key))
    }

    async fn delete_object(&self, reference: &AssetReference) -> StorageResult<()> {
        let AssetReference::Addressed { bucket, key } = reference else {
            return Err(StorageError::InvalidKey(format!("{:?}", reference)));
        };
        assert_eq!(bucket, BUCKET);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let n = self.presigned.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://{}.s3.test/{}?X-Amz-Expires={}&X-Amz-Signature={:08x}",
            BUCKET,
            key,
            expires_in.as_secs(),
            n
        ))
    }

    fn bucket(&self) -> Option<&str> {
        Some(BUCKET)
    }
}

/// Reports a single stream of fixed dimensions and remembers what it probed.
pub struct FixedProbe {
    pub width: u32,
    pub height: u32,
    pub delay: Duration,
    pub probed: Mutex<Vec<PathBuf>>,
}

impl FixedProbe {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            delay: Duration::ZERO,
            probed: Mutex::new(Vec::new()),
        }
    }

    /// Holds every probe for `delay`, keeping an upload in flight.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ProbeError> {
        assert!(path.exists(), "probe should run on the staged file");
        self.probed.lock().unwrap().push(path.to_path_buf());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ProbeOutput {
            streams: vec![ProbeStream {
                width: self.width,
                height: self.height,
            }],
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub bucket: Arc<FakeBucket>,
    pub probe: Arc<FixedProbe>,
    pub videos: Arc<MemoryVideoRepository>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        port: 0,
        platform: "test".to_string(),
        storage: StorageConfig::S3 {
            bucket: BUCKET.to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        },
        ffprobe_path: "ffprobe".to_string(),
        probe_timeout: Duration::from_secs(5),
        thumbnail_max_bytes: 10 << 20,
        video_max_bytes: 1 << 30,
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), FixedProbe::new(1920, 1080))
    }

    pub fn with(config: Config, probe: FixedProbe) -> Self {
        let bucket = Arc::new(FakeBucket::default());
        let probe = Arc::new(probe);
        let videos = Arc::new(MemoryVideoRepository::new());
        let state = AppState::new(
            config,
            Arc::new(MemoryUserRepository::new()),
            videos.clone(),
            bucket.clone(),
            probe.clone(),
        );

        Self {
            router: create_routes(state),
            bucket,
            probe,
            videos,
        }
    }

    pub async fn seed_video(&self, owner: Uuid) -> VideoRecord {
        self.videos
            .create_video(NewVideo {
                user_id: owner,
                title: "Boots and cats".to_string(),
                description: "a test video".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn token_for(user: Uuid) -> String {
    issue_jwt(user, JWT_SECRET, ACCESS_TOKEN_TTL).unwrap()
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
