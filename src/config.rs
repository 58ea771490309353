use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Thumbnails are small images; anything above this is rejected after staging.
pub const THUMBNAIL_MAX_BYTES: u64 = 10 << 20;
/// Hard cap for video payloads.
pub const VIDEO_MAX_BYTES: u64 = 1 << 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where uploaded assets end up.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    /// Files under `assets_root`, served back from `base_url`.
    Local { assets_root: PathBuf, base_url: String },
    /// An S3 bucket; reads go through presigned URLs.
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub platform: String,
    pub storage: StorageConfig,
    pub ffprobe_path: String,
    pub probe_timeout: Duration,
    pub thumbnail_max_bytes: u64,
    pub video_max_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let port = parsed("PORT", 8091)?;
        let platform = env::var("PLATFORM").unwrap_or_else(|_| "dev".to_string());

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageConfig::Local {
                assets_root: env::var("ASSETS_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./assets")),
                base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            },
            "s3" => StorageConfig::S3 {
                bucket: required("S3_BUCKET")?,
                region: required("S3_REGION")?,
                endpoint: env::var("S3_ENDPOINT").ok(),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    reason: format!("expected 'local' or 's3', got '{}'", other),
                })
            }
        };

        let ffprobe_path = env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string());
        let probe_timeout = Duration::from_secs(parsed("PROBE_TIMEOUT_SECS", 30)?);

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            platform,
            storage,
            ffprobe_path,
            probe_timeout,
            thumbnail_max_bytes: THUMBNAIL_MAX_BYTES,
            video_max_bytes: VIDEO_MAX_BYTES,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
