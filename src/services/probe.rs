//! Video geometry classification through an external probe.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

const LANDSCAPE_RATIO: f64 = 1.778;
const PORTRAIT_RATIO: f64 = 0.5625;
const RATIO_TOLERANCE: f64 = 0.001;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start probe: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("probe did not finish within {0:?}")]
    Timeout(Duration),
    #[error("probe exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("unparsable probe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no streams found in probe output")]
    NoStreams,
    #[error("height is zero, cannot calculate aspect ratio")]
    ZeroHeight,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProbeStream {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl ProbeOutput {
    pub fn parse(raw: &[u8]) -> Result<Self, ProbeError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// Describes the streams of a local media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ProbeError>;
}

/// Runs `ffprobe` and reads its JSON stream listing.
#[derive(Debug, Clone)]
pub struct FfprobeCommand {
    binary: String,
    timeout: Duration,
}

impl FfprobeCommand {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeCommand {
    #[tracing::instrument(skip(self), fields(binary = %self.binary))]
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ProbeError> {
        let child = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProbeError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(status = %output.status, stderr = %stderr, "ffprobe failed");
            return Err(ProbeError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        ProbeOutput::parse(&output.stdout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoGeometryClass {
    Landscape,
    Portrait,
    Other,
}

impl VideoGeometryClass {
    /// Narrow windows around exactly 16:9 and 9:16; everything else is `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Result<Self, ProbeError> {
        if height == 0 {
            return Err(ProbeError::ZeroHeight);
        }

        let ratio = f64::from(width) / f64::from(height);
        Ok(if (ratio - LANDSCAPE_RATIO).abs() <= RATIO_TOLERANCE {
            VideoGeometryClass::Landscape
        } else if (ratio - PORTRAIT_RATIO).abs() <= RATIO_TOLERANCE {
            VideoGeometryClass::Portrait
        } else {
            VideoGeometryClass::Other
        })
    }

    pub fn key_prefix(self) -> &'static str {
        match self {
            VideoGeometryClass::Landscape => "landscape/",
            VideoGeometryClass::Portrait => "portrait/",
            VideoGeometryClass::Other => "other/",
        }
    }
}

impl fmt::Display for VideoGeometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VideoGeometryClass::Landscape => "landscape",
            VideoGeometryClass::Portrait => "portrait",
            VideoGeometryClass::Other => "other",
        })
    }
}

/// Classifies the first stream the probe reports for `path`.
pub async fn classify(
    probe: &dyn MediaProbe,
    path: &Path,
) -> Result<VideoGeometryClass, ProbeError> {
    let output = probe.probe(path).await?;
    let first = output.streams.first().ok_or(ProbeError::NoStreams)?;
    VideoGeometryClass::from_dimensions(first.width, first.height)
}
