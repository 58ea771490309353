use serde::{Deserialize, Serialize};

/// Reference to a stored binary asset, as persisted on a video record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetReference {
    /// Servable as-is; never expires.
    Direct { url: String },
    /// Object in a bucket; has to be presigned before a client can fetch it.
    Addressed { bucket: String, key: String },
}

impl AssetReference {
    pub fn direct(url: impl Into<String>) -> Self {
        AssetReference::Direct { url: url.into() }
    }

    pub fn addressed(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        AssetReference::Addressed {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Result of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub reference: AssetReference,
    pub media_type: String,
    pub key: String,
    pub size: u64,
}
