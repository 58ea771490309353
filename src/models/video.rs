use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AssetReference;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<AssetReference>,
    pub video: Option<AssetReference>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One of the two asset slots on a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    Thumbnail,
    Video,
}

impl VideoRecord {
    pub fn slot(&self, slot: AssetSlot) -> Option<&AssetReference> {
        match slot {
            AssetSlot::Thumbnail => self.thumbnail.as_ref(),
            AssetSlot::Video => self.video.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: AssetSlot) -> &mut Option<AssetReference> {
        match slot {
            AssetSlot::Thumbnail => &mut self.thumbnail,
            AssetSlot::Video => &mut self.video,
        }
    }
}

/// Outcome of writing a single slot.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    pub record: VideoRecord,
    /// Whatever the slot pointed at before the write.
    pub previous: Option<AssetReference>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
}

/// Video record as returned to clients, with asset URLs resolved.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VideoResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
