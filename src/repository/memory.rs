use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{UserRepository, VideoRepository};
use crate::error::AppError;
use crate::models::{AssetReference, AssetSlot, NewVideo, SlotUpdate, User, VideoRecord};

/// Video records keyed by id, guarded by a single lock.
#[derive(Default)]
pub struct MemoryVideoRepository {
    videos: RwLock<HashMap<Uuid, VideoRecord>>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn create_video(&self, new: NewVideo) -> Result<VideoRecord, AppError> {
        let now = chrono::Utc::now().naive_utc();
        let record = VideoRecord {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            thumbnail: None,
            video: None,
            created_at: now,
            updated_at: now,
        };
        self.videos.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn set_asset(
        &self,
        id: Uuid,
        slot: AssetSlot,
        reference: &AssetReference,
    ) -> Result<SlotUpdate, AppError> {
        let mut videos = self.videos.write().await;
        let record = videos
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

        let previous = record.slot_mut(slot).replace(reference.clone());
        record.updated_at = chrono::Utc::now().naive_utc();
        Ok(SlotUpdate {
            record: record.clone(),
            previous,
        })
    }

    async fn list_videos(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError> {
        let mut owned: Vec<VideoRecord> = self
            .videos
            .read()
            .await
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

/// Users keyed by email.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        };
        users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}
