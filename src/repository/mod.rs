//! Persistence seams for users and video records.
//!
//! Handlers only see these traits. `postgres` backs them with SeaORM, `memory`
//! with a lock-guarded map for tests and local experiments.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AssetReference, AssetSlot, NewVideo, SlotUpdate, User, VideoRecord};

pub use memory::{MemoryUserRepository, MemoryVideoRepository};
pub use postgres::{SeaOrmUserRepository, SeaOrmVideoRepository};

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create_video(&self, video: NewVideo) -> Result<VideoRecord, AppError>;

    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError>;

    /// Points one slot at `reference` and bumps `updated_at`. The other slot is
    /// left as stored, so concurrent uploads to different slots both survive.
    async fn set_asset(
        &self,
        id: Uuid,
        slot: AssetSlot,
        reference: &AssetReference,
    ) -> Result<SlotUpdate, AppError>;

    /// Newest first.
    async fn list_videos(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}
