use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{UserRepository, VideoRepository};
use crate::entities::video::encode_reference;
use crate::entities::{user, video};
use crate::error::AppError;
use crate::models::{AssetReference, AssetSlot, NewVideo, SlotUpdate, User, VideoRecord};

#[derive(Clone)]
pub struct SeaOrmVideoRepository {
    db: DatabaseConnection,
}

impl SeaOrmVideoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SeaOrmVideoRepository {
    async fn create_video(&self, new: NewVideo) -> Result<VideoRecord, AppError> {
        let now = chrono::Utc::now().naive_utc();
        let model = video::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            title: Set(new.title),
            description: Set(new.description),
            thumbnail: Set(None),
            video: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = model.insert(&self.db).await?;
        Ok(VideoRecord::try_from(saved)?)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        let found = video::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(VideoRecord::try_from).transpose()?)
    }

    async fn set_asset(
        &self,
        id: Uuid,
        slot: AssetSlot,
        reference: &AssetReference,
    ) -> Result<SlotUpdate, AppError> {
        let column = match slot {
            AssetSlot::Thumbnail => video::Column::Thumbnail,
            AssetSlot::Video => video::Column::Video,
        };
        let not_found = || AppError::NotFound(format!("Video {} not found", id));

        let txn = self.db.begin().await?;

        // Row lock so the reported previous reference is the one actually replaced.
        let current = video::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(not_found)?;
        let previous = VideoRecord::try_from(current)?.slot(slot).cloned();

        video::Entity::update_many()
            .col_expr(column, Expr::value(encode_reference(Some(reference))?))
            .col_expr(
                video::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().naive_utc()),
            )
            .filter(video::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        let updated = video::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(not_found)?;
        txn.commit().await?;

        Ok(SlotUpdate {
            record: VideoRecord::try_from(updated)?,
            previous,
        })
    }

    async fn list_videos(&self, user_id: Uuid) -> Result<Vec<VideoRecord>, AppError> {
        let models = video::Entity::find()
            .filter(video::Column::UserId.eq(user_id))
            .order_by_desc(video::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models
            .into_iter()
            .map(|m| VideoRecord::try_from(m).map_err(AppError::from))
            .collect()
    }
}

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let now = chrono::Utc::now().naive_utc();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password: Set(password_hash.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok(created.into()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(AppError::Conflict("Email already registered".to_string()))
                }
                _ => Err(AppError::DatabaseError(e)),
            },
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(found.map(User::from))
    }
}
