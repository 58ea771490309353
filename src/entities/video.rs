use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AssetReference, VideoRecord};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "videos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub thumbnail: Option<Json>,
    pub video: Option<Json>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn decode_reference(value: Option<Json>) -> Result<Option<AssetReference>, DbErr> {
    value
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| DbErr::Type(format!("invalid asset reference: {}", e)))
        })
        .transpose()
}

pub(crate) fn encode_reference(reference: Option<&AssetReference>) -> Result<Option<Json>, DbErr> {
    reference
        .map(|r| {
            serde_json::to_value(r)
                .map_err(|e| DbErr::Type(format!("unserializable asset reference: {}", e)))
        })
        .transpose()
}

impl TryFrom<Model> for VideoRecord {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            thumbnail: decode_reference(model.thumbnail)?,
            video: decode_reference(model.video)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
