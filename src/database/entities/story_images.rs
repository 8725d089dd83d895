use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "story_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub idx: i32, // scene position within the story; unique per story
    #[sea_orm(column_type = "Text")]
    pub prompt: String,
    pub file_path: String,
    pub mime_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stories::Entity",
        from = "Column::StoryId",
        to = "super::stories::Column::Id",
        on_delete = "Cascade"
    )]
    Stories,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(story_id: i32, idx: i32, prompt: String, file_path: String) -> Self {
        Self {
            id: ActiveValue::NotSet,
            story_id: Set(story_id),
            idx: Set(idx),
            prompt: Set(prompt),
            file_path: Set(file_path),
            mime_type: Set(DEFAULT_MIME_TYPE.to_string()),
        }
    }
}
