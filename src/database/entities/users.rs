use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub naver_id: String,
    pub name: String,
    pub child_name: Option<String>,
    pub child_age: Option<i32>,
    pub child_pers: Option<String>,
    pub child_gender: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stories::Entity")]
    Stories,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(naver_id: String, name: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ActiveValue::NotSet,
            naver_id: Set(naver_id),
            name: Set(name),
            child_name: Set(None),
            child_age: Set(None),
            child_pers: Set(None),
            child_gender: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    pub fn set_updated_at(mut self) -> Self {
        self.updated_at = Set(chrono::Utc::now());
        self
    }
}
