use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Server-side session lifetime.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub session_id: String,
    pub oauth_state: Option<String>, // set while a login is pending
    pub user_id: Option<i32>,
    pub naver_id: Option<String>,
    pub user_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub raw_profile: Option<String>, // JSON of the provider profile
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub expires_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(session_id: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ActiveValue::NotSet,
            session_id: Set(session_id),
            oauth_state: Set(None),
            user_id: Set(None),
            naver_id: Set(None),
            user_name: Set(None),
            raw_profile: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            expires_at: Set(now + chrono::Duration::hours(SESSION_TTL_HOURS)),
        }
    }

    pub fn set_pending(mut self, oauth_state: String) -> Self {
        self.oauth_state = Set(Some(oauth_state));
        self.user_id = Set(None);
        self.naver_id = Set(None);
        self.user_name = Set(None);
        self.raw_profile = Set(None);
        self.touch()
    }

    pub fn touch(mut self) -> Self {
        let now = chrono::Utc::now();
        self.updated_at = Set(now);
        self.expires_at = Set(now + chrono::Duration::hours(SESSION_TTL_HOURS));
        self
    }
}

impl Model {
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now() > self.expires_at
    }
}
