use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::database::entities::{users, Users};
use crate::errors::{AuthError, AuthResult};

/// Partial profile update; absent fields are left untouched
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub child_name: Option<String>,
    pub child_age: Option<i32>,
    pub child_pers: Option<String>,
    pub child_gender: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.child_name.is_none()
            && self.child_age.is_none()
            && self.child_pers.is_none()
            && self.child_gender.is_none()
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find(&self, user_id: i32) -> AuthResult<Option<users::Model>> {
        Ok(Users::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn find_by_naver_id(&self, naver_id: &str) -> AuthResult<Option<users::Model>> {
        Ok(Users::find()
            .filter(users::Column::NaverId.eq(naver_id))
            .one(&self.db)
            .await?)
    }

    /// Return the user for `naver_id`, creating it on first login.
    ///
    /// Existing users keep their stored name; a returning login never overwrites
    /// a name the user edited on the profile page. Concurrent first logins race
    /// on the unique `naver_id` and both end up with the same row.
    pub async fn upsert_from_profile(&self, naver_id: &str, name: &str) -> AuthResult<users::Model> {
        let inserted = Users::insert(users::ActiveModel::new(naver_id.to_string(), name.to_string()))
            .on_conflict(
                OnConflict::column(users::Column::NaverId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let user = self
            .find_by_naver_id(naver_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if inserted > 0 {
            info!(user_id = user.id, "Registered new user");
        }
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: i32, update: UserUpdate) -> AuthResult<users::Model> {
        let user = self.find(user_id).await?.ok_or(AuthError::UserNotFound)?;
        if update.is_empty() {
            return Ok(user);
        }

        let mut active = user.into_active_model();
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AuthError::InvalidUpdate("name must not be empty".to_string()));
            }
            active.name = Set(name);
        }
        if let Some(child_name) = update.child_name {
            active.child_name = Set(Some(child_name));
        }
        if let Some(child_age) = update.child_age {
            if !(0..=18).contains(&child_age) {
                return Err(AuthError::InvalidUpdate(format!(
                    "child_age {} is out of range",
                    child_age
                )));
            }
            active.child_age = Set(Some(child_age));
        }
        if let Some(child_pers) = update.child_pers {
            active.child_pers = Set(Some(child_pers));
        }
        if let Some(child_gender) = update.child_gender {
            active.child_gender = Set(Some(child_gender));
        }

        Ok(active.set_updated_at().update(&self.db).await?)
    }
}
