use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::database::entities::{user_sessions, UserSessions};
use crate::errors::AuthResult;

/// The only user data kept in a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub naver_id: String,
    pub name: String,
    pub raw: Value,
}

/// Login progress of one browser session
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Anonymous,
    Pending { oauth_state: String },
    Authenticated(SessionUser),
}

impl SessionState {
    fn from_model(model: &user_sessions::Model) -> AuthResult<Self> {
        if let (Some(id), Some(naver_id), Some(name)) =
            (model.user_id, model.naver_id.as_ref(), model.user_name.as_ref())
        {
            let raw = match model.raw_profile.as_deref() {
                Some(raw) => serde_json::from_str(raw)?,
                None => Value::Null,
            };
            return Ok(SessionState::Authenticated(SessionUser {
                id,
                naver_id: naver_id.clone(),
                name: name.clone(),
                raw,
            }));
        }

        Ok(match &model.oauth_state {
            Some(oauth_state) => SessionState::Pending {
                oauth_state: oauth_state.clone(),
            },
            None => SessionState::Anonymous,
        })
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Server-side session rows keyed by the id held in the signed cookie
#[derive(Clone)]
pub struct SessionStore {
    db: DatabaseConnection,
}

impl SessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn find_live(&self, session_id: &str) -> AuthResult<Option<user_sessions::Model>> {
        let Some(session) = UserSessions::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            debug!("Dropping expired session");
            UserSessions::delete_by_id(session.id).exec(&self.db).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn load(&self, session_id: &str) -> AuthResult<SessionState> {
        match self.find_live(session_id).await? {
            Some(session) => SessionState::from_model(&session),
            None => Ok(SessionState::Anonymous),
        }
    }

    /// Move the session into the pending state with a fresh CSRF token.
    ///
    /// Returns the session id actually used (a new one when the given id is
    /// missing or expired) and the token to send to the provider.
    pub async fn begin_login(&self, session_id: Option<&str>) -> AuthResult<(String, String)> {
        let oauth_state = Uuid::new_v4().simple().to_string();

        let existing = match session_id {
            Some(session_id) => self.find_live(session_id).await?,
            None => None,
        };
        let session = match existing {
            Some(session) => {
                session
                    .into_active_model()
                    .set_pending(oauth_state.clone())
                    .update(&self.db)
                    .await?
            }
            None => {
                user_sessions::ActiveModel::new(Self::new_session_id())
                    .set_pending(oauth_state.clone())
                    .insert(&self.db)
                    .await?
            }
        };

        Ok((session.session_id, oauth_state))
    }

    /// Replace a pending session with a freshly keyed authenticated one.
    ///
    /// The pre-login id is deleted, so a cookie planted before login never
    /// becomes authenticated.
    pub async fn rotate_authenticated(&self, previous_id: &str, user: &SessionUser) -> AuthResult<String> {
        let txn = self.db.begin().await?;
        UserSessions::delete_many()
            .filter(user_sessions::Column::SessionId.eq(previous_id))
            .exec(&txn)
            .await?;

        let session_id = Self::new_session_id();
        let mut active = user_sessions::ActiveModel::new(session_id.clone());
        active.user_id = Set(Some(user.id));
        active.naver_id = Set(Some(user.naver_id.clone()));
        active.user_name = Set(Some(user.name.clone()));
        active.raw_profile = Set(Some(serde_json::to_string(&user.raw)?));
        active.insert(&txn).await?;
        txn.commit().await?;

        debug!("Session rotated on login");
        Ok(session_id)
    }

    /// Overwrite the user stored in an existing session.
    pub async fn authenticate(&self, session_id: &str, user: &SessionUser) -> AuthResult<()> {
        let raw_profile = serde_json::to_string(&user.raw)?;
        let mut active = match self.find_live(session_id).await? {
            Some(session) => session.into_active_model(),
            None => user_sessions::ActiveModel::new(session_id.to_string()),
        };

        active.oauth_state = Set(None);
        active.user_id = Set(Some(user.id));
        active.naver_id = Set(Some(user.naver_id.clone()));
        active.user_name = Set(Some(user.name.clone()));
        active.raw_profile = Set(Some(raw_profile));
        active.touch().save(&self.db).await?;
        Ok(())
    }

    pub async fn destroy(&self, session_id: &str) -> AuthResult<()> {
        UserSessions::delete_many()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let result = UserSessions::delete_many()
            .filter(user_sessions::Column::ExpiresAt.lt(chrono::Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
