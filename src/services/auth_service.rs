use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{info, instrument, warn};

use super::session_service::{SessionState, SessionStore, SessionUser};
use super::user_service::UserService;
use crate::errors::{AuthError, AuthResult};
use crate::providers::OAuthProvider;

/// Where to send the browser to start a login
#[derive(Clone, Debug)]
pub struct LoginRedirect {
    pub session_id: String,
    pub authorize_url: String,
}

/// Session created by a successful callback; its id replaces the pre-login cookie
#[derive(Clone, Debug)]
pub struct AuthenticatedSession {
    pub session_id: String,
    pub user: SessionUser,
}

/// Query parameters the provider appends to the callback URL
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Drives the OAuth login state machine for one provider
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn OAuthProvider>,
    redirect_uri: String,
    sessions: SessionStore,
    users: UserService,
}

impl AuthService {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn OAuthProvider>, redirect_uri: String) -> Self {
        Self {
            provider,
            redirect_uri,
            sessions: SessionStore::new(db.clone()),
            users: UserService::new(db),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn ensure_provider(&self, provider: &str) -> AuthResult<()> {
        if provider == self.provider.name() {
            Ok(())
        } else {
            Err(AuthError::UnsupportedProvider(provider.to_string()))
        }
    }

    pub async fn begin_login(&self, session_id: Option<&str>) -> AuthResult<LoginRedirect> {
        let (session_id, oauth_state) = self.sessions.begin_login(session_id).await?;
        let authorize_url = self.provider.authorize_url(&oauth_state, &self.redirect_uri);
        Ok(LoginRedirect {
            session_id,
            authorize_url,
        })
    }

    /// Finish the authorization-code flow and authenticate the session.
    ///
    /// The session must be pending with the same `state` the provider echoes back.
    /// The user row is upserted by provider id, so repeated logins reuse one user.
    /// The pending session is retired and a new session id is issued.
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn complete_login(
        &self,
        session_id: Option<&str>,
        params: &CallbackParams,
    ) -> AuthResult<AuthenticatedSession> {
        let session_id = session_id.ok_or(AuthError::InvalidState)?;

        let expected = match self.sessions.load(session_id).await? {
            SessionState::Pending { oauth_state } => oauth_state,
            _ => return Err(AuthError::InvalidState),
        };
        if params.state.as_deref() != Some(expected.as_str()) {
            warn!("OAuth callback state mismatch");
            return Err(AuthError::InvalidState);
        }

        if let Some(error) = &params.error {
            let reason = params.error_description.as_deref().unwrap_or(error);
            return Err(AuthError::MissingCode(reason.to_string()));
        }
        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::MissingCode("no code parameter".to_string()))?;

        let token = self.provider.exchange_code(code, &expected).await?;
        let profile = self.provider.fetch_profile(&token).await?;
        if profile.id.trim().is_empty() {
            return Err(AuthError::InvalidProfile("provider id is empty".to_string()));
        }

        let user = self
            .users
            .upsert_from_profile(&profile.id, &profile.display_name())
            .await?;
        let session_user = SessionUser {
            id: user.id,
            naver_id: user.naver_id,
            name: user.name,
            raw: profile.raw,
        };
        let session_id = self
            .sessions
            .rotate_authenticated(session_id, &session_user)
            .await?;

        info!(user_id = session_user.id, "User logged in");
        Ok(AuthenticatedSession {
            session_id,
            user: session_user,
        })
    }

    pub async fn current_user(&self, session_id: &str) -> AuthResult<Option<SessionUser>> {
        Ok(self.sessions.load(session_id).await?.user().cloned())
    }

    pub async fn logout(&self, session_id: &str) -> AuthResult<()> {
        self.sessions.destroy(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::Users;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::{ProviderError, ProviderResult};
    use crate::providers::{OAuthProfile, OAuthToken};
    use async_trait::async_trait;
    use sea_orm::EntityTrait;
    use serde_json::json;

    struct FakeOAuth {
        fail_exchange: bool,
    }

    #[async_trait]
    impl OAuthProvider for FakeOAuth {
        fn name(&self) -> &'static str {
            "naver"
        }

        fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
            format!("https://auth.test/authorize?state={}&redirect_uri={}", state, redirect_uri)
        }

        async fn exchange_code(&self, code: &str, _state: &str) -> ProviderResult<OAuthToken> {
            if self.fail_exchange {
                return Err(ProviderError::invalid_response("naver", "invalid_grant"));
            }
            Ok(OAuthToken {
                access_token: format!("token-{}", code),
            })
        }

        async fn fetch_profile(&self, _token: &OAuthToken) -> ProviderResult<OAuthProfile> {
            Ok(OAuthProfile {
                id: "naver-42".to_string(),
                name: None,
                nickname: Some("하늘".to_string()),
                raw: json!({"id": "naver-42", "nickname": "하늘"}),
            })
        }
    }

    async fn service(fail_exchange: bool) -> (AuthService, DatabaseConnection) {
        let db = setup_test_db().await;
        let service = AuthService::new(
            db.clone(),
            Arc::new(FakeOAuth { fail_exchange }),
            "http://localhost:8000/auth/naver/callback".to_string(),
        );
        (service, db)
    }

    fn callback(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    fn state_from(url: &str) -> String {
        url.split("state=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .expect("state param")
            .to_string()
    }

    #[tokio::test]
    async fn test_login_twice_keeps_one_user() {
        let (service, db) = service(false).await;

        let mut user_ids = Vec::new();
        for _ in 0..2 {
            let redirect = service.begin_login(None).await.expect("begin");
            let state = state_from(&redirect.authorize_url);
            let login = service
                .complete_login(Some(&redirect.session_id), &callback("c", &state))
                .await
                .expect("login");
            assert_eq!(login.user.name, "하늘");
            user_ids.push(login.user.id);

            let current = service.current_user(&login.session_id).await.expect("current");
            assert_eq!(current.map(|u| u.id), Some(login.user.id));
        }

        assert_eq!(user_ids[0], user_ids[1]);
        assert_eq!(Users::find().all(&db).await.expect("users").len(), 1);
    }

    #[tokio::test]
    async fn test_state_mismatch_is_rejected() {
        let (service, _db) = service(false).await;
        let redirect = service.begin_login(None).await.expect("begin");

        let err = service
            .complete_login(Some(&redirect.session_id), &callback("c", "forged"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidState));

        let err = service
            .complete_login(None, &callback("c", "forged"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidState));
    }

    #[tokio::test]
    async fn test_provider_denial_and_failures() {
        let (service, _db) = service(true).await;
        let redirect = service.begin_login(None).await.expect("begin");
        let state = state_from(&redirect.authorize_url);

        let denied = CallbackParams {
            state: Some(state.clone()),
            error: Some("access_denied".to_string()),
            ..Default::default()
        };
        let err = service
            .complete_login(Some(&redirect.session_id), &denied)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCode(_)));

        let err = service
            .complete_login(Some(&redirect.session_id), &callback("c", &state))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)));
        assert!(service
            .current_user(&redirect.session_id)
            .await
            .expect("current")
            .is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (service, _db) = service(false).await;
        let redirect = service.begin_login(None).await.expect("begin");
        let state = state_from(&redirect.authorize_url);
        let login = service
            .complete_login(Some(&redirect.session_id), &callback("c", &state))
            .await
            .expect("login");

        service.logout(&login.session_id).await.expect("logout");
        assert!(service
            .current_user(&login.session_id)
            .await
            .expect("current")
            .is_none());
    }

    #[tokio::test]
    async fn test_planted_session_id_is_not_authenticated() {
        let (service, _db) = service(false).await;

        // A session started elsewhere and handed to the victim's browser
        let planted = service.begin_login(None).await.expect("planted");
        let redirect = service
            .begin_login(Some(&planted.session_id))
            .await
            .expect("victim begin");
        let state = state_from(&redirect.authorize_url);

        let login = service
            .complete_login(Some(&redirect.session_id), &callback("c", &state))
            .await
            .expect("login");

        assert_ne!(login.session_id, planted.session_id);
        assert!(service
            .current_user(&planted.session_id)
            .await
            .expect("current")
            .is_none());
        assert_eq!(
            service
                .current_user(&login.session_id)
                .await
                .expect("current")
                .map(|u| u.name),
            Some("하늘".to_string())
        );
    }

    #[tokio::test]
    async fn test_ensure_provider() {
        let (service, _db) = service(false).await;
        assert!(service.ensure_provider("naver").is_ok());
        assert!(matches!(
            service.ensure_provider("kakao"),
            Err(AuthError::UnsupportedProvider(_))
        ));
    }
}
