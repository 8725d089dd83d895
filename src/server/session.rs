use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};

use super::app::AppState;
use super::error::ApiError;
use crate::errors::AuthError;
use crate::services::SessionUser;

pub const SESSION_COOKIE: &str = "storybook_session";

pub fn session_id(jar: &SignedCookieJar<Key>) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Authenticated caller; rejects with 401 JSON otherwise
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub session_id: String,
    pub user: SessionUser,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.ok_or_else(|| AuthError::AuthenticationRequired.into())
    }
}

/// Caller if logged in; pages use this to redirect anonymous visitors
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(session_id) = session_id(&jar) else {
            return Ok(MaybeUser(None));
        };

        let user = state.auth.current_user(&session_id).await?;
        Ok(MaybeUser(user.map(|user| CurrentUser { session_id, user })))
    }
}
