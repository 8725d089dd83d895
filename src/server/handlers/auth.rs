use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use tracing::info;

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{removal_cookie, session_cookie, session_id};
use crate::services::CallbackParams;

/// Start the OAuth login: mark the session pending and send the browser to the provider.
pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: SignedCookieJar<Key>,
) -> Result<(SignedCookieJar<Key>, Redirect), ApiError> {
    state.auth.ensure_provider(&provider)?;

    let current = session_id(&jar);
    let redirect = state.auth.begin_login(current.as_deref()).await?;
    let jar = jar.add(session_cookie(redirect.session_id, state.secure_cookies()));

    Ok((jar, Redirect::to(&redirect.authorize_url)))
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: SignedCookieJar<Key>,
) -> Result<(SignedCookieJar<Key>, Redirect), ApiError> {
    state.auth.ensure_provider(&provider)?;

    let current = session_id(&jar);
    let login = state.auth.complete_login(current.as_deref(), &params).await?;
    let jar = jar.add(session_cookie(login.session_id, state.secure_cookies()));
    Ok((jar, Redirect::to("/")))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar<Key>,
) -> Result<(SignedCookieJar<Key>, Redirect), ApiError> {
    if let Some(current) = session_id(&jar) {
        state.auth.logout(&current).await?;
        info!("Session closed");
    }
    Ok((jar.remove(removal_cookie()), Redirect::to("/")))
}
