use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::MaybeUser;
use crate::services::text_generator::{DEFAULT_AGE, DEFAULT_HERO};

pub async fn home(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let user = user.map(|current| json!({"id": current.user.id, "name": current.user.name}));
    let html = state
        .views
        .render("index", json!({"page_title": "홈", "user": user}))?;
    Ok(Html(html))
}

pub async fn make_storybook(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ApiError> {
    let Some(current) = user else {
        return Ok(Redirect::to("/").into_response());
    };

    let html = state.views.render(
        "storybook",
        json!({
            "page_title": "동화 만들기",
            "user": {"id": current.user.id, "name": current.user.name},
            "default_hero": DEFAULT_HERO,
            "default_age": DEFAULT_AGE,
            "images_enabled": state.images.is_some(),
        }),
    )?;
    Ok(Html(html).into_response())
}
