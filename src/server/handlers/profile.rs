use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::database::entities::users;
use crate::errors::AuthError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{CurrentUser, MaybeUser};
use crate::services::{SessionUser, UserUpdate};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    pub name: String,
    pub child_name: Option<String>,
    pub child_age: Option<i32>,
    pub child_pers: Option<String>,
    pub child_gender: Option<String>,
}

impl From<users::Model> for ProfileResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            child_name: user.child_name,
            child_age: user.child_age,
            child_pers: user.child_pers,
            child_gender: user.child_gender,
        }
    }
}

pub async fn profile_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, ApiError> {
    let Some(current) = user else {
        return Ok(Redirect::to("/").into_response());
    };

    let profile = state
        .users
        .find(current.user.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let html = state.views.render(
        "profile",
        json!({
            "page_title": "프로필",
            "user": {"id": current.user.id, "name": current.user.name},
            "profile": ProfileResponse::from(profile),
        }),
    )?;
    Ok(Html(html).into_response())
}

#[utoipa::path(
    post,
    path = "/profile/update",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid field value"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let updated = state.users.update_profile(current.user.id, update).await?;

    if updated.name != current.user.name {
        let refreshed = SessionUser {
            name: updated.name.clone(),
            ..current.user
        };
        state
            .auth
            .sessions()
            .authenticate(&current.session_id, &refreshed)
            .await?;
    }

    Ok(Json(ProfileResponse::from(updated)))
}
