use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::errors::StoryError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{CurrentUser, MaybeUser};
use crate::services::{ImageOrchestrator, StoryDraft, StoryImageOut, StoryLoad};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MakeStoryResponse {
    pub story_id: i32,
    pub title: String,
    pub images: Vec<StoryImageOut>,
}

#[derive(Deserialize)]
pub struct StoryPageQuery {
    pub id: Option<i32>,
}

fn image_orchestrator(state: &AppState) -> Result<&ImageOrchestrator, StoryError> {
    state
        .images
        .as_ref()
        .ok_or(StoryError::MissingConfig("GEMINI_API_KEY"))
}

/// Persist a story, then illustrate each of its scenes.
#[utoipa::path(
    post,
    path = "/story/make",
    request_body = StoryDraft,
    responses(
        (status = 200, description = "Story stored; images lists the scenes that were illustrated", body = MakeStoryResponse),
        (status = 400, description = "Empty title or no paragraphs"),
        (status = 401, description = "Not logged in"),
        (status = 503, description = "Image generation not configured")
    )
)]
pub async fn make_story(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<StoryDraft>,
) -> Result<Json<MakeStoryResponse>, ApiError> {
    let images = image_orchestrator(&state)?;

    let story = state.stories.create_story(current.user.id, &draft).await?;
    let created = images
        .illustrate(story.id, &story.title, &draft.paragraphs)
        .await?;

    Ok(Json(MakeStoryResponse {
        story_id: story.id,
        title: story.title,
        images: created,
    }))
}

/// Illustrate the scenes of an existing story that still lack an image.
#[utoipa::path(
    post,
    path = "/story/{id}/images",
    params(("id" = i32, Path, description = "Story id")),
    responses(
        (status = 200, description = "Images created by this pass", body = MakeStoryResponse),
        (status = 404, description = "No such story for this user"),
        (status = 503, description = "Image generation not configured")
    )
)]
pub async fn resume_images(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(story_id): Path<i32>,
) -> Result<Json<MakeStoryResponse>, ApiError> {
    let images = image_orchestrator(&state)?;
    let story = state
        .stories
        .get_story_for_user(story_id, current.user.id)
        .await?;

    let created = images
        .illustrate(story.id, &story.title, &story.paragraphs)
        .await?;

    Ok(Json(MakeStoryResponse {
        story_id: story.id,
        title: story.title,
        images: created,
    }))
}

#[utoipa::path(
    get,
    path = "/story/{id}",
    params(("id" = i32, Path, description = "Story id")),
    responses(
        (status = 200, description = "Story with paragraphs and images", body = StoryLoad),
        (status = 404, description = "No such story for this user")
    )
)]
pub async fn get_story(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(story_id): Path<i32>,
) -> Result<Json<StoryLoad>, ApiError> {
    let story = state
        .stories
        .get_story_for_user(story_id, current.user.id)
        .await?;
    Ok(Json(story))
}

/// Pair each paragraph with its image URL, if one was generated.
fn scenes(story: &StoryLoad) -> Vec<Value> {
    story
        .paragraphs
        .iter()
        .enumerate()
        .map(|(idx, paragraph)| {
            let image_url = story
                .images
                .iter()
                .find(|image| image.idx == idx as i32)
                .map(|image| image.url.clone());
            json!({
                "title": paragraph.title,
                "text": paragraph.text,
                "image_url": image_url,
            })
        })
        .collect()
}

pub async fn stories_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<StoryPageQuery>,
) -> Result<Response, ApiError> {
    let Some(current) = user else {
        return Ok(Redirect::to("/").into_response());
    };
    let user_json = json!({"id": current.user.id, "name": current.user.name});

    let data = match query.id {
        Some(story_id) => {
            let story = state
                .stories
                .get_story_for_user(story_id, current.user.id)
                .await?;
            json!({
                "page_title": story.title,
                "user": user_json,
                "scenes": scenes(&story),
                "story": story,
            })
        }
        None => {
            let stories = state.stories.list_stories_for_user(current.user.id).await?;
            json!({
                "page_title": "내 동화",
                "user": user_json,
                "stories": stories,
            })
        }
    };

    Ok(Html(state.views.render("stories", data)?).into_response())
}
