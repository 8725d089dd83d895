use axum::{extract::State, Json};

use crate::server::app::AppState;
use crate::server::session::CurrentUser;
use crate::services::{StoryDraft, StoryHints};

/// Draft a story from optional hints; never fails once the caller is authenticated.
#[utoipa::path(
    post,
    path = "/clova/make",
    request_body = StoryHints,
    responses(
        (status = 200, description = "Story draft", body = StoryDraft),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn make_draft(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(hints): Json<StoryHints>,
) -> Json<StoryDraft> {
    Json(state.text.generate(&hints).await)
}
