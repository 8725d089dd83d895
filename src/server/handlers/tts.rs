use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::SpeechError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::CurrentUser;
use crate::services::{SpeechService, TtsRequest};

#[utoipa::path(
    post,
    path = "/tts",
    request_body = TtsRequest,
    responses(
        (status = 200, description = "MP3 audio", content_type = "audio/mpeg"),
        (status = 400, description = "Empty text or speed out of range"),
        (status = 401, description = "Not logged in"),
        (status = 502, description = "TTS provider failed"),
        (status = 503, description = "TTS not configured")
    )
)]
pub async fn synthesize(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    SpeechService::prepare(&request)?;
    let speech = state
        .speech
        .as_ref()
        .ok_or(SpeechError::Disabled("NCP_CLIENT_ID"))?;

    let audio = speech.synthesize(&request).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}
