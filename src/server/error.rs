use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::{AuthError, SpeechError, StoryError};

/// JSON error body returned by every API route: `{"error": <code>, "message": <text>}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, "{}", self.message);
        }
        let body = json!({
            "error": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<StoryError> for ApiError {
    fn from(err: StoryError) -> Self {
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<SpeechError> for ApiError {
    fn from(err: SpeechError) -> Self {
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<handlebars::RenderError> for ApiError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::internal(format!("Failed to render page: {}", err))
    }
}
