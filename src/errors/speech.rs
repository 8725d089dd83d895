//! Text-to-speech error types

use thiserror::Error;

use super::ProviderError;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Nothing to read aloud
    #[error("Text to synthesise must not be empty")]
    EmptyText,

    /// Speed outside the provider's accepted range
    #[error("Speed {speed} is out of range ({min}..={max})")]
    InvalidSpeed { speed: i32, min: i32, max: i32 },

    /// TTS credentials are not configured
    #[error("Speech synthesis is disabled: {0} is not set")]
    Disabled(&'static str),

    /// Upstream TTS call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl SpeechError {
    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            SpeechError::EmptyText | SpeechError::InvalidSpeed { .. } => 400,
            SpeechError::Disabled(_) => 503,
            SpeechError::Provider(err) => err.http_status_code(),
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            SpeechError::EmptyText => "EMPTY_TEXT",
            SpeechError::InvalidSpeed { .. } => "INVALID_SPEED",
            SpeechError::Disabled(_) => "FEATURE_DISABLED",
            SpeechError::Provider(err) => err.error_code(),
        }
    }
}
