use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::errors::{SpeechError, SpeechResult};
use crate::providers::{SpeechRequest, SpeechSynthesizer};

/// Longest text forwarded to the TTS provider, in characters
pub const MAX_TTS_CHARS: usize = 3000;
pub const DEFAULT_SPEAKER: &str = "nara";
pub const MIN_SPEED: i32 = -5;
pub const MAX_SPEED: i32 = 5;

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TtsRequest {
    pub text: String,
    pub speaker: Option<String>,
    pub speed: Option<i32>,
}

/// Cut `text` to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[derive(Clone)]
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Validate and normalise a request without calling the provider.
    pub fn prepare(request: &TtsRequest) -> SpeechResult<SpeechRequest> {
        if request.text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let speed = request.speed.unwrap_or(0);
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(SpeechError::InvalidSpeed {
                speed,
                min: MIN_SPEED,
                max: MAX_SPEED,
            });
        }

        let speaker = request
            .speaker
            .as_deref()
            .map(str::trim)
            .filter(|speaker| !speaker.is_empty())
            .unwrap_or(DEFAULT_SPEAKER)
            .to_string();

        Ok(SpeechRequest {
            text: truncate_chars(&request.text, MAX_TTS_CHARS).to_string(),
            speaker,
            speed,
        })
    }

    #[instrument(skip_all)]
    pub async fn synthesize(&self, request: &TtsRequest) -> SpeechResult<Vec<u8>> {
        let prepared = Self::prepare(request)?;
        if prepared.text.len() < request.text.len() {
            debug!(limit = MAX_TTS_CHARS, "Truncated TTS text");
        }
        Ok(self.synthesizer.synthesize(&prepared).await?)
    }
}
