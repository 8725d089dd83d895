use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{build_http_client, ensure_success, SpeechRequest, SpeechSynthesizer};
use crate::config::SpeechConfig;
use crate::errors::{ProviderError, ProviderResult};

const PROVIDER: &str = "clova-voice";

/// CLOVA Voice (premium TTS) client
#[derive(Clone)]
pub struct ClovaVoiceClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    endpoint: String,
}

impl ClovaVoiceClient {
    pub fn new(config: &SpeechConfig, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(PROVIDER, timeout)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn form_fields(request: &SpeechRequest) -> Vec<(&'static str, String)> {
        vec![
            ("speaker", request.speaker.clone()),
            ("volume", "0".to_string()),
            ("speed", request.speed.to_string()),
            ("pitch", "0".to_string()),
            ("format", "mp3".to_string()),
            ("text", request.text.clone()),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for ClovaVoiceClient {
    #[instrument(skip_all, fields(provider = PROVIDER, speaker = %request.speaker))]
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-NCP-APIGW-API-KEY-ID", &self.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.client_secret)
            .form(&Self::form_fields(request))
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let audio = ensure_success(PROVIDER, response)
            .await?
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        debug!(bytes = audio.len(), "Received audio");
        Ok(audio.to_vec())
    }
}
