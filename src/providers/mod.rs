//! Outbound clients for the external services the storybook depends on.
//!
//! Each service sits behind an async trait so the server can be wired with the real
//! reqwest-backed clients in production and in-process fakes in tests.

pub mod clova_studio;
pub mod clova_voice;
pub mod imagen;
pub mod naver;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProviderError, ProviderResult};

pub use clova_studio::ClovaStudioClient;
pub use clova_voice::ClovaVoiceClient;
pub use imagen::ImagenClient;
pub use naver::NaverOAuth;

/// Access token returned by the authorization-code exchange
#[derive(Clone, Debug)]
pub struct OAuthToken {
    pub access_token: String,
}

/// Profile fields consumed from the OAuth provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub id: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub raw: Value,
}

impl OAuthProfile {
    /// Name shown in the UI: real name, then nickname, then the provider id.
    pub fn display_name(&self) -> String {
        [self.name.as_deref(), self.nickname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String;

    async fn exchange_code(&self, code: &str, state: &str) -> ProviderResult<OAuthToken>;

    async fn fetch_profile(&self, token: &OAuthToken) -> ProviderResult<OAuthProfile>;
}

/// Chat-style text generation (system + user message)
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> ProviderResult<String>;
}

#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Produces exactly one square image per call
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub speaker: String,
    pub speed: i32,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>>;
}

pub(crate) fn build_http_client(
    provider: &'static str,
    timeout: Duration,
) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::transport(provider, e))
}

/// Pass 2xx responses through; turn anything else into `ProviderError::Status`
/// carrying the most useful upstream text.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        provider,
        status: status.as_u16(),
        message: upstream_message(&body),
    })
}

pub(crate) async fn response_json(
    provider: &'static str,
    response: reqwest::Response,
) -> ProviderResult<Value> {
    ensure_success(provider, response)
        .await?
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))
}

/// Extract a human-readable message from an error body.
pub(crate) fn upstream_message(body: &str) -> String {
    const MAX_LEN: usize = 500;

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.pointer("/error/errorMessage"),
            value.pointer("/status/message"),
            value.get("error_description"),
            value.get("errorMessage"),
            value.get("message"),
            value.get("error"),
        ];
        if let Some(message) = candidates
            .into_iter()
            .flatten()
            .find_map(Value::as_str)
            .filter(|message| !message.is_empty())
        {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    trimmed.chars().take(MAX_LEN).collect()
}
