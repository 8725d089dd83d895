use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{build_http_client, response_json, ChatCompletion};
use crate::config::LlmConfig;
use crate::errors::{ProviderError, ProviderResult};

const PROVIDER: &str = "clova-studio";

/// Sampling parameters sent with every completion request
#[derive(Clone, Debug)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.8,
            top_k: 0,
            repeat_penalty: 1.1,
        }
    }
}

/// HyperCLOVA X chat-completions client
#[derive(Clone)]
pub struct ClovaStudioClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    params: CompletionParams,
}

impl ClovaStudioClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(PROVIDER, timeout)?,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            params: CompletionParams::default(),
        })
    }

    pub fn request_body(&self, system: &str, user: &str) -> Value {
        json!({
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "maxTokens": self.params.max_tokens,
            "temperature": self.params.temperature,
            "topP": self.params.top_p,
            "topK": self.params.top_k,
            "repeatPenalty": self.params.repeat_penalty,
            "includeAiFilters": true,
        })
    }

    /// Pull the assistant message out of a chat-completions payload.
    pub fn parse_completion(payload: &Value) -> ProviderResult<String> {
        if let Some(code) = payload.pointer("/status/code").and_then(Value::as_str) {
            if code != "20000" {
                let message = payload
                    .pointer("/status/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown status");
                return Err(ProviderError::invalid_response(
                    PROVIDER,
                    format!("status {}: {}", code, message),
                ));
            }
        }

        payload
            .pointer("/result/message/content")
            .or_else(|| payload.pointer("/choices/0/message/content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "completion content missing"))
    }
}

#[async_trait]
impl ChatCompletion for ClovaStudioClient {
    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn complete(&self, system: &str, user: &str) -> ProviderResult<String> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("X-NCP-CLOVASTUDIO-REQUEST-ID", request_id)
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let payload = response_json(PROVIDER, response).await?;
        let content = Self::parse_completion(&payload)?;
        debug!(chars = content.chars().count(), "Received completion");
        Ok(content)
    }
}
