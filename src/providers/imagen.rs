use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{build_http_client, response_json, GeneratedImage, ImageGenerator};
use crate::config::ImageConfig;
use crate::database::entities::story_images::DEFAULT_MIME_TYPE;
use crate::errors::{ProviderError, ProviderResult};

const PROVIDER: &str = "imagen";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Imagen through the Gemini API `:predict` endpoint
#[derive(Clone)]
pub struct ImagenClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl ImagenClient {
    pub fn new(config: &ImageConfig, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(PROVIDER, timeout)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: API_BASE.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:predict", self.api_base, self.model)
    }

    pub fn request_body(prompt: &str) -> Value {
        json!({
            "instances": [{"prompt": prompt}],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "1:1",
                "outputOptions": {"mimeType": DEFAULT_MIME_TYPE},
            },
        })
    }

    /// Decode the first prediction. Safety-filtered prompts come back with no predictions.
    pub fn parse_prediction(payload: &Value) -> ProviderResult<GeneratedImage> {
        let prediction = payload
            .get("predictions")
            .and_then(Value::as_array)
            .and_then(|predictions| {
                predictions
                    .iter()
                    .find(|p| p.get("bytesBase64Encoded").is_some())
            })
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no image returned"))?;

        let encoded = prediction
            .get("bytesBase64Encoded")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::invalid_response(PROVIDER, format!("base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty image"));
        }

        let mime_type = prediction
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        Ok(GeneratedImage { bytes, mime_type })
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    #[instrument(skip_all, fields(provider = PROVIDER, model = %self.model))]
    async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let payload = response_json(PROVIDER, response).await?;
        let image = Self::parse_prediction(&payload)?;
        debug!(bytes = image.bytes.len(), mime_type = %image.mime_type, "Received image");
        Ok(image)
    }
}
