use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{build_http_client, response_json, OAuthProfile, OAuthProvider, OAuthToken};
use crate::config::NaverCredentials;
use crate::errors::{ProviderError, ProviderResult};

const PROVIDER: &str = "naver";
const AUTHORIZE_URL: &str = "https://nid.naver.com/oauth2.0/authorize";
const TOKEN_URL: &str = "https://nid.naver.com/oauth2.0/token";
const PROFILE_URL: &str = "https://openapi.naver.com/v1/nid/me";

/// Naver Login (authorization-code flow)
#[derive(Clone)]
pub struct NaverOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl NaverOAuth {
    pub fn new(credentials: &NaverCredentials, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(PROVIDER, timeout)?,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
        })
    }

    /// Naver answers token errors with HTTP 200 and an `error` field.
    pub fn parse_token_response(payload: &Value) -> ProviderResult<OAuthToken> {
        if let Some(access_token) = payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
        {
            return Ok(OAuthToken {
                access_token: access_token.to_string(),
            });
        }

        let reason = payload
            .get("error_description")
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("access_token missing");
        Err(ProviderError::invalid_response(PROVIDER, reason))
    }

    pub fn parse_profile_response(payload: &Value) -> ProviderResult<OAuthProfile> {
        let response = payload
            .get("response")
            .filter(|response| response.is_object())
            .ok_or_else(|| {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("profile response missing");
                ProviderError::invalid_response(PROVIDER, message)
            })?;

        let id = response
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "profile id missing"))?;

        let text = |key: &str| response.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(OAuthProfile {
            id: id.to_string(),
            name: text("name"),
            nickname: text("nickname"),
            raw: response.clone(),
        })
    }
}

#[async_trait]
impl OAuthProvider for NaverOAuth {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        let params = [
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("state", state),
        ];
        match url::Url::parse_with_params(AUTHORIZE_URL, &params) {
            Ok(url) => url.to_string(),
            Err(_) => AUTHORIZE_URL.to_string(),
        }
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn exchange_code(&self, code: &str, state: &str) -> ProviderResult<OAuthToken> {
        let response = self
            .http
            .post(TOKEN_URL)
            .query(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("state", state),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let payload = response_json(PROVIDER, response).await?;
        Self::parse_token_response(&payload)
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn fetch_profile(&self, token: &OAuthToken) -> ProviderResult<OAuthProfile> {
        let response = self
            .http
            .get(PROFILE_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let payload = response_json(PROVIDER, response).await?;
        let profile = Self::parse_profile_response(&payload)?;
        debug!(naver_id = %profile.id, "Fetched Naver profile");
        Ok(profile)
    }
}
