use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::errors::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_IMAGEN_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_CLOVA_STUDIO_URL: &str =
    "https://clovastudio.stream.ntruss.com/testapp/v1/chat-completions/HCX-003";
pub const DEFAULT_CLOVA_VOICE_URL: &str =
    "https://naveropenapi.apigw.ntruss.com/tts-premium/v1/tts";

/// Minimum secret length accepted for deriving the cookie signing key.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct NaverCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct ImageConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
}

/// Application configuration loaded from environment variables.
///
/// The OAuth credentials and session secret are required; provider keys are optional
/// and their absence disables (or, for the LLM, degrades) the dependent feature.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base_url: String,
    pub secret_key: String,
    pub naver: NaverCredentials,
    pub static_dir: PathBuf,
    pub image: Option<ImageConfig>,
    pub llm: Option<LlmConfig>,
    pub speech: Option<SpeechConfig>,
    pub oauth_timeout: Duration,
    pub llm_timeout: Duration,
    pub image_timeout: Duration,
    pub speech_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env is optional; real environment variables win.
        let _ = dotenvy::dotenv();

        let values: HashMap<String, String> = Self::tracked_keys()
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        fn get<'a>(values: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
            values
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        }

        fn required(values: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
            get(values, key)
                .map(str::to_string)
                .ok_or(ConfigError::Missing(key))
        }

        fn seconds(
            values: &HashMap<String, String>,
            key: &'static str,
            default: u64,
        ) -> Result<Duration, ConfigError> {
            match get(values, key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| ConfigError::Invalid {
                        key,
                        reason: e.to_string(),
                    }),
            }
        }

        let secret_key = required(values, "SECRET_KEY")?;
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
            });
        }

        let naver = NaverCredentials {
            client_id: required(values, "NAVER_CLIENT_ID")?,
            client_secret: required(values, "NAVER_CLIENT_SECRET")?,
        };

        let base_url = get(values, "BASE_URL")
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            key: "BASE_URL",
            reason: e.to_string(),
        })?;

        let image = get(values, "GEMINI_API_KEY").map(|api_key| ImageConfig {
            api_key: api_key.to_string(),
            model: get(values, "IMAGEN_MODEL")
                .unwrap_or(DEFAULT_IMAGEN_MODEL)
                .to_string(),
        });

        let llm = get(values, "CLOVA_STUDIO_API_KEY").map(|api_key| LlmConfig {
            api_key: api_key.to_string(),
            endpoint: get(values, "CLOVA_STUDIO_URL")
                .unwrap_or(DEFAULT_CLOVA_STUDIO_URL)
                .to_string(),
        });

        let speech = match (get(values, "NCP_CLIENT_ID"), get(values, "NCP_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(SpeechConfig {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                endpoint: get(values, "CLOVA_VOICE_URL")
                    .unwrap_or(DEFAULT_CLOVA_VOICE_URL)
                    .to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            base_url,
            secret_key,
            naver,
            static_dir: PathBuf::from(get(values, "STATIC_DIR").unwrap_or("static")),
            image,
            llm,
            speech,
            oauth_timeout: seconds(values, "OAUTH_TIMEOUT_SECS", 10)?,
            llm_timeout: seconds(values, "LLM_TIMEOUT_SECS", 30)?,
            image_timeout: seconds(values, "IMAGE_TIMEOUT_SECS", 30)?,
            speech_timeout: seconds(values, "TTS_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn tracked_keys() -> &'static [&'static str] {
        &[
            "BASE_URL",
            "SECRET_KEY",
            "NAVER_CLIENT_ID",
            "NAVER_CLIENT_SECRET",
            "STATIC_DIR",
            "GEMINI_API_KEY",
            "IMAGEN_MODEL",
            "CLOVA_STUDIO_API_KEY",
            "CLOVA_STUDIO_URL",
            "NCP_CLIENT_ID",
            "NCP_CLIENT_SECRET",
            "CLOVA_VOICE_URL",
            "OAUTH_TIMEOUT_SECS",
            "LLM_TIMEOUT_SECS",
            "IMAGE_TIMEOUT_SECS",
            "TTS_TIMEOUT_SECS",
        ]
    }

    /// Callback URI registered with the OAuth provider.
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/auth/{}/callback", self.base_url, provider)
    }

    /// Root directory for generated story assets.
    pub fn stories_dir(&self) -> PathBuf {
        self.static_dir.join("stories")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_values() -> HashMap<String, String> {
        let mut values = HashMap::new();
        values.insert(
            "SECRET_KEY".to_string(),
            "a-session-secret-that-is-long-enough-for-signing".to_string(),
        );
        values.insert("NAVER_CLIENT_ID".to_string(), "client".to_string());
        values.insert("NAVER_CLIENT_SECRET".to_string(), "secret".to_string());
        values
    }

    #[test]
    fn test_defaults_without_provider_keys() {
        let config = AppConfig::from_map(&base_values()).expect("config");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.image.is_none());
        assert!(config.llm.is_none());
        assert!(config.speech.is_none());
        assert_eq!(config.oauth_timeout, Duration::from_secs(10));
        assert_eq!(
            config.callback_url("naver"),
            "http://localhost:8000/auth/naver/callback"
        );
        assert_eq!(config.stories_dir(), PathBuf::from("static").join("stories"));
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let mut values = base_values();
        values.remove("SECRET_KEY");
        let err = AppConfig::from_map(&values).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SECRET_KEY")));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let mut values = base_values();
        values.insert("SECRET_KEY".to_string(), "short".to_string());
        let err = AppConfig::from_map(&values).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SECRET_KEY", .. }));
    }

    #[test]
    fn test_provider_keys_enable_features() {
        let mut values = base_values();
        values.insert("GEMINI_API_KEY".to_string(), "g".to_string());
        values.insert("CLOVA_STUDIO_API_KEY".to_string(), "c".to_string());
        values.insert("NCP_CLIENT_ID".to_string(), "id".to_string());
        values.insert("NCP_CLIENT_SECRET".to_string(), "s".to_string());
        values.insert("BASE_URL".to_string(), "https://story.example.com/".to_string());

        let config = AppConfig::from_map(&values).expect("config");
        assert_eq!(config.image.map(|i| i.model), Some(DEFAULT_IMAGEN_MODEL.to_string()));
        assert!(config.llm.is_some());
        assert!(config.speech.is_some());
        assert_eq!(config.base_url, "https://story.example.com");
    }

    #[test]
    fn test_half_configured_tts_stays_disabled() {
        let mut values = base_values();
        values.insert("NCP_CLIENT_ID".to_string(), "id".to_string());
        let config = AppConfig::from_map(&values).expect("config");
        assert!(config.speech.is_none());
    }

    #[test]
    fn test_invalid_timeout() {
        let mut values = base_values();
        values.insert("LLM_TIMEOUT_SECS".to_string(), "soon".to_string());
        let err = AppConfig::from_map(&values).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LLM_TIMEOUT_SECS", .. }));
    }
}
