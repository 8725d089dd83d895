//! Shared fixtures for the HTTP integration tests: fake providers and a server
//! backed by a temporary SQLite file and a temporary static directory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::DatabaseConnection;
use serde_json::json;
use storybook::config::AppConfig;
use storybook::database::connection::{establish_connection, get_database_url, setup_database};
use storybook::errors::{ProviderError, ProviderResult};
use storybook::providers::{
    ChatCompletion, GeneratedImage, ImageGenerator, OAuthProfile, OAuthProvider, OAuthToken,
    SpeechRequest, SpeechSynthesizer,
};
use storybook::server::app::{create_app, AppState, Providers};
use storybook::services::RetryPolicy;
use tempfile::TempDir;

pub struct FakeOAuth {
    pub naver_id: String,
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn name(&self) -> &'static str {
        "naver"
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        url::Url::parse_with_params(
            "https://nid.test/oauth2.0/authorize",
            &[("state", state), ("redirect_uri", redirect_uri)],
        )
        .map(|url| url.to_string())
        .unwrap_or_default()
    }

    async fn exchange_code(&self, code: &str, _state: &str) -> ProviderResult<OAuthToken> {
        Ok(OAuthToken {
            access_token: format!("token-{}", code),
        })
    }

    async fn fetch_profile(&self, _token: &OAuthToken) -> ProviderResult<OAuthProfile> {
        Ok(OAuthProfile {
            id: self.naver_id.clone(),
            name: Some("홍길동".to_string()),
            nickname: Some("길동".to_string()),
            raw: json!({"id": self.naver_id, "name": "홍길동"}),
        })
    }
}

/// Returns a tiny PNG; prompts containing a failing marker get HTTP 400
#[derive(Default)]
pub struct FakeImages {
    pub calls: AtomicUsize,
    pub failing_markers: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_markers.lock().unwrap();
        if failing.iter().any(|marker| prompt.contains(marker.as_str())) {
            return Err(ProviderError::Status {
                provider: "imagen",
                status: 400,
                message: "prompt blocked".to_string(),
            });
        }
        Ok(GeneratedImage {
            bytes: vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'],
            mime_type: "image/png".to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeVoice {
    pub calls: AtomicUsize,
    pub last_text: Mutex<Option<String>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeVoice {
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().unwrap() = Some(request.text.clone());
        Ok(b"ID3fake-mp3".to_vec())
    }
}

pub struct FakeChat {
    pub reply: String,
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, _system: &str, _user: &str) -> ProviderResult<String> {
        Ok(self.reply.clone())
    }
}

pub struct AppOptions {
    pub images: bool,
    pub speech: bool,
    pub chat_reply: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            images: true,
            speech: true,
            chat_reply: None,
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: DatabaseConnection,
    pub images: Arc<FakeImages>,
    pub voice: Arc<FakeVoice>,
    pub static_dir: TempDir,
    _db_dir: TempDir,
}

pub fn test_config(static_dir: &std::path::Path) -> Result<AppConfig> {
    let values: HashMap<String, String> = [
        ("SECRET_KEY", "test-secret-key-that-is-long-enough-to-sign-cookies"),
        ("NAVER_CLIENT_ID", "client-id"),
        ("NAVER_CLIENT_SECRET", "client-secret"),
        ("BASE_URL", "http://localhost:8000"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .chain([(
        "STATIC_DIR".to_string(),
        static_dir.to_string_lossy().into_owned(),
    )])
    .collect();
    Ok(AppConfig::from_map(&values)?)
}

pub async fn spawn_app(options: AppOptions) -> Result<TestApp> {
    let db_dir = tempfile::tempdir()?;
    let static_dir = tempfile::tempdir()?;

    let db_path = db_dir.path().join("storybook.db");
    let db = establish_connection(&get_database_url(db_path.to_str())).await?;
    setup_database(&db).await?;

    let images = Arc::new(FakeImages::default());
    let voice = Arc::new(FakeVoice::default());
    let providers = Providers {
        oauth: Arc::new(FakeOAuth {
            naver_id: "naver-1234".to_string(),
        }),
        llm: options
            .chat_reply
            .map(|reply| Arc::new(FakeChat { reply }) as Arc<dyn ChatCompletion>),
        images: options
            .images
            .then(|| images.clone() as Arc<dyn ImageGenerator>),
        speech: options
            .speech
            .then(|| voice.clone() as Arc<dyn SpeechSynthesizer>),
    };

    let config = test_config(static_dir.path())?;
    let state = AppState::new(db.clone(), config, providers)?.with_image_pacing(
        RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::ZERO,
        },
        Duration::ZERO,
    );

    let app = create_app(state, None).await?;
    let mut server = TestServer::new(app)?;
    server.do_save_cookies();

    Ok(TestApp {
        server,
        db,
        images,
        voice,
        static_dir,
        _db_dir: db_dir,
    })
}

impl TestApp {
    /// Run the login flow against the fake provider; the session cookie is kept.
    pub async fn login(&self) -> Result<()> {
        let response = self.server.get("/login/naver").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let location = response.header("location");
        let authorize = url::Url::parse(location.to_str()?)?;
        let state = authorize
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| anyhow::anyhow!("state missing from authorize url"))?;

        let response = self
            .server
            .get("/auth/naver/callback")
            .add_query_param("code", "test-code")
            .add_query_param("state", &state)
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        Ok(())
    }
}
