use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::{
    extract::FromRef,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;

use super::handlers::{auth, health, llm, pages, profile, story, tts};
use super::openapi::ApiDoc;
use crate::config::AppConfig;
use crate::errors::ProviderResult;
use crate::providers::{
    ChatCompletion, ClovaStudioClient, ClovaVoiceClient, ImageGenerator, ImagenClient, NaverOAuth,
    OAuthProvider, SpeechSynthesizer,
};
use crate::services::{
    AuthService, ImageOrchestrator, RetryPolicy, SpeechService, StoryService, StoryTextGenerator,
    UserService,
};
use crate::views::Views;

/// Outbound clients the server is wired with; tests pass fakes here
#[derive(Clone)]
pub struct Providers {
    pub oauth: Arc<dyn OAuthProvider>,
    pub llm: Option<Arc<dyn ChatCompletion>>,
    pub images: Option<Arc<dyn ImageGenerator>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Providers {
    /// Build the real HTTP clients for every configured provider.
    pub fn from_config(config: &AppConfig) -> ProviderResult<Self> {
        let oauth: Arc<dyn OAuthProvider> =
            Arc::new(NaverOAuth::new(&config.naver, config.oauth_timeout)?);

        let llm = match &config.llm {
            Some(llm) => Some(Arc::new(ClovaStudioClient::new(llm, config.llm_timeout)?)
                as Arc<dyn ChatCompletion>),
            None => {
                warn!("CLOVA_STUDIO_API_KEY not set; story text will use the built-in template");
                None
            }
        };

        let images = match &config.image {
            Some(image) => Some(Arc::new(ImagenClient::new(image, config.image_timeout)?)
                as Arc<dyn ImageGenerator>),
            None => {
                warn!("GEMINI_API_KEY not set; story illustration is disabled");
                None
            }
        };

        let speech = match &config.speech {
            Some(speech) => Some(Arc::new(ClovaVoiceClient::new(speech, config.speech_timeout)?)
                as Arc<dyn SpeechSynthesizer>),
            None => {
                warn!("NCP_CLIENT_ID/NCP_CLIENT_SECRET not set; text-to-speech is disabled");
                None
            }
        };

        Ok(Self {
            oauth,
            llm,
            images,
            speech,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub cookie_key: Key,
    pub views: Arc<Views>,
    pub auth: AuthService,
    pub users: UserService,
    pub stories: StoryService,
    pub text: StoryTextGenerator,
    pub images: Option<ImageOrchestrator>,
    pub speech: Option<SpeechService>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig, providers: Providers) -> Result<Self> {
        let views = Views::load().map_err(|e| anyhow!("Failed to compile templates: {}", e))?;
        let cookie_key = Key::derive_from(config.secret_key.as_bytes());
        let redirect_uri = config.callback_url(providers.oauth.name());

        let images = providers
            .images
            .map(|generator| ImageOrchestrator::new(db.clone(), generator, config.stories_dir()));

        Ok(Self {
            auth: AuthService::new(db.clone(), providers.oauth, redirect_uri),
            users: UserService::new(db.clone()),
            stories: StoryService::new(db.clone()),
            text: StoryTextGenerator::new(providers.llm),
            images,
            speech: providers.speech.map(SpeechService::new),
            db,
            config: Arc::new(config),
            cookie_key,
            views: Arc::new(views),
        })
    }

    /// Override retry backoff and the pause between scenes.
    pub fn with_image_pacing(mut self, retry: RetryPolicy, scene_pause: Duration) -> Self {
        self.images = self.images.map(|orchestrator| {
            orchestrator
                .with_retry_policy(retry)
                .with_scene_pause(scene_pause)
        });
        self
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.base_url.starts_with("https://")
    }
}

pub async fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .map_err(|e| anyhow!("Invalid CORS origin: {}", e))?,
            )
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any)
            .allow_credentials(false),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any)
            .allow_credentials(false),
    };

    let static_files = ServeDir::new(&state.config.static_dir);

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Pages
        .route("/", get(pages::home))
        .route("/make/storybook", get(pages::make_storybook))
        .route("/profile", get(profile::profile_page))
        .route("/story", get(story::stories_page))
        // Login flow
        .route("/login/:provider", get(auth::login))
        .route("/auth/:provider/callback", get(auth::callback))
        .route("/logout", get(auth::logout))
        // JSON API
        .route("/profile/update", post(profile::update_profile))
        .route("/story/make", post(story::make_story))
        .route("/story/:id", get(story::get_story))
        .route("/story/:id/images", post(story::resume_images))
        .route("/clova/make", post(llm::make_draft))
        .route("/tts", post(tts::synthesize))
        .nest_service("/static", static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}
