pub mod app;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod session;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use app::Providers;
use crate::services::SessionStore;
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(
    port: u16,
    database_path: &str,
    cors_origin: Option<&str>,
    config: AppConfig,
) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let purged = SessionStore::new(db.clone()).purge_expired().await?;
    if purged > 0 {
        info!("Removed {} expired sessions", purged);
    }

    tokio::fs::create_dir_all(config.stories_dir()).await?;
    let providers = Providers::from_config(&config)?;
    let state = app::AppState::new(db, config, providers)?;
    log_routes(&state);

    let app = app::create_app(state, cors_origin).await?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes(state: &app::AppState) {
    let enabled = |on: bool| if on { "enabled" } else { "disabled" };

    info!("Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api-docs/openapi.json      - OpenAPI document");
    info!("  /login/naver                - Start Naver login");
    info!("  /story/make                 - Create and illustrate a story ({})", enabled(state.images.is_some()));
    info!("  /clova/make                 - Draft a story ({})", if state.text.is_configured() { "LLM" } else { "template" });
    info!("  /tts                        - Text to speech ({})", enabled(state.speech.is_some()));
    info!("  /static/stories/*           - Generated images");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
