//! Stagehand API server entry point.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use stagehand_api::error::AppError;
use stagehand_api::roster::ProfileRoster;
use stagehand_api::state::AppState;
use stagehand_core::clock::SystemClock;
use stagehand_playback::application::engine::PlaybackEngine;
use stagehand_playback::domain::config::PlaybackConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Stagehand API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
    let config = PlaybackConfig::from_env()?;
    let roster = match std::env::var("STAGEHAND_ROSTER") {
        Ok(path) => ProfileRoster::load(Path::new(&path))?,
        Err(_) => ProfileRoster::default(),
    };
    tracing::info!(characters = roster.len(), ?config, "configuration loaded");

    // Start the engine task.
    let engine = PlaybackEngine::new(config, Arc::new(roster), Arc::new(SystemClock));
    let (app_state, _engine_task) = AppState::spawn(engine);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = stagehand_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
