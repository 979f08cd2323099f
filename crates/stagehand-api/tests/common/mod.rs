//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use stagehand_api::state::AppState;
use stagehand_playback::application::engine::PlaybackEngine;
use stagehand_playback::application::runtime::EngineHandle;
use stagehand_playback::domain::config::PlaybackConfig;
use stagehand_test_support::{FixedClock, StaticRoster};
use tower::ServiceExt;

/// Build the full app router over a fresh engine with animations disabled.
/// Returns the engine handle too, so tests can wait for queued signals.
pub fn build_test_app() -> (Router, EngineHandle) {
    let roster = StaticRoster::new()
        .with("kai", "Kai", "kai.png")
        .with("mira", "Mira", "mira.png");
    let engine = PlaybackEngine::new(
        PlaybackConfig::instant(),
        Arc::new(roster),
        Arc::new(FixedClock::standard()),
    );
    let (state, _task) = AppState::spawn(engine);
    let handle = state.engine.clone();
    (stagehand_api::app(state), handle)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Empty bodies come back as `Value::Null`.
async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}
