//! Playback control.
//!
//! Signals steer whatever is running and answer at once. Navigation waits
//! for the engine and answers with the resulting frame; it is refused with
//! 409 while another operation is running or a message is streaming.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use stagehand_playback::application::runtime::Request;
use stagehand_playback::domain::signal::Signal;
use stagehand_playback::domain::view::SceneView;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /choice.
#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    /// Text of the selected choice.
    pub text: String,
}

/// Request body for POST /jump and /retreat-to. A null index is the empty
/// stage before the first command.
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    /// Target command index.
    pub index: Option<usize>,
}

/// Request body for POST /advance-to.
#[derive(Debug, Deserialize)]
pub struct AdvanceToRequest {
    /// Target command index.
    pub index: usize,
}

fn accept(state: &AppState, signal: Signal) -> Result<StatusCode, ApiError> {
    state.engine.signal(signal)?;
    Ok(StatusCode::ACCEPTED)
}

async fn navigate(state: &AppState, request: Request) -> Result<Json<SceneView>, ApiError> {
    info!(kind = request.kind(), "handling navigation request");
    Ok(Json(state.engine.request(request).await?))
}

/// POST /advance
async fn advance(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    accept(&state, Signal::Advance)
}

/// POST /skip
async fn skip(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    accept(&state, Signal::Skip)
}

/// POST /cancel
async fn cancel(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    accept(&state, Signal::Cancel)
}

/// POST /choice
#[instrument(skip(state, request))]
async fn choice(
    State(state): State<AppState>,
    Json(request): Json<ChoiceRequest>,
) -> Result<StatusCode, ApiError> {
    info!("handling choice signal");
    accept(&state, Signal::Choice(request.text))
}

/// POST /next
async fn next(State(state): State<AppState>) -> Result<Json<SceneView>, ApiError> {
    navigate(&state, Request::Next).await
}

/// POST /previous
async fn previous(State(state): State<AppState>) -> Result<Json<SceneView>, ApiError> {
    navigate(&state, Request::Previous).await
}

/// POST /jump
#[instrument(skip(state, request), fields(index = ?request.index))]
async fn jump(
    State(state): State<AppState>,
    Json(request): Json<PositionRequest>,
) -> Result<Json<SceneView>, ApiError> {
    navigate(&state, Request::JumpTo(request.index)).await
}

/// POST /advance-to
///
/// Wait points before the target hold until `/advance` or `/choice`
/// resolves them, so this can take as long as the user does.
#[instrument(skip(state, request), fields(index = request.index))]
async fn advance_to(
    State(state): State<AppState>,
    Json(request): Json<AdvanceToRequest>,
) -> Result<Json<SceneView>, ApiError> {
    navigate(&state, Request::AdvanceTo(request.index)).await
}

/// POST /retreat-to
#[instrument(skip(state, request), fields(index = ?request.index))]
async fn retreat_to(
    State(state): State<AppState>,
    Json(request): Json<PositionRequest>,
) -> Result<Json<SceneView>, ApiError> {
    navigate(&state, Request::RetreatTo(request.index)).await
}

/// Returns the playback router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advance", post(advance))
        .route("/skip", post(skip))
        .route("/cancel", post(cancel))
        .route("/choice", post(choice))
        .route("/next", post(next))
        .route("/previous", post(previous))
        .route("/jump", post(jump))
        .route("/advance-to", post(advance_to))
        .route("/retreat-to", post(retreat_to))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde_json::Value;
    use stagehand_playback::application::engine::PlaybackEngine;
    use stagehand_playback::domain::config::PlaybackConfig;
    use stagehand_test_support::{FixedClock, StaticRoster, assistant};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    const THREE_LINES: &str =
        "<narrate>One.</narrate><narrate>Two.</narrate><narrate>Three.</narrate>";

    async fn loaded_state(markup: &str) -> AppState {
        let (state, _task) = AppState::spawn(PlaybackEngine::new(
            PlaybackConfig::instant(),
            Arc::new(StaticRoster::new()),
            Arc::new(FixedClock::standard()),
        ));
        state
            .engine
            .request(Request::LoadMessages(vec![assistant(markup)]))
            .await
            .unwrap();
        state
    }

    async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Option<Value>) {
        let request = HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).ok())
    }

    async fn post_empty(app: Router, uri: &str) -> (StatusCode, Option<Value>) {
        let request = HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).ok())
    }

    #[tokio::test]
    async fn test_jump_returns_view_at_index() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);

        // Act
        let (status, json) =
            post_json(app, "/jump", &serde_json::json!({ "index": 1 })).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let json = json.unwrap();
        assert_eq!(json["cursor"], 1);
        assert_eq!(json["text"]["content"][0]["value"], "Two.");
    }

    #[tokio::test]
    async fn test_jump_to_null_clears_stage() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);

        // Act
        let (status, json) =
            post_json(app, "/jump", &serde_json::json!({ "index": null })).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let json = json.unwrap();
        assert!(json["cursor"].is_null());
        assert!(json["text"].is_null());
    }

    #[tokio::test]
    async fn test_next_and_previous_move_between_wait_points() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);
        post_json(app.clone(), "/jump", &serde_json::json!({ "index": null })).await;

        // Act
        let (_, first) = post_empty(app.clone(), "/next").await;
        let (_, second) = post_empty(app.clone(), "/next").await;
        let (status, back) = post_empty(app, "/previous").await;

        // Assert
        assert_eq!(first.unwrap()["cursor"], 0);
        assert_eq!(second.unwrap()["cursor"], 1);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(back.unwrap()["cursor"], 0);
    }

    #[tokio::test]
    async fn test_retreat_to_restores_earlier_text() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);

        // Act
        let (status, json) =
            post_json(app, "/retreat-to", &serde_json::json!({ "index": 0 })).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.unwrap()["text"]["content"][0]["value"], "One.");
    }

    #[tokio::test]
    async fn test_navigation_returns_409_while_streaming() {
        // Arrange
        let state = loaded_state(THREE_LINES).await;
        state
            .engine
            .request(Request::OpenStream(Uuid::new_v4()))
            .await
            .unwrap();
        let app = router().with_state(state);

        // Act
        let (status, json) =
            post_json(app, "/jump", &serde_json::json!({ "index": 0 })).await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json.unwrap()["error"], "navigation_locked");
    }

    #[tokio::test]
    async fn test_navigation_returns_409_while_playback_runs() {
        // Arrange
        let state = loaded_state(THREE_LINES).await;
        state.engine.request(Request::JumpTo(None)).await.unwrap();
        state.engine.post(Request::AdvanceTo(2)).unwrap();
        let app = router().with_state(state.clone());

        // Act
        let (status, json) = post_empty(app, "/previous").await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json.unwrap()["error"], "busy");
        state.engine.cancel().unwrap();
    }

    #[tokio::test]
    async fn test_signals_return_202() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);

        // Act
        let (advance, _) = post_empty(app.clone(), "/advance").await;
        let (skip, _) = post_empty(app.clone(), "/skip").await;
        let (cancel, _) = post_empty(app.clone(), "/cancel").await;
        let (choice, _) =
            post_json(app, "/choice", &serde_json::json!({ "text": "North" })).await;

        // Assert
        assert_eq!(advance, StatusCode::ACCEPTED);
        assert_eq!(skip, StatusCode::ACCEPTED);
        assert_eq!(cancel, StatusCode::ACCEPTED);
        assert_eq!(choice, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_choice_returns_422_without_text() {
        // Arrange
        let app = router().with_state(loaded_state(THREE_LINES).await);

        // Act
        let (status, _) = post_json(app, "/choice", &serde_json::json!({})).await;

        // Assert
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
