//! Conversation loading.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use stagehand_core::message::Message;
use stagehand_playback::application::runtime::Request;
use stagehand_playback::domain::view::SceneView;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /history.
#[derive(Debug, Deserialize)]
pub struct LoadHistoryRequest {
    /// The whole conversation, oldest first.
    pub messages: Vec<Message>,
}

/// POST /history
///
/// Replaces the conversation, recompiles it and jumps to its last command.
#[instrument(skip(state, request), fields(messages = request.messages.len()))]
async fn load_history(
    State(state): State<AppState>,
    Json(request): Json<LoadHistoryRequest>,
) -> Result<Json<SceneView>, ApiError> {
    info!("handling load_history request");

    let view = state
        .engine
        .request(Request::LoadMessages(request.messages))
        .await?;

    Ok(Json(view))
}

/// Returns the history router.
pub fn router() -> Router<AppState> {
    Router::new().route("/history", post(load_history))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use serde_json::Value;
    use stagehand_playback::application::engine::PlaybackEngine;
    use stagehand_playback::domain::config::PlaybackConfig;
    use stagehand_test_support::{FixedClock, StaticRoster, assistant, user};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    fn test_app_state() -> AppState {
        let (state, _task) = AppState::spawn(PlaybackEngine::new(
            PlaybackConfig::instant(),
            Arc::new(StaticRoster::new()),
            Arc::new(FixedClock::standard()),
        ));
        state
    }

    fn post_history(body: &Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/history")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_history_returns_200_with_view_at_last_command() {
        // Arrange
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({
            "messages": [
                user("Where are we?"),
                assistant(r#"<background src="forest.png"/><narrate>A forest.</narrate>"#),
            ]
        });

        // Act
        let response = app.oneshot(post_history(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["length"], 2);
        assert_eq!(json["cursor"], 1);
        assert_eq!(json["background"], "forest.png");
    }

    #[tokio::test]
    async fn test_load_history_drops_open_streams() {
        // Arrange
        let state = test_app_state();
        let opened = state
            .engine
            .request(Request::OpenStream(Uuid::new_v4()))
            .await
            .unwrap();
        let app = router().with_state(state);
        let body = serde_json::json!({ "messages": [] });

        // Act
        let response = app.oneshot(post_history(&body)).await.unwrap();

        // Assert
        assert!(opened.streaming);
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["streaming"], false);
        assert_eq!(json["length"], 0);
    }

    #[tokio::test]
    async fn test_load_history_returns_422_for_missing_messages() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let response = app
            .oneshot(post_history(&serde_json::json!({})))
            .await
            .unwrap();

        // Assert: Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
