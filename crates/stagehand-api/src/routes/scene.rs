//! Read side: the latest frame, the plain-message log and the outbox.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use stagehand_core::message::Message;
use stagehand_playback::domain::view::SceneView;
use stagehand_stage::application::compiler::PlainMessage;

use crate::state::AppState;

/// GET /scene
///
/// The most recently rendered frame. Never waits for playback.
async fn current_scene(State(state): State<AppState>) -> Json<SceneView> {
    Json(state.view.scene.borrow().clone())
}

/// GET /plain-messages
async fn plain_messages(State(state): State<AppState>) -> Json<Vec<PlainMessage>> {
    Json(state.view.plain.borrow().clone())
}

/// GET /outbox
///
/// Drains the user messages emitted by choices since the last call.
async fn drain_outbox(State(state): State<AppState>) -> Json<Vec<Message>> {
    let mut outbox = state.outbox.lock().await;
    let mut messages = Vec::new();
    while let Ok(message) = outbox.try_recv() {
        messages.push(message);
    }
    Json(messages)
}

/// Returns the scene read router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scene", get(current_scene))
        .route("/plain-messages", get(plain_messages))
        .route("/outbox", get(drain_outbox))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use stagehand_playback::application::engine::PlaybackEngine;
    use stagehand_playback::application::runtime::Request as EngineRequest;
    use stagehand_playback::domain::config::PlaybackConfig;
    use stagehand_test_support::{FixedClock, StaticRoster, assistant};
    use tower::ServiceExt;

    use super::*;

    fn test_app_state() -> AppState {
        let (state, _task) = AppState::spawn(PlaybackEngine::new(
            PlaybackConfig::instant(),
            Arc::new(StaticRoster::new().with("kai", "Kai", "kai.png")),
            Arc::new(FixedClock::standard()),
        ));
        state
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_scene_starts_empty() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let (status, json) = get_json(app, "/scene").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["length"], 0);
        assert!(json["cursor"].is_null());
        assert!(json["characters"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scene_reflects_loaded_messages() {
        // Arrange
        let state = test_app_state();
        state
            .engine
            .request(EngineRequest::LoadMessages(vec![assistant(
                r#"<enter id="kai" position="left"/><dialogue from="kai">Hi.</dialogue>"#,
            )]))
            .await
            .unwrap();
        let app = router().with_state(state);

        // Act
        let (status, json) = get_json(app, "/scene").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cursor"], 1);
        assert_eq!(json["characters"][0]["name"], "Kai");
        assert_eq!(json["text"]["speaker"]["name"], "Kai");
        assert_eq!(json["text"]["complete"], true);
    }

    #[tokio::test]
    async fn test_plain_messages_lists_degraded_output() {
        // Arrange
        let state = test_app_state();
        state
            .engine
            .request(EngineRequest::LoadMessages(vec![assistant(
                "Sorry, I lost the thread.",
            )]))
            .await
            .unwrap();
        let app = router().with_state(state);

        // Act
        let (status, json) = get_json(app, "/plain-messages").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let messages = json.as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["escaped_text"], "Sorry, I lost the thread.");
    }

    #[tokio::test]
    async fn test_outbox_is_empty_without_choices() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let (status, json) = get_json(app, "/outbox").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());
    }
}
