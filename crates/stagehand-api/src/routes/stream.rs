//! Token streaming for assistant messages that are still being generated.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use stagehand_playback::application::runtime::Request;
use stagehand_playback::domain::view::SceneView;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /open, /complete and /abort.
#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    /// The streaming message.
    pub message_id: Uuid,
}

/// Request body for POST /token.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// The streaming message.
    pub message_id: Uuid,
    /// Next chunk of generated text.
    pub token: String,
}

/// POST /open
#[instrument(skip(state, request), fields(message_id = %request.message_id))]
async fn open_stream(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Result<StatusCode, ApiError> {
    info!("handling open_stream request");
    state.engine.post(Request::OpenStream(request.message_id))?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /token
async fn push_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<StatusCode, ApiError> {
    debug!(message_id = %request.message_id, bytes = request.token.len(), "token received");
    state.engine.push_token(request.message_id, request.token)?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /complete
///
/// Answers once the message's commands have played.
#[instrument(skip(state, request), fields(message_id = %request.message_id))]
async fn complete_stream(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Result<Json<SceneView>, ApiError> {
    info!("handling complete_stream request");
    let view = state
        .engine
        .request(Request::CompleteStream(request.message_id))
        .await?;
    Ok(Json(view))
}

/// POST /abort
///
/// Stages whatever arrived before the stream was stopped, followed by a
/// stopped marker.
#[instrument(skip(state, request), fields(message_id = %request.message_id))]
async fn abort_stream(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Result<Json<SceneView>, ApiError> {
    info!("handling abort_stream request");
    let view = state
        .engine
        .request(Request::AbortStream(request.message_id))
        .await?;
    Ok(Json(view))
}

/// Returns the streaming router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/open", post(open_stream))
        .route("/token", post(push_token))
        .route("/complete", post(complete_stream))
        .route("/abort", post(abort_stream))
}
