//! Stagehand — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stagehand_core::error::StageError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable or file is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The interpreter rejected its configuration.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `StageError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub StageError);

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            StageError::Busy => (StatusCode::CONFLICT, "busy"),
            StageError::NavigationLocked(_) => (StatusCode::CONFLICT, "navigation_locked"),
            StageError::StreamNotFound(_) => (StatusCode::NOT_FOUND, "stream_not_found"),
            StageError::History(_) => (StatusCode::BAD_GATEWAY, "history_unavailable"),
            StageError::EngineStopped => (StatusCode::INTERNAL_SERVER_ERROR, "engine_stopped"),
            StageError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn status_of(err: StageError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_busy_maps_to_409() {
        assert_eq!(status_of(StageError::Busy), StatusCode::CONFLICT);
    }

    #[test]
    fn test_navigation_locked_maps_to_409() {
        assert_eq!(
            status_of(StageError::NavigationLocked(Uuid::new_v4())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_stream_not_found_maps_to_404() {
        assert_eq!(
            status_of(StageError::StreamNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_history_maps_to_502() {
        assert_eq!(
            status_of(StageError::History("connection refused".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_engine_stopped_maps_to_500() {
        assert_eq!(
            status_of(StageError::EngineStopped),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
