//! Error types shared by the interpreter crates.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for stage and playback operations.
///
/// Markup failures are not represented here: they degrade to plain-text
/// rendering inside the sanitizer and never reach callers as errors.
#[derive(Debug, Error)]
pub enum StageError {
    /// A playback operation is already running; the request was dropped.
    #[error("playback is busy; request ignored")]
    Busy,

    /// Navigation was requested while a stream is still outstanding.
    #[error("navigation is locked while message {0} is streaming")]
    NavigationLocked(Uuid),

    /// A stream event referenced a message id with no open buffer.
    #[error("no stream is open for message {0}")]
    StreamNotFound(Uuid),

    /// The chat history provider failed.
    #[error("history error: {0}")]
    History(String),

    /// The engine task has stopped and no longer accepts requests.
    #[error("engine is not running")]
    EngineStopped,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}
