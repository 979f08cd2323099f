//! User-interaction signals delivered into playback.

use serde::Deserialize;

/// An event from the user-interaction surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "signal", content = "text", rename_all = "snake_case")]
pub enum Signal {
    /// Resolve the current wait point, or step to the next one when idle.
    Advance,
    /// Finish the current reveal immediately.
    Skip,
    /// Resolve a prompt with the given choice text.
    Choice(String),
    /// Stop the running playback operation after the current command.
    Cancel,
}

/// Named suspension points of an animated playback task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// Delay between revealed characters.
    CharacterDelay,
    /// A fixed pause, top-level or inline.
    Pause,
    /// Background cross-fade or stage fade.
    Transition,
}

/// How a timed suspension ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration passed.
    Elapsed,
    /// The user asked to skip ahead.
    Skipped,
    /// The operation was cancelled.
    Cancelled,
}

/// How a wait for user input ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// The user advanced past a text wait point.
    Advance,
    /// The user picked a prompt choice.
    Choice(String),
    /// The operation was cancelled.
    Cancelled,
}
