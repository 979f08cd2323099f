//! Stagehand — playback.
//!
//! Responsible for executing stage commands against the live scene state:
//! animated forward steps, instant silent replay, backward navigation, the
//! typewriter reveal, token stream buffering, and the single task that owns
//! the engine at runtime.

pub mod application;
pub mod domain;
