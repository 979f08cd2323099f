//! Playback application services.

pub mod context;
pub mod engine;
pub mod render;
pub mod runtime;
pub mod streaming;
pub mod typewriter;
