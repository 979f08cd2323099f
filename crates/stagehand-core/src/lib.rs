//! Stagehand Core — shared abstractions.
//!
//! This crate defines the chat-layer types and collaborator traits that the
//! markup, stage and playback crates depend on. It contains no parsing or
//! playback logic.

pub mod clock;
pub mod error;
pub mod history;
pub mod message;
pub mod roster;
