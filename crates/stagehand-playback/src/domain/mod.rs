//! Playback domain types.

pub mod config;
pub mod signal;
pub mod view;
