//! Stage domain types.

pub mod commands;
pub mod queue;
pub mod scene;
