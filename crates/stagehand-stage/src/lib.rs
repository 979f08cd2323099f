//! Stagehand — stage context.
//!
//! Responsible for the scene state (background and characters on stage),
//! the closed set of stage commands with their apply/revert pairs, the
//! conversation-wide command queue, and compiling sanitized markup into
//! commands.

pub mod application;
pub mod domain;
