//! Markup parsing, repair and sanitizing.

pub mod parser;
pub mod repair;
pub mod sanitizer;
