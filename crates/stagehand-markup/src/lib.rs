//! Stagehand — scene markup.
//!
//! Responsible for turning the raw text of one assistant message into a
//! content tree: stripping wrapper noise, strict parsing against the fixed
//! tag vocabulary, fuzzy tag-name repair, and graceful degradation to
//! escaped plain text when the markup cannot be recovered.

pub mod application;
pub mod domain;
pub mod error;

pub use application::sanitizer::{Sanitized, sanitize, sanitize_truncated};
pub use domain::tree::{Attribute, Element, Node};
pub use error::ParseError;
