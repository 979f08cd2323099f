//! Markup sanitizer.
//!
//! Entry point for raw assistant text. Never fails: anything that cannot be
//! turned into a content tree comes back as escaped plain text plus the
//! parse error that stopped it.

use tracing::{debug, warn};

use crate::application::parser::{Strictness, parse_fragment};
use crate::application::repair::{recover_truncated, repair_tag_names};
use crate::domain::tree::{Element, escape};
use crate::domain::vocabulary::ROOT;

/// Result of sanitizing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitized {
    /// The message parsed into a content tree.
    Scene {
        /// Synthetic root holding the top-level nodes.
        root: Element,
        /// Whether tag-name repair was needed.
        repaired: bool,
    },
    /// The message could not be parsed and must be shown as plain text.
    Degraded {
        /// The original text, escaped for display.
        escaped_text: String,
        /// Why parsing failed.
        error: String,
    },
}

impl Sanitized {
    fn empty() -> Self {
        Self::Scene {
            root: Element::new(ROOT),
            repaired: false,
        }
    }
}

/// Sanitizes the complete raw text of one assistant message.
#[must_use]
pub fn sanitize(raw: &str) -> Sanitized {
    sanitize_inner(raw, false)
}

/// Sanitizes text whose stream was cut off, recovering unterminated tags
/// before parsing.
#[must_use]
pub fn sanitize_truncated(raw: &str) -> Sanitized {
    sanitize_inner(raw, true)
}

fn sanitize_inner(raw: &str, truncated: bool) -> Sanitized {
    let unwrapped = strip_fences(raw);
    if unwrapped.is_empty() {
        return Sanitized::empty();
    }
    let Some(body) = markup_body(unwrapped, truncated) else {
        debug!("message contains no markup");
        return Sanitized::Degraded {
            escaped_text: escape(unwrapped),
            error: "no scene markup found".to_owned(),
        };
    };

    let recovered;
    let body = if truncated {
        recovered = recover_truncated(body);
        recovered.as_str()
    } else {
        body
    };

    let first_error = match parse_fragment(body, Strictness::Vocabulary) {
        Ok(root) => {
            return Sanitized::Scene {
                root,
                repaired: false,
            };
        }
        Err(e) => e,
    };

    let repaired = repair_tag_names(body);
    match parse_fragment(&repaired.markup, Strictness::WellFormed) {
        Ok(root) => {
            let corrected = !repaired.corrections.is_empty();
            if corrected {
                warn!(
                    corrections = repaired.corrections.len(),
                    original_error = %first_error,
                    "repaired scene markup"
                );
            }
            Sanitized::Scene {
                root,
                repaired: corrected,
            }
        }
        Err(e) => {
            warn!(error = %e, "scene markup is beyond repair; degrading to plain text");
            Sanitized::Degraded {
                escaped_text: escape(unwrapped),
                error: e.to_string(),
            }
        }
    }
}

/// Trims whitespace and a surrounding fenced-code block.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.find('\n').map_or("", |nl| &rest[nl + 1..]);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Returns the span from the first `<` through the last `>`, dropping prose
/// around the markup. A cut-off stream keeps its tail, which is usually
/// unfinished element text. `None` when there is no markup at all.
fn markup_body(text: &str, keep_tail: bool) -> Option<&str> {
    let start = text.find('<')?;
    if keep_tail {
        return Some(&text[start..]);
    }
    let end = text
        .rfind('>')
        .filter(|&gt| gt > start)
        .map_or(text.len(), |gt| gt + 1);
    Some(&text[start..end])
}
