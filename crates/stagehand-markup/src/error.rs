//! Markup parse errors.

use thiserror::Error;

/// A failure to parse scene markup. Offsets are byte positions into the
/// sanitized input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended inside a tag, comment or attribute.
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof {
        /// Where input ended.
        offset: usize,
    },

    /// A specific token was required but something else was found.
    #[error("expected {expected} at byte {offset}")]
    Expected {
        /// Description of the expected token.
        expected: &'static str,
        /// Where the mismatch occurred.
        offset: usize,
    },

    /// A closing tag did not match the innermost open element.
    #[error("closing tag </{found}> does not match <{open}> at byte {offset}")]
    MismatchedClose {
        /// The innermost open element.
        open: String,
        /// The closing tag that was found.
        found: String,
        /// Position of the closing tag.
        offset: usize,
    },

    /// A closing tag appeared with no open element.
    #[error("unexpected closing tag </{name}> at byte {offset}")]
    UnexpectedClose {
        /// The closing tag name.
        name: String,
        /// Position of the closing tag.
        offset: usize,
    },

    /// An element name outside the tag vocabulary (strict mode only).
    #[error("unknown element <{name}> at byte {offset}")]
    UnknownElement {
        /// The unrecognized name.
        name: String,
        /// Position of the opening tag.
        offset: usize,
    },

    /// Input ended while an element was still open.
    #[error("element <{name}> opened at byte {offset} is never closed")]
    Unclosed {
        /// The unclosed element.
        name: String,
        /// Position of its opening tag.
        offset: usize,
    },
}
