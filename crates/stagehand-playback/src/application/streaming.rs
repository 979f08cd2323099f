//! Token stream buffering.
//!
//! Assistant messages arrive as token streams. Tokens are only accumulated;
//! nothing is parsed until the stream ends, because a partial fragment
//! cannot be parsed reliably.

use std::collections::BTreeMap;

use stagehand_core::error::StageError;
use tracing::debug;
use uuid::Uuid;

/// Accumulates token streams per message id.
#[derive(Debug, Clone, Default)]
pub struct StreamAdapter {
    buffers: BTreeMap<Uuid, String>,
}

impl StreamAdapter {
    /// Creates an adapter with no open streams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a buffer for `message_id` if none exists yet.
    pub fn open(&mut self, message_id: Uuid) {
        self.buffers.entry(message_id).or_default();
    }

    /// Appends a token, opening the stream on first use.
    pub fn push(&mut self, message_id: Uuid, token: &str) {
        self.buffers.entry(message_id).or_default().push_str(token);
    }

    /// Closes the stream for `message_id` and returns its accumulated text.
    ///
    /// # Errors
    ///
    /// Returns `StageError::StreamNotFound` if no stream is open for the id.
    pub fn finish(&mut self, message_id: Uuid) -> Result<String, StageError> {
        let text = self
            .buffers
            .remove(&message_id)
            .ok_or(StageError::StreamNotFound(message_id))?;
        debug!(%message_id, bytes = text.len(), "stream closed");
        Ok(text)
    }

    /// Any message that is still streaming.
    #[must_use]
    pub fn active(&self) -> Option<Uuid> {
        self.buffers.keys().next().copied()
    }

    /// Whether any stream is open.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        !self.buffers.is_empty()
    }

    /// Drops every open stream.
    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
