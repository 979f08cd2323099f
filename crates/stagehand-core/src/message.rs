//! Chat messages as delivered by the external chat layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human participant.
    User,
    /// The language model; only these messages carry scene markup.
    Assistant,
    /// Out-of-band instructions.
    System,
}

/// A single chat message. Read-only to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: Uuid,
    /// Author role.
    pub role: Role,
    /// Raw message text.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates an outbound user message, e.g. the text of a selected choice.
    #[must_use]
    pub fn user(content: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: clock.now(),
        }
    }

    /// Creates an assistant message with a known id, as produced when a
    /// stream completes.
    #[must_use]
    pub fn assistant(id: Uuid, content: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            timestamp: clock.now(),
        }
    }
}
