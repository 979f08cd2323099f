//! Test chat histories — `ChatHistory` implementations for tests.

use async_trait::async_trait;
use stagehand_core::error::StageError;
use stagehand_core::history::ChatHistory;
use stagehand_core::message::Message;
use uuid::Uuid;

use crate::clock::FixedClock;

/// Builds an assistant message stamped by [`FixedClock::standard`].
#[must_use]
pub fn assistant(content: &str) -> Message {
    Message::assistant(Uuid::new_v4(), content, &FixedClock::standard())
}

/// Builds a user message stamped by [`FixedClock::standard`].
#[must_use]
pub fn user(content: &str) -> Message {
    Message::user(content, &FixedClock::standard())
}

/// A chat history that returns a fixed message list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatHistory {
    messages: Vec<Message>,
}

impl InMemoryChatHistory {
    /// Create a history that returns `messages` on every load.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl ChatHistory for InMemoryChatHistory {
    async fn load_messages(&self) -> Result<Vec<Message>, StageError> {
        Ok(self.messages.clone())
    }
}

/// A chat history that always fails. Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingChatHistory;

#[async_trait]
impl ChatHistory for FailingChatHistory {
    async fn load_messages(&self) -> Result<Vec<Message>, StageError> {
        Err(StageError::History("connection refused".into()))
    }
}
