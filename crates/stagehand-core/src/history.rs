//! Chat history provider abstraction.

use async_trait::async_trait;

use crate::error::StageError;
use crate::message::Message;

/// Read-only access to the ordered message list of one conversation.
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Load all messages in chat order.
    async fn load_messages(&self) -> Result<Vec<Message>, StageError>;
}
