//! Response DTOs
//!
//! Wire representation of chat messages, shared by the history endpoint and
//! outbound WebSocket frames.

use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Chat message response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<&ChatMessage> for ChatMessageResponse {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.to_string(),
            user_id: message.user_id.clone(),
            text: message.text.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self::from(&message)
    }
}
