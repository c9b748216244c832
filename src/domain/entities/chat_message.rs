//! Chat message entity and repository trait.
//!
//! Maps to the `chat_messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::shared::error::AppError;

/// A message posted to the global chat room.
///
/// Maps to the `chat_messages` table:
/// - id: TEXT PRIMARY KEY (UUID v4)
/// - user_id: TEXT NOT NULL (author identity, taken from the caller's token)
/// - text: TEXT NOT NULL (1-1000 characters)
/// - created_at: TEXT NOT NULL (UTC, RFC 3339)
///
/// Messages are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier generated at construction
    pub id: Uuid,

    /// Author identity
    pub user_id: String,

    /// Message body
    pub text: String,

    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message authored by `user_id`.
    ///
    /// The author always comes from the authenticated connection, never from
    /// the client payload.
    pub fn new(request: ChatMessageRequest, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            text: request.text,
            created_at: Utc::now(),
        }
    }
}

/// Inbound chat frame as sent by a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatMessageRequest {
    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    pub text: String,
}

/// Repository trait for chat message persistence.
///
/// Implementations must be safe to call from several tasks at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a single message.
    async fn save(&self, message: &ChatMessage) -> Result<(), AppError>;

    /// Fetch messages ordered most recent first.
    async fn recent(&self, limit: i64, offset: i64) -> Result<Vec<ChatMessage>, AppError>;

    /// Delete messages older than `older_than`, returning how many were removed.
    async fn trim(&self, older_than: chrono::Duration) -> Result<u64, AppError>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
