//! Chat Repository Implementation
//!
//! SQLite implementation of the chat message store: append, recency queries
//! with limit/offset, and retention trimming.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{ChatMessage, MessageStore};
use crate::shared::error::AppError;

/// SQLite chat message repository.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: SqlitePool,
}

impl SqliteChatRepository {
    /// Creates a new SqliteChatRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for chat message queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: String,
    user_id: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    /// Converts database row to domain ChatMessage entity.
    fn into_message(self) -> Result<ChatMessage, AppError> {
        let id = Uuid::parse_str(&self.id).map_err(|e| {
            AppError::Internal(format!("Corrupt chat message id {}: {}", self.id, e))
        })?;

        Ok(ChatMessage {
            id,
            user_id: self.user_id,
            text: self.text,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl MessageStore for SqliteChatRepository {
    async fn save(&self, message: &ChatMessage) -> Result<(), AppError> {
        tracing::debug!(
            message_id = %message.id,
            user_id = %message.user_id,
            "Saving chat message"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages (id, user_id, text, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(message.id.to_string())
        .bind(&message.user_id)
        .bind(&message.text)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "No rows affected when saving chat message {}",
                message.id
            )));
        }

        Ok(())
    }

    /// Most recent first; ties on the timestamp fall back to insertion order.
    async fn recent(&self, limit: i64, offset: i64) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT id, user_id, text, created_at
            FROM chat_messages
            ORDER BY created_at DESC, rowid DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessageRow::into_message).collect()
    }

    async fn trim(&self, older_than: chrono::Duration) -> Result<u64, AppError> {
        let cutoff = Utc::now() - older_than;

        let result = sqlx::query("DELETE FROM chat_messages WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
