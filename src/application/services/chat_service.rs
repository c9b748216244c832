//! Chat Service
//!
//! History queries and retention for chat messages. Both operations go
//! straight to the message store and never through the hub.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ChatSettings;
use crate::domain::{ChatMessage, MessageStore};

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Fetch a page of history, most recent first
    async fn get_messages(&self, query: HistoryQueryDto) -> Result<Vec<ChatMessage>, ChatError>;

    /// Delete messages older than `older_than`
    async fn clean_old_messages(&self, older_than: chrono::Duration) -> Result<u64, ChatError>;
}

/// History query parameters
#[derive(Debug, Clone, Default)]
pub struct HistoryQueryDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Internal error: {0}")]
    Internal(String),
}

/// ChatService implementation
pub struct ChatServiceImpl {
    store: Arc<dyn MessageStore>,
    settings: ChatSettings,
}

impl ChatServiceImpl {
    pub fn new(store: Arc<dyn MessageStore>, settings: ChatSettings) -> Self {
        Self { store, settings }
    }

    /// Normalise paging: non-positive or missing limits use the default page
    /// size, large ones are capped, negative offsets start from the top.
    fn page(&self, query: &HistoryQueryDto) -> (i64, i64) {
        let limit = match query.limit {
            Some(limit) if limit > 0 => limit.min(self.settings.max_page_size),
            _ => self.settings.default_page_size,
        };
        let offset = query.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn get_messages(&self, query: HistoryQueryDto) -> Result<Vec<ChatMessage>, ChatError> {
        let (limit, offset) = self.page(&query);

        self.store
            .recent(limit, offset)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))
    }

    async fn clean_old_messages(&self, older_than: chrono::Duration) -> Result<u64, ChatError> {
        let removed = self
            .store
            .trim(older_than)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        tracing::info!(
            deleted_count = removed,
            older_than_days = older_than.num_days(),
            "Cleaned old chat messages"
        );

        Ok(removed)
    }
}

/// Periodically trim chat history until the task is aborted.
///
/// The first sweep runs one full interval after start. A failed sweep is
/// logged and retried on the next tick.
pub async fn run_retention_sweep(
    service: Arc<dyn ChatService>,
    retention: chrono::Duration,
    every: Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = service.clean_old_messages(retention).await {
            tracing::warn!(error = %e, "Chat retention sweep failed");
        }
    }
}
