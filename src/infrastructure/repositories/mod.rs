//! Repository Implementations
//!
//! SQLite implementations of domain repository traits.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlx::SqlitePool;
//! use forum_chat::domain::MessageStore;
//! use forum_chat::infrastructure::repositories::SqliteChatRepository;
//!
//! fn message_store(pool: SqlitePool) -> Arc<dyn MessageStore> {
//!     Arc::new(SqliteChatRepository::new(pool))
//! }
//! ```

pub mod chat_repository;

pub use chat_repository::SqliteChatRepository;
