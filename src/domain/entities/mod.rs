//! # Domain Entities
//!
//! Core domain entities for the chat feature.
//!
//! - **ChatMessage**: an immutable message posted to the chat room
//! - **ChatMessageRequest**: the inbound client payload a message is built from
//!
//! ## Repository Traits
//!
//! `MessageStore` defines chat persistence. It is implemented in the
//! infrastructure layer, following the dependency inversion principle.

mod chat_message;

pub use chat_message::{ChatMessage, ChatMessageRequest, MessageStore};

#[cfg(test)]
pub use chat_message::MockMessageStore;
