//! WebSocket Message Types
//!
//! Chat frame decoding and encoding. Inbound frames carry a
//! [`ChatMessageRequest`] as JSON; outbound frames carry a
//! [`ChatMessageResponse`].

use validator::Validate;

use crate::application::dto::ChatMessageResponse;
use crate::domain::{ChatMessage, ChatMessageRequest};
use crate::shared::validation;

/// Reasons an inbound frame ends the connection
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Malformed chat frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid chat message: {0}")]
    Invalid(String),
}

/// Decode one inbound frame payload.
pub fn decode_chat_request(
    payload: &[u8],
    max_size: usize,
) -> Result<ChatMessageRequest, FrameError> {
    if payload.len() > max_size {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            limit: max_size,
        });
    }

    let request: ChatMessageRequest = serde_json::from_slice(payload)?;
    request
        .validate()
        .map_err(|e| FrameError::Invalid(validation::describe(&e)))?;

    Ok(request)
}

/// Encode a delivered message as an outbound text frame.
pub fn encode_chat_message(message: &ChatMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ChatMessageResponse::from(message))
}
