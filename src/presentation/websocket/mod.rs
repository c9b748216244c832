//! WebSocket Chat
//!
//! The chat hub plus the per-connection loops that feed it.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;

pub use connection::Connection;
pub use handler::{on_upgrade, ws_handler};
pub use hub::{ConnectionId, Hub, HubError, HubHandle};
pub use messages::{decode_chat_request, encode_chat_message, FrameError};
