//! Presentation Layer
//!
//! HTTP routes and the WebSocket chat endpoint.

pub mod http;
pub mod middleware;
pub mod websocket;
