//! WebSocket Connection Handler
//!
//! Upgrades authenticated requests on `/api/v1/chat/ws` and hands the socket
//! to a [`Connection`].

use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
    Extension,
};
use futures::StreamExt;

use super::connection::Connection;
use super::hub::HubHandle;
use crate::config::WebSocketSettings;
use crate::presentation::middleware::AuthUser;
use crate::startup::AppState;

/// WebSocket upgrade handler
///
/// Runs behind `auth_middleware`, so the caller identity is already resolved.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let settings = state.settings.websocket.clone();
    let hub = state.hub.clone();

    tracing::debug!(user_id = %user.user_id, "Upgrading chat connection");

    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_message_size)
        .on_upgrade(move |socket| on_upgrade(socket, user.user_id, hub, settings))
}

/// Register a freshly upgraded socket with the hub and start its loops.
pub async fn on_upgrade(
    socket: WebSocket,
    user_id: String,
    hub: HubHandle,
    settings: WebSocketSettings,
) {
    let (sender, receiver) = socket.split();
    let connection = Connection::new(user_id.clone(), hub, settings);
    let connection_id = connection.id();

    match connection.start(sender, receiver).await {
        Ok(_) => {
            tracing::info!(
                connection_id = %connection_id,
                user_id = %user_id,
                "Chat connection opened"
            );
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Rejected chat connection");
        }
    }
}
