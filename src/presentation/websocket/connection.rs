//! Connection Loops
//!
//! Every upgraded socket runs two tasks. The read loop turns inbound frames
//! into hub broadcasts and enforces the keepalive deadline; the write loop
//! drains the connection's mailbox and sends periodic pings.
//!
//! Teardown always goes through the hub: the read loop unregisters on exit,
//! the hub closes the mailbox, and the write loop answers with a close frame.
//! If the write loop fails first it signals the read loop to stop.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::hub::{ConnectionId, HubError, HubHandle, MailboxReceiver};
use super::messages::{decode_chat_request, encode_chat_message};
use crate::config::WebSocketSettings;
use crate::domain::ChatMessage;

/// One authenticated client, before its loops are started
pub struct Connection {
    id: ConnectionId,
    user_id: String,
    hub: HubHandle,
    settings: WebSocketSettings,
}

impl Connection {
    pub fn new(user_id: impl Into<String>, hub: HubHandle, settings: WebSocketSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            hub,
            settings,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Register with the hub and spawn the read and write loops.
    ///
    /// Returns the (read, write) task handles. If the hub is already shut
    /// down a close frame is sent and nothing is spawned.
    pub async fn start<S, R, E>(
        self,
        mut sink: S,
        stream: R,
    ) -> Result<(JoinHandle<()>, JoinHandle<()>), HubError>
    where
        S: Sink<Message> + Send + Unpin + 'static,
        S::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        let (mailbox_tx, mailbox_rx) = mpsc::channel(self.settings.mailbox_capacity);

        if let Err(e) = self.hub.register(self.id, self.user_id.clone(), mailbox_tx).await {
            let _ = write_frame(&mut sink, Message::Close(None), self.settings.write_wait()).await;
            return Err(e);
        }

        let (writer_done_tx, writer_done_rx) = oneshot::channel();

        let writer = tokio::spawn(write_loop(
            self.id,
            sink,
            mailbox_rx,
            self.settings.write_wait(),
            self.settings.ping_period(),
            writer_done_tx,
        ));

        let reader = tokio::spawn(read_loop(
            ReadContext {
                id: self.id,
                user_id: self.user_id,
                hub: self.hub,
                max_message_size: self.settings.max_message_size,
                pong_wait: self.settings.pong_wait(),
            },
            stream,
            writer_done_rx,
        ));

        Ok((reader, writer))
    }
}

struct ReadContext {
    id: ConnectionId,
    user_id: String,
    hub: HubHandle,
    max_message_size: usize,
    pong_wait: Duration,
}

/// Inbound side. Any read error, close, oversize or malformed frame, or a
/// missed keepalive deadline ends the connection.
async fn read_loop<R, E>(ctx: ReadContext, mut stream: R, mut writer_done: oneshot::Receiver<()>)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let id = ctx.id;
    let mut deadline = Instant::now() + ctx.pong_wait;

    loop {
        let next = tokio::select! {
            next = timeout_at(deadline, stream.next()) => next,
            _ = &mut writer_done => {
                tracing::debug!(connection_id = %id, "Write loop ended, stopping reader");
                break;
            }
        };

        let frame = match next {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!(connection_id = %id, error = %e, "WebSocket read failed");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::debug!(connection_id = %id, "Keepalive deadline missed");
                break;
            }
        };

        let decoded = match frame {
            Message::Text(text) => {
                decode_chat_request(text.as_str().as_bytes(), ctx.max_message_size)
            }
            Message::Binary(bytes) => decode_chat_request(&bytes, ctx.max_message_size),
            Message::Pong(_) => {
                deadline = Instant::now() + ctx.pong_wait;
                continue;
            }
            Message::Ping(_) => continue,
            Message::Close(_) => {
                tracing::debug!(connection_id = %id, "Peer closed connection");
                break;
            }
        };

        let request = match decoded {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "Rejecting inbound frame");
                break;
            }
        };

        let message = ChatMessage::new(request, ctx.user_id.as_str());
        if ctx.hub.broadcast(message).await.is_err() {
            break;
        }
    }

    let _ = ctx.hub.unregister(id).await;
    tracing::debug!(connection_id = %id, user_id = %ctx.user_id, "Read loop finished");
}

/// Outbound side. Ends on a closed mailbox (after sending a close frame) or
/// on the first failed or timed-out write.
async fn write_loop<S>(
    id: ConnectionId,
    mut sink: S,
    mut mailbox: MailboxReceiver,
    write_wait: Duration,
    ping_period: Duration,
    _done: oneshot::Sender<()>,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ticker = interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            delivered = mailbox.recv() => match delivered {
                Some(message) => match encode_chat_message(&message) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(
                            connection_id = %id,
                            error = %e,
                            "Failed to encode chat message"
                        );
                        continue;
                    }
                },
                None => {
                    let _ = write_frame(&mut sink, Message::Close(None), write_wait).await;
                    break;
                }
            },
            _ = ticker.tick() => Message::Ping(Default::default()),
        };

        if let Err(e) = write_frame(&mut sink, frame, write_wait).await {
            tracing::debug!(connection_id = %id, error = %e, "WebSocket write failed");
            break;
        }
    }

    let _ = timeout(write_wait, sink.close()).await;
    tracing::debug!(connection_id = %id, "Write loop finished");
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("write timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

async fn write_frame<S>(sink: &mut S, frame: Message, wait: Duration) -> Result<(), WriteError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match timeout(wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Transport(e.to_string())),
        Err(_) => Err(WriteError::Timeout),
    }
}
