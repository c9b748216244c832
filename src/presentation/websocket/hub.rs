//! Chat Hub
//!
//! The single rendezvous point for live chat connections. One task owns the
//! membership set and processes registrations, deregistrations and
//! broadcasts strictly one at a time, in the order they were submitted.
//!
//! All intake shares one FIFO command queue, so commands from a single
//! producer are never reordered relative to each other. Inside the loop the
//! only awaits are the intake queue and the message store; delivery to a
//! connection is a non-blocking `try_send` on its mailbox, and a connection
//! whose mailbox is full is dropped instead of stalling everyone else.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::{ChatMessage, MessageStore};
use crate::infrastructure::metrics;

/// Identity of one connection inside the hub
pub type ConnectionId = Uuid;

/// Producer side of a connection's outbound mailbox, owned by the hub
pub type MailboxSender = mpsc::Sender<Arc<ChatMessage>>;

/// Consumer side of a connection's outbound mailbox, owned by its write loop
pub type MailboxReceiver = mpsc::Receiver<Arc<ChatMessage>>;

/// Hub errors
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Chat hub is shut down")]
    Closed,
}

enum HubCommand {
    Register {
        id: ConnectionId,
        user_id: String,
        mailbox: MailboxSender,
    },
    Unregister {
        id: ConnectionId,
    },
    Broadcast(ChatMessage),
    Count(oneshot::Sender<usize>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle used by connections and startup to talk to the hub
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| HubError::Closed)
    }

    /// Admit a connection. Its mailbox first receives up to the configured
    /// number of recent messages, oldest first.
    pub async fn register(
        &self,
        id: ConnectionId,
        user_id: impl Into<String>,
        mailbox: MailboxSender,
    ) -> Result<(), HubError> {
        self.submit(HubCommand::Register {
            id,
            user_id: user_id.into(),
            mailbox,
        })
        .await
    }

    /// Remove a connection and close its mailbox. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.submit(HubCommand::Unregister { id }).await
    }

    /// Persist `message`, then deliver it to every member.
    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), HubError> {
        self.submit(HubCommand::Broadcast(message)).await
    }

    /// Number of registered connections, observed after every command
    /// submitted before this call.
    pub async fn connection_count(&self) -> Result<usize, HubError> {
        let (reply, count) = oneshot::channel();
        self.submit(HubCommand::Count(reply)).await?;
        count.await.map_err(|_| HubError::Closed)
    }

    /// Stop the hub: every mailbox is closed and later submissions fail.
    /// Calling it on a stopped hub returns immediately.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.submit(HubCommand::Shutdown(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

struct Member {
    user_id: String,
    mailbox: MailboxSender,
}

/// The coordination loop state. Build with [`Hub::new`], then spawn [`Hub::run`].
pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    members: HashMap<ConnectionId, Member>,
    store: Arc<dyn MessageStore>,
    history_limit: usize,
}

impl Hub {
    pub fn new(
        store: Arc<dyn MessageStore>,
        history_limit: usize,
        intake_capacity: usize,
    ) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(intake_capacity);
        let hub = Self {
            commands: rx,
            members: HashMap::new(),
            store,
            history_limit,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Run until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Chat hub started");

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register {
                    id,
                    user_id,
                    mailbox,
                } => self.register(id, user_id, mailbox).await,
                HubCommand::Unregister { id } => self.unregister(id),
                HubCommand::Broadcast(message) => self.broadcast(message).await,
                HubCommand::Count(reply) => {
                    let _ = reply.send(self.members.len());
                }
                HubCommand::Shutdown(ack) => {
                    self.commands.close();
                    self.close_all();
                    let _ = ack.send(());
                    break;
                }
            }
        }

        self.close_all();
        tracing::info!("Chat hub stopped");
    }

    async fn register(&mut self, id: ConnectionId, user_id: String, mailbox: MailboxSender) {
        if self.members.contains_key(&id) {
            tracing::warn!(connection_id = %id, "Connection already registered");
            return;
        }

        self.replay_history(id, &mailbox).await;

        tracing::info!(connection_id = %id, user_id = %user_id, "Connection registered");
        self.members.insert(id, Member { user_id, mailbox });
        metrics::set_chat_connections(self.members.len());
    }

    /// Best effort: a failed fetch leaves the new connection with an empty
    /// backlog.
    async fn replay_history(&self, id: ConnectionId, mailbox: &MailboxSender) {
        if self.history_limit == 0 {
            return;
        }

        let history = match self.store.recent(self.history_limit as i64, 0).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Failed to load chat history");
                return;
            }
        };

        // Store order is newest first; replay oldest first.
        for message in history.into_iter().rev() {
            if mailbox.try_send(Arc::new(message)).is_err() {
                tracing::warn!(connection_id = %id, "Mailbox full while replaying history");
                break;
            }
        }
    }

    fn unregister(&mut self, id: ConnectionId) {
        // Dropping the member drops the hub's mailbox sender, which closes it.
        if let Some(member) = self.members.remove(&id) {
            tracing::info!(
                connection_id = %id,
                user_id = %member.user_id,
                "Connection unregistered"
            );
            metrics::set_chat_connections(self.members.len());
        }
    }

    async fn broadcast(&mut self, message: ChatMessage) {
        if let Err(e) = self.store.save(&message).await {
            tracing::error!(
                message_id = %message.id,
                user_id = %message.user_id,
                error = %e,
                "Failed to persist chat message, dropping broadcast"
            );
            metrics::CHAT_PERSIST_FAILURES_TOTAL.inc();
            return;
        }

        let message = Arc::new(message);
        let mut evicted = Vec::new();

        for (id, member) in &self.members {
            match member.mailbox.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %id,
                        user_id = %member.user_id,
                        "Mailbox full, disconnecting slow consumer"
                    );
                    metrics::CHAT_SLOW_CONSUMERS_TOTAL.inc();
                    evicted.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %id, "Mailbox consumer gone");
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            self.unregister(id);
        }

        metrics::CHAT_BROADCASTS_TOTAL.inc();
        tracing::debug!(
            message_id = %message.id,
            recipients = self.members.len(),
            "Chat message broadcast"
        );
    }

    fn close_all(&mut self) {
        if !self.members.is_empty() {
            tracing::info!(connections = self.members.len(), "Closing all chat connections");
        }
        self.members.clear();
        metrics::set_chat_connections(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSettings;
    use crate::domain::{ChatMessageRequest, MockMessageStore};
    use crate::infrastructure::database;
    use crate::infrastructure::repositories::SqliteChatRepository;
    use crate::shared::error::AppError;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn message(user_id: &str, text: &str) -> ChatMessage {
        ChatMessage::new(ChatMessageRequest { text: text.into() }, user_id)
    }

    fn accepting_store() -> MockMessageStore {
        let mut store = MockMessageStore::new();
        store.expect_recent().returning(|_, _| Ok(vec![]));
        store.expect_save().returning(|_| Ok(()));
        store
    }

    fn spawn_hub(store: MockMessageStore) -> HubHandle {
        let (hub, handle) = Hub::new(Arc::new(store), 100, 64);
        tokio::spawn(hub.run());
        handle
    }

    async fn connect(
        hub: &HubHandle,
        user_id: &str,
        capacity: usize,
    ) -> (ConnectionId, MailboxReceiver) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        hub.register(id, user_id, tx).await.unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_delivers_persisted_record_then_unregister_stops_delivery() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let mut store = MockMessageStore::new();
        store.expect_recent().returning(|_, _| Ok(vec![]));
        store.expect_save().returning(move |m| {
            sink.lock().unwrap().push(m.clone());
            Ok(())
        });
        let hub = spawn_hub(store);
        let (a, mut mailbox) = connect(&hub, "reader", 8).await;

        let hello = message("u1", "hello");
        hub.broadcast(hello.clone()).await.unwrap();
        hub.connection_count().await.unwrap();

        let delivered = mailbox.try_recv().unwrap();
        assert_eq!(*delivered, hello);
        assert_eq!(saved.lock().unwrap().clone(), vec![hello]);
        assert!(mailbox.try_recv().is_err());

        hub.unregister(a).await.unwrap();
        hub.broadcast(message("u1", "again")).await.unwrap();
        assert_eq!(hub.connection_count().await.unwrap(), 0);

        assert_eq!(mailbox.recv().await, None);
        assert_eq!(saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_drops_message_for_everyone() {
        let mut store = MockMessageStore::new();
        store.expect_recent().returning(|_, _| Ok(vec![]));
        store
            .expect_save()
            .returning(|_| Err(AppError::Internal("database is locked".into())));
        let hub = spawn_hub(store);
        let (_, mut first) = connect(&hub, "a", 8).await;
        let (_, mut second) = connect(&hub, "b", 8).await;

        hub.broadcast(message("u1", "lost")).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 2);
        assert!(first.try_recv().is_err());
        assert!(second.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_replays_history_oldest_first_before_live_messages() {
        let now = Utc::now();
        let mut history: Vec<ChatMessage> = (0..3)
            .map(|i| {
                let mut m = message("u1", &format!("old-{}", i));
                m.created_at = now - Duration::minutes(10 - i);
                m
            })
            .collect();
        // The store hands back newest first.
        history.reverse();
        let stored = history.clone();

        let mut store = MockMessageStore::new();
        store
            .expect_recent()
            .withf(|limit, offset| *limit == 100 && *offset == 0)
            .returning(move |_, _| Ok(stored.clone()));
        store.expect_save().returning(|_| Ok(()));
        let hub = spawn_hub(store);

        let (_, mut mailbox) = connect(&hub, "late", 8).await;
        hub.broadcast(message("u2", "live")).await.unwrap();
        hub.connection_count().await.unwrap();

        let mut received = Vec::new();
        while let Ok(m) = mailbox.try_recv() {
            received.push(m.text.clone());
        }
        assert_eq!(received, vec!["old-0", "old-1", "old-2", "live"]);
    }

    /// Hub over an in-memory SQLite store seeded with `count` messages,
    /// one minute apart, oldest first.
    async fn spawn_seeded_hub(count: i64, history_limit: usize) -> HubHandle {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout: 5,
        };
        let pool = database::create_pool(&settings).await.unwrap();
        database::run_migrations(&pool).await.unwrap();
        let store = SqliteChatRepository::new(pool);

        let start = Utc::now() - Duration::hours(1);
        for i in 0..count {
            let mut m = message("u1", &format!("m{}", i));
            m.created_at = start + Duration::minutes(i);
            store.save(&m).await.unwrap();
        }

        let (hub, handle) = Hub::new(Arc::new(store), history_limit, 64);
        tokio::spawn(hub.run());
        handle
    }

    fn drain(mailbox: &mut MailboxReceiver) -> Vec<String> {
        std::iter::from_fn(|| mailbox.try_recv().ok())
            .map(|m| m.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_replay_is_bounded_to_most_recent_in_chronological_order() {
        let hub = spawn_seeded_hub(5, 3).await;

        let (_, mut mailbox) = connect(&hub, "late", 8).await;
        hub.connection_count().await.unwrap();

        assert_eq!(drain(&mut mailbox), vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_replay_stops_at_full_mailbox_but_still_registers() {
        let hub = spawn_seeded_hub(5, 5).await;

        let (_, mut mailbox) = connect(&hub, "late", 2).await;

        assert_eq!(hub.connection_count().await.unwrap(), 1);
        assert_eq!(drain(&mut mailbox), vec!["m0", "m1"]);

        // Still a member: live traffic arrives once there is room.
        hub.broadcast(message("u2", "live")).await.unwrap();
        hub.connection_count().await.unwrap();
        assert_eq!(drain(&mut mailbox), vec!["live"]);
    }

    #[tokio::test]
    async fn test_history_failure_still_registers_with_empty_backlog() {
        let mut store = MockMessageStore::new();
        store
            .expect_recent()
            .returning(|_, _| Err(AppError::Internal("no such table".into())));
        let hub = spawn_hub(store);

        let (_, mut mailbox) = connect(&hub, "u1", 8).await;

        assert_eq!(hub.connection_count().await.unwrap(), 1);
        assert!(mailbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_consumer_is_evicted_without_blocking_others() {
        let hub = spawn_hub(accepting_store());
        let (_, mut fast) = connect(&hub, "fast", 8).await;
        let (_, mut slow) = connect(&hub, "slow", 1).await;

        for i in 0..3 {
            hub.broadcast(message("u1", &format!("m{}", i))).await.unwrap();
        }
        assert_eq!(hub.connection_count().await.unwrap(), 1);

        let fast_texts: Vec<String> = std::iter::from_fn(|| fast.try_recv().ok())
            .map(|m| m.text.clone())
            .collect();
        assert_eq!(fast_texts, vec!["m0", "m1", "m2"]);

        // The slow consumer keeps what was already queued, then sees the close.
        assert_eq!(slow.recv().await.map(|m| m.text.clone()), Some("m0".to_string()));
        assert_eq!(slow.recv().await, None);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let hub = spawn_hub(accepting_store());
        let (a, _mailbox) = connect(&hub, "a", 8).await;
        let (_, _other) = connect(&hub, "b", 8).await;

        hub.unregister(a).await.unwrap();
        hub.unregister(a).await.unwrap();
        hub.unregister(Uuid::new_v4()).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_consumer_is_removed_on_next_broadcast() {
        let hub = spawn_hub(accepting_store());
        let (_, mailbox) = connect(&hub, "gone", 8).await;
        drop(mailbox);

        hub.broadcast(message("u1", "anyone?")).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_producers_keep_per_producer_order() {
        let hub = spawn_hub(accepting_store());
        let (_, mut observer) = connect(&hub, "observer", 256).await;

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let hub = hub.clone();
                tokio::spawn(async move {
                    for seq in 0..25 {
                        hub.broadcast(message(&format!("p{}", p), &seq.to_string()))
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        hub.connection_count().await.unwrap();

        let mut last_seen: HashMap<String, i32> = HashMap::new();
        let mut total = 0;
        while let Ok(m) = observer.try_recv() {
            let seq: i32 = m.text.parse().unwrap();
            let previous = last_seen.insert(m.user_id.clone(), seq).unwrap_or(-1);
            assert_eq!(seq, previous + 1, "out of order for {}", m.user_id);
            total += 1;
        }
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_shutdown_closes_mailboxes_and_rejects_new_work() {
        let hub = spawn_hub(accepting_store());
        let (_, mut mailbox) = connect(&hub, "a", 8).await;

        hub.shutdown().await;

        assert_eq!(mailbox.recv().await, None);
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(
            hub.register(Uuid::new_v4(), "b", tx).await,
            Err(HubError::Closed)
        ));
        assert!(hub.connection_count().await.is_err());
        // A second shutdown is a no-op.
        hub.shutdown().await;
    }
}
