//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::time::Duration;

use axum_test::TestServer;
use chrono::{DateTime, Utc};

use forum_chat::config::{
    ChatSettings, CorsSettings, DatabaseSettings, JwtSettings, ServerSettings, Settings,
    WebSocketSettings,
};
use forum_chat::domain::{ChatMessage, ChatMessageRequest};
use forum_chat::infrastructure::database;
use forum_chat::startup::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only-32b";

/// Settings for an isolated in-memory instance
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout: 5,
        },
        jwt: JwtSettings {
            secret: TEST_JWT_SECRET.into(),
            access_token_expiry_minutes: 15,
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings::default(),
        chat: ChatSettings::default(),
        environment: "test".into(),
    }
}

/// Test application: a real router over an in-memory store, served on a
/// loopback port so WebSocket upgrades work.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let pool = database::create_pool(&settings.database)
            .await
            .expect("Failed to create test database");
        database::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let (state, hub) = AppState::new(settings, pool);
        tokio::spawn(hub.run());

        let server = TestServer::builder()
            .http_transport()
            .build(build_router(state.clone()))
            .expect("Failed to create test server");

        Self { server, state }
    }

    /// Access token for `user_id`, signed with the test secret
    pub fn token(&self, user_id: &str) -> String {
        self.state
            .auth
            .issue_token(user_id)
            .expect("Failed to issue token")
            .access_token
    }

    /// Insert a message directly into the store
    pub async fn seed(&self, user_id: &str, text: &str, created_at: DateTime<Utc>) -> ChatMessage {
        let mut message = ChatMessage::new(ChatMessageRequest { text: text.into() }, user_id);
        message.created_at = created_at;
        self.state
            .store
            .save(&message)
            .await
            .expect("Failed to seed message");
        message
    }

    /// Wait until the hub reports exactly `expected` connections
    pub async fn wait_for_connections(&self, expected: usize) {
        for _ in 0..200 {
            if self.state.hub.connection_count().await.ok() == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("hub never reached {} connections", expected);
    }
}
