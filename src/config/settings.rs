//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (SQLite)
    pub database: DatabaseSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket connection limits and keepalive timing
    pub websocket: WebSocketSettings,

    /// Chat history and retention
    pub chat: ChatSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// SQLite database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL (e.g. `sqlite://forum.db?mode=rwc`)
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum inbound message size in bytes (default: 512)
    pub max_message_size: usize,

    /// Deadline for a single outbound write in seconds (default: 10)
    pub write_wait_secs: u64,

    /// Time allowed between keepalive acknowledgments in seconds (default: 60)
    pub pong_wait_secs: u64,

    /// Outbound mailbox capacity per connection (default: 256)
    pub mailbox_capacity: usize,

    /// Capacity of the hub's command queue (default: 1024)
    pub intake_capacity: usize,
}

/// Chat history and retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// Number of recent messages replayed to a joining connection
    pub history_limit: usize,

    /// Page size used by the history endpoint when none is given
    pub default_page_size: i64,

    /// Upper bound on the history endpoint page size
    pub max_page_size: i64,

    /// Messages older than this many days are removed by the retention sweep
    pub retention_days: i64,

    /// Interval between retention sweeps in seconds
    pub retention_sweep_interval_secs: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the resulting values are inconsistent (see [`Settings::validate`]).
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("database.url", "sqlite://forum.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("jwt.access_token_expiry_minutes", 60)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            // WebSocket settings - bound per-client memory and detect half-open peers
            .set_default("websocket.max_message_size", 512_i64)?
            .set_default("websocket.write_wait_secs", 10_i64)?
            .set_default("websocket.pong_wait_secs", 60_i64)?
            .set_default("websocket.mailbox_capacity", 256_i64)?
            .set_default("websocket.intake_capacity", 1024_i64)?
            .set_default("chat.history_limit", 100_i64)?
            .set_default("chat.default_page_size", 50_i64)?
            .set_default("chat.max_page_size", 100_i64)?
            .set_default("chat.retention_days", 30_i64)?
            .set_default("chat.retention_sweep_interval_secs", 3600_i64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=8081 -> server.port = 8081
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject configurations the chat runtime cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.websocket.mailbox_capacity == 0 || self.websocket.intake_capacity == 0 {
            return Err(ConfigError::Message(
                "websocket mailbox and intake capacities must be non-zero".into(),
            ));
        }
        if self.websocket.ping_period() >= self.websocket.pong_wait() {
            return Err(ConfigError::Message(
                "websocket pong wait is too short to derive a keepalive period".into(),
            ));
        }
        if self.chat.history_limit > self.websocket.mailbox_capacity {
            return Err(ConfigError::Message(format!(
                "chat history limit ({}) cannot exceed the mailbox capacity ({})",
                self.chat.history_limit, self.websocket.mailbox_capacity
            )));
        }
        if self.chat.default_page_size <= 0
            || self.chat.max_page_size < self.chat.default_page_size
        {
            return Err(ConfigError::Message(
                "chat page sizes must satisfy 0 < default_page_size <= max_page_size".into(),
            ));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl WebSocketSettings {
    /// Deadline applied to every outbound write.
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    /// Read deadline, refreshed on every keepalive acknowledgment.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    /// Keepalive probe period: 90% of the pong wait.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            max_message_size: 512,
            write_wait_secs: 10,
            pong_wait_secs: 60,
            mailbox_capacity: 256,
            intake_capacity: 1024,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            default_page_size: 50,
            max_page_size: 100,
            retention_days: 30,
            retention_sweep_interval_secs: 3600,
        }
    }
}

impl ChatSettings {
    /// Age after which messages are removed by the retention sweep.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    /// Interval between retention sweeps.
    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs)
    }
}
