//! # Forum Chat
//!
//! Entry point for the forum's real-time chat service.
//!
//! Initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - SQLite pool and migrations
//! - Chat hub and retention sweep
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use forum_chat::config::Settings;
use forum_chat::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    forum_chat::telemetry::init_tracing();

    info!("Starting Forum Chat...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
