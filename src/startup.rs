//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{middleware, Router};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;

use crate::application::services::{
    run_retention_sweep, AuthService, ChatService, ChatServiceImpl, JwtAuthService,
};
use crate::config::Settings;
use crate::domain::MessageStore;
use crate::infrastructure::database;
use crate::infrastructure::repositories::SqliteChatRepository;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{Hub, HubHandle};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub chat: Arc<dyn ChatService>,
    pub auth: Arc<dyn AuthService>,
    pub hub: HubHandle,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire services around a migrated pool.
    ///
    /// The returned [`Hub`] is not running yet; spawn [`Hub::run`] before
    /// serving requests.
    pub fn new(settings: Settings, db: SqlitePool) -> (Self, Hub) {
        let store: Arc<dyn MessageStore> = Arc::new(SqliteChatRepository::new(db.clone()));

        let (hub, hub_handle) = Hub::new(
            store.clone(),
            settings.chat.history_limit,
            settings.websocket.intake_capacity,
        );

        let state = Self {
            chat: Arc::new(ChatServiceImpl::new(store.clone(), settings.chat.clone())),
            auth: Arc::new(JwtAuthService::new(&settings.jwt)),
            hub: hub_handle,
            store,
            settings: Arc::new(settings),
        };

        (state, hub)
    }
}

/// Router with tracing, metrics and CORS layers applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);

    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(logging::create_trace_layer())
            .layer(cors)
            .layer(middleware::from_fn(logging::track_metrics)),
    )
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
    hub_task: JoinHandle<()>,
    retention_task: JoinHandle<()>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        database::run_migrations(&db).await?;
        tracing::info!("Database ready");

        let (state, hub) = AppState::new(settings.clone(), db);
        let hub_task = tokio::spawn(hub.run());

        let retention_task = tokio::spawn(run_retention_sweep(
            state.chat.clone(),
            settings.chat.retention(),
            settings.chat.retention_sweep_interval(),
        ));

        let router = build_router(state.clone());

        // Bind to address
        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
            hub_task,
            retention_task,
        })
    }

    /// Run the server until a shutdown signal arrives.
    ///
    /// On shutdown the hub is stopped first, which closes every chat
    /// connection, then in-flight HTTP requests are drained.
    pub async fn run_until_stopped(self) -> Result<()> {
        let hub = self.state.hub.clone();

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, closing chat connections");
                hub.shutdown().await;
            })
            .await?;

        self.retention_task.abort();
        self.state.hub.shutdown().await;
        let _ = self.hub_task.await;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
