//! Database Module
//!
//! SQLite connection pool and migrations.

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseSettings;

/// Create a SQLite connection pool
///
/// An in-memory URL gets a single connection that is never recycled, since
/// each SQLite memory connection is its own database.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let options: SqliteConnectOptions = settings.url.parse()?;
    let in_memory = settings.url.contains(":memory:");

    let pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout));

    let pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(settings.max_connections)
    };

    pool_options.connect_with(options.create_if_missing(true)).await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
