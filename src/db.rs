//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating the PostgreSQL connection pool from the five connection settings
//! - Probing connectivity once at startup
//! - Running database migrations

use std::time::Duration;

use sqlx::{
    Pool, Postgres,
    postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::config::DatabaseSettings;

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

pub const MAX_CONNECTIONS: u32 = 10;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the PostgreSQL connection pool.
///
/// Connections are opened lazily, so building the pool never touches the
/// network. Invalid settings are rejected earlier, when the configuration is
/// deserialized, which is what makes a broken configuration fatal at startup.
///
/// # Configuration
///
/// - Maximum connections: 10
/// - Idle connections are closed after 30 seconds
/// - Waiting for a connection gives up after 2 seconds
pub fn create_pool(settings: &DatabaseSettings) -> DbPool {
    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.database);

    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .idle_timeout(IDLE_TIMEOUT)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy_with(options)
}

/// One-shot connectivity probe.
///
/// A failure is logged and reported as `false`; the pool stays usable and
/// will retry the connection on the next query.
pub async fn check_connection(pool: &DbPool) -> bool {
    match pool.acquire().await {
        Ok(_conn) => {
            tracing::info!("Connected to PostgreSQL database");
            true
        }
        Err(e) => {
            tracing::error!("Error connecting to PostgreSQL database: {}", e);
            false
        }
    }
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each one runs only once.
///
/// # Errors
///
/// Returns an error if:
/// - SQL syntax errors in migration files
/// - Database errors during migration execution
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}
