//! Acupuncture Booking - Main Application Entry Point
//!
//! A booking page that takes a customer's name, email and appointment time,
//! charges the session through Stripe, and keeps user rows in PostgreSQL.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Payments**: Stripe REST API via reqwest
//! - **Format**: HTML booking page, JSON API
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables (fatal on error)
//! 2. Create database connection pool
//! 3. Probe connectivity and run migrations when reachable
//! 4. Build HTTP router with routes and middleware
//! 5. Serve until Ctrl-C / SIGTERM, then close the pool

mod app;
mod booking;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
#[cfg(test)]
mod testutils;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    app::AppState,
    booking::session::SessionStore,
    services::{payment_service::StripeClient, store::PgBookingStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    let booking = config.booking()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database());
    tracing::info!("Database pool created");

    // A failed probe is not fatal; the pool reconnects on demand
    if db::check_connection(&pool).await {
        db::run_migrations(&pool).await?;
        tracing::info!("Database migrations complete");
    } else {
        tracing::warn!("Skipping migrations until the database is reachable");
    }

    let payments = StripeClient::new(&config.stripe_api_base, &config.stripe_secret_key)?;
    if booking.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; /api/webhooks/stripe will answer 503");
    }

    let state = AppState {
        store: Arc::new(PgBookingStore::new(pool.clone())),
        payments: Arc::new(payments),
        sessions: SessionStore::default(),
        booking: Arc::new(booking),
    };
    let app = app::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Database pool closed");

    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
