//! Slack user sync server.
//!
//! This binary:
//! - Connects to Postgres and creates the users table if needed
//! - Pulls the full member list from Slack when a bot token is configured
//! - Serves the Events API webhook and the user listing endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usersync::{router, sync_users, AppState, Config, PgUserStore, SlackClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("user_sync_starting");

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        db_host = %config.db_host,
        db_name = %config.db_name,
        bot_token_configured = config.bot_token.is_some(),
        signing_secret_configured = config.signing_secret.is_some(),
        "config_loaded"
    );

    let store = PgUserStore::connect(&config)
        .await
        .context("Failed to initialize database")?;

    // A failed initial sync leaves the directory to be filled by events.
    if let Some(bot_token) = &config.bot_token {
        let result = match SlackClient::new(config.slack_api_url.clone(), bot_token.clone()) {
            Ok(client) => sync_users(&client, &store).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "initial_user_sync_failed");
        }
    } else {
        info!("initial_user_sync_skipped");
    }

    let port = config.port;
    let state = AppState::new(config, Arc::new(store.clone()));
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
