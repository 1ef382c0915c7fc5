mod admin;
mod bootstrap;
mod closing;
mod health;
mod state;
#[cfg(test)]
mod testing;
mod tickets;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use axum::Router;

use cashdesk_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use cashdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn router(app: &bootstrap::Application) -> Router {
    Router::new()
        .merge(closing::router(app.state.clone()))
        .merge(admin::router(app.state.clone()))
        .merge(tickets::router(app.state.clone()))
        .merge(health::router(app.db_pool.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "cashdesk-server started"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = std::pin::pin!(axum::serve(listener, router(&app))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .into_future());

    tokio::select! {
        result = server.as_mut() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "cashdesk-server stopping"
            );
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(grace, server.as_mut()).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        event_name = "system.server.shutdown_timeout",
                        correlation_id = "shutdown",
                        grace_secs = grace.as_secs(),
                        "grace period elapsed with requests still in flight"
                    );
                }
            }
        }
    }

    Ok(())
}
