//! ResQ Daemon - real-time map state hub
//!
//! Holds risk zones, vehicle positions and disaster overlays in memory and
//! pushes every change to connected map clients over WebSocket (`/ws`).
//! Producers update state through the REST API or the simulation relay.

use anyhow::{Context, Result};
use clap::Parser;
use resq_broadcaster::BroadcastHub;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use resq_daemon::cli::Cli;
use resq_daemon::feed::ProcessFeed;
use resq_daemon::server;
use resq_daemon::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    info!("Starting ResQ daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config.config_path.display());
    config.validate().context("Invalid configuration")?;

    let hub = Arc::new(BroadcastHub::new(config.hub.clone()).context("Failed to create hub")?);
    let state = AppState::new(Arc::clone(&hub), config.send_timeout());

    // Simulation process feed
    let feed_task = match &config.relay.feed_command {
        Some(command) => match ProcessFeed::new(command, config.restart_delay()) {
            Some(feed) => Some(tokio::spawn(feed.run(Arc::clone(&state.relay)))),
            None => {
                warn!("relay.feed_command is empty, simulation feed disabled");
                None
            }
        },
        None => None,
    };

    let listener = server::bind(&config.bind_addr).await?;
    let app = server::build_router(state, &config);

    let hub_for_shutdown = Arc::clone(&hub);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
        hub_for_shutdown.shutdown();
    };

    server::serve(listener, app, shutdown).await?;

    // Cleanup
    if let Some(task) = feed_task {
        task.abort();
    }
    hub.shutdown();
    info!("ResQ daemon stopped");

    Ok(())
}
