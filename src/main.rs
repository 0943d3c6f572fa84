mod config;
mod context;
mod ecs;
mod game;
mod metrics;
mod net;
mod room;
mod util;

use std::sync::Arc;

use tracing::{error, info, Level};

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::net::listener::Listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Novastrike Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        anyhow::bail!("invalid configuration: {e}");
    }
    info!(
        "Configuration loaded: {}:{}, tick_rate={} Hz, rooms<={} x {} slots",
        config.bind_address, config.port, config.tick_rate, config.max_rooms, config.room_capacity
    );

    // Process-scoped context; everything downstream borrows from here.
    let ctx = Arc::new(ServerContext::new(config));

    let listener = Listener::bind(ctx.clone()).await?;
    info!("Server ready on udp://{}", listener.local_addr()?);

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    // Run server with graceful shutdown
    tokio::select! {
        result = listener.run() => {
            if let Err(e) = result {
                error!("Listener error: {e}");
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Server stopped: {}", ctx.metrics.to_json());
    Ok(())
}
