use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trip_atlas::api;
use trip_atlas::config::Config;
use trip_atlas::db::init_database;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,trip_atlas=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    Config::init()?;
    info!("Initialized configuration");

    // Initialize database
    let db = Arc::new(init_database().await?);
    info!("Connected to database");

    // Start API server
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::start_api_server(db).await {
            error!("API server error: {}", e);
        }
    });

    // Handle shutdown signals
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, shutting down"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    api_handle.abort();
    info!("Trip Atlas shutdown complete");
    Ok(())
}
