//! # Parcel Hub
//!
//! Shipping and logistics backend for multi-tenant sellers.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Webhook job queue and workers
//! - HTTP server

use anyhow::Result;
use tracing::info;

use parcel_hub::config::Settings;
use parcel_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    parcel_hub::telemetry::init_tracing();

    info!("Starting Parcel Hub...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Shutdown complete");
    Ok(())
}
