//! `fortune-api` — binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Resolve AWS config and build the DynamoDB client.
//! 4. Ensure the fortune table exists, creating it and waiting until active.
//! 5. Build the Axum router and start the HTTP server.

mod aws;
mod config;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use config::Config;
use server::state::AppState;
use store::{DynamoTable, FortuneStore};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        table = %cfg.table_name,
        "fortune-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. AWS clients
    // -----------------------------------------------------------------------
    let aws = aws::AwsClients::init(cfg.dynamodb_endpoint_url.as_deref()).await?;
    let table = DynamoTable::new(
        aws.dynamodb.clone(),
        cfg.table_name.clone(),
        Duration::from_secs(cfg.table_ready_timeout_secs),
    );

    // -----------------------------------------------------------------------
    // 4. Table provisioning
    // -----------------------------------------------------------------------
    store::ensure_table(&table, table.table_name()).await?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let store: Arc<dyn FortuneStore> = Arc::new(table);
    let router = server::router::build(AppState::new(store), &cfg.allowed_origin)?;

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, allowed_origin = %cfg.allowed_origin, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
