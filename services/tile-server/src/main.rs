//! Coverage tile server.
//!
//! Serves `GET /{z}/{x}/{y}` PNG tiles rendered from the upstream vector
//! tile API.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_server::{metrics, router, Args, TilePipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Arc::new(args.into_config()?);

    if let Some(addr) = config.metrics_listen {
        metrics::install_exporter(addr)?;
    }

    info!(
        upstream = %config.upstream.base_url,
        upstream_z14 = config.upstream.detailed_base_url.as_deref().unwrap_or("-"),
        tile_size = config.tile_size,
        max_clients = config.limits.clients,
        max_network_jobs = config.limits.network,
        max_cpu_jobs = config.limits.cpu,
        max_retries = config.max_retries,
        "Starting tile server"
    );

    let pipeline = Arc::new(TilePipeline::new(config.clone())?);
    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(address = %config.listen, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tile server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
