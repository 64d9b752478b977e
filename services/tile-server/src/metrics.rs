//! Service metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder
//! these calls are no-ops, so tests and the `render-tile` tool pay nothing.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use renderer::RenderStats;
use tile_common::TileError;

/// Serve Prometheus metrics on a dedicated listener.
///
/// Kept off the tile listener so every path there stays a tile address.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_request() {
    counter!("tile_requests_total").increment(1);
}

pub fn record_error(error: &TileError) {
    counter!("tile_render_errors_total", "kind" => error.kind()).increment(1);
}

pub fn record_fetch_attempt(success: bool) {
    let outcome = if success { "ok" } else { "failed" };
    counter!("tile_fetch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_fetch_duration(elapsed: Duration) {
    histogram!("tile_fetch_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_render(elapsed: Duration, stats: &RenderStats, png_bytes: usize) {
    histogram!("tile_render_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    histogram!("tile_png_bytes").record(png_bytes as f64);
    counter!("tile_features_drawn_total").increment((stats.points + stats.lines) as u64);
    counter!("tile_features_culled_total").increment(stats.culled as u64);
}

pub fn record_renders_in_flight(active: usize) {
    gauge!("tile_renders_in_flight").set(active as f64);
}
