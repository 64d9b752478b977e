//! Per-request tile pipeline.
//!
//! resolve → (network permit) fetch → decode → (cpu permit) render + encode.
//! Stages run in order and the first error ends the request.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, instrument};

use renderer::{decode_tile, render_png, RenderParams};
use tile_common::{resolve, TileCoord, TileError, TileResult};

use crate::config::ServiceConfig;
use crate::fetch::{HttpTileSource, TileSource, VectorTileFetcher};
use crate::governor::{ConcurrencyGovernor, Pool};
use crate::metrics;

pub struct TilePipeline {
    config: Arc<ServiceConfig>,
    fetcher: VectorTileFetcher,
    governor: Arc<ConcurrencyGovernor>,
    load: Arc<RenderLoad>,
}

/// Renders running on the blocking pool, and the most seen at once.
#[derive(Debug, Default)]
struct RenderLoad {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RenderLoad {
    fn enter(self: &Arc<Self>) -> ActiveRender {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        metrics::record_renders_in_flight(active);
        ActiveRender(Arc::clone(self))
    }
}

/// Counts as one running render until dropped.
struct ActiveRender(Arc<RenderLoad>);

impl Drop for ActiveRender {
    fn drop(&mut self) {
        let active = self.0.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_renders_in_flight(active);
    }
}

impl TilePipeline {
    /// Pipeline fetching over HTTP.
    pub fn new(config: Arc<ServiceConfig>) -> anyhow::Result<Self> {
        let source = HttpTileSource::new(config.fetch_timeout)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    pub fn with_source(config: Arc<ServiceConfig>, source: Arc<dyn TileSource>) -> Self {
        let fetcher = VectorTileFetcher::new(source, config.max_retries);
        let governor = Arc::new(ConcurrencyGovernor::new(config.limits));
        Self {
            config,
            fetcher,
            governor,
            load: Arc::default(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn governor(&self) -> &Arc<ConcurrencyGovernor> {
        &self.governor
    }

    /// Renders currently executing.
    pub fn renders_in_flight(&self) -> usize {
        self.load.active.load(Ordering::SeqCst)
    }

    /// Highest number of renders that have executed at the same time.
    pub fn peak_renders(&self) -> usize {
        self.load.peak.load(Ordering::SeqCst)
    }

    /// Render one tile to PNG bytes.
    #[instrument(skip(self), fields(tile = %coord))]
    pub async fn render_tile(&self, coord: TileCoord) -> TileResult<Bytes> {
        let tile_size = self.config.tile_size;
        let data_tile = resolve(coord, tile_size)?;
        let url = self.config.upstream.tile_url(&data_tile);
        debug!(
            data_tile = %data_tile.path(),
            scale = data_tile.scale,
            "Resolved data tile"
        );

        let payload = {
            let _permit = self.governor.acquire(Pool::Network).await?;
            let start = Instant::now();
            let result = self.fetcher.fetch(&url).await;
            metrics::record_fetch_duration(start.elapsed());
            result?
        };

        let layers = decode_tile(&payload)?;
        debug!(layers = layers.len(), bytes = payload.len(), "Decoded vector tile");

        let params = RenderParams::for_data_tile(&data_tile, tile_size);
        // The task owns the permit; a dropped request does not stop a
        // render that has started, and the permit lives until it ends.
        let permit = self.governor.acquire(Pool::Cpu).await?;
        let load = Arc::clone(&self.load);
        let start = Instant::now();
        let (png, stats) = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _active = load.enter();
            render_png(&layers, &params)
        })
        .await
        .map_err(|e| TileError::Internal(format!("render task failed: {}", e)))??;

        let elapsed = start.elapsed();
        metrics::record_render(elapsed, &stats, png.len());
        debug!(
            points = stats.points,
            lines = stats.lines,
            culled = stats.culled,
            bytes = png.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered tile"
        );

        Ok(Bytes::from(png))
    }

    /// Render one tile and write it to `path`, returning the PNG size.
    pub async fn render_to_file(&self, coord: TileCoord, path: &Path) -> anyhow::Result<usize> {
        let png = self.render_tile(coord).await?;
        tokio::fs::write(path, &png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(png.len())
    }
}
