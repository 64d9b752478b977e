//! Coverage tile service.
//!
//! Serves `GET /{z}/{x}/{y}` as transparent PNG tiles rendered from an
//! upstream vector tile source. Each request runs through the
//! [`pipeline::TilePipeline`]: resolve, fetch, decode, render, encode. The
//! [`governor::ConcurrencyGovernor`] bounds how many requests, upstream
//! fetches and render jobs run at once.

pub mod config;
pub mod fetch;
pub mod governor;
pub mod handlers;
pub mod metrics;
pub mod pipeline;

pub use config::{Args, ServiceConfig};
pub use fetch::{retry, FetchError, HttpTileSource, TileSource, VectorTileFetcher};
pub use governor::{ConcurrencyGovernor, Pool, PoolLimits, PoolSnapshot};
pub use handlers::{parse_tile_path, router};
pub use pipeline::TilePipeline;
