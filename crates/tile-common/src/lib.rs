//! Common types shared across the coverage tile crates.

pub mod error;
pub mod tile;
pub mod upstream;

pub use error::{TileError, TileResult};
pub use tile::{resolve, DataTileRef, TileCoord, MAX_DATA_ZOOM, MAX_ZOOM};
pub use upstream::UpstreamConfig;
