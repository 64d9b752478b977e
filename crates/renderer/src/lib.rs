//! Rendering for coverage tiles.
//!
//! Turns an upstream vector tile into a PNG:
//! - `decode`: MVT payload to typed layers
//! - `raster`: two-pass categorized drawing onto a [`canvas::Canvas`]
//! - `png`: lossless RGBA encoding

pub mod canvas;
pub mod decode;
pub mod layer;
pub mod png;
pub mod raster;

pub use canvas::{Canvas, LineCap, LineJoin, Rgb, SkiaCanvas};
pub use decode::decode_tile;
pub use layer::{Feature, Geometry, Point, VectorLayer};
pub use png::encode_png;
pub use raster::{render, render_png, RenderParams, RenderStats};
