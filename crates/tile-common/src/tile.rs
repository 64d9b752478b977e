//! Tile addressing and overzoom resolution.
//!
//! Requested tiles live in the standard XYZ quad-tree. The upstream vector
//! source only serves data down to [`MAX_DATA_ZOOM`]; deeper tiles are drawn
//! by magnifying the covering data tile and shifting it so the requested
//! sub-region lands on the canvas.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TileError, TileResult};

/// Deepest zoom level a client may request.
pub const MAX_ZOOM: u32 = 22;

/// Deepest zoom level the upstream vector source serves.
pub const MAX_DATA_ZOOM: u32 = 14;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at this zoom, if the zoom is servable.
    fn matrix_size(&self) -> Option<u32> {
        if self.z > MAX_ZOOM {
            return None;
        }
        Some(1u32 << self.z)
    }

    /// True when the zoom is servable and x/y fall inside the quad-tree.
    pub fn is_valid(&self) -> bool {
        match self.matrix_size() {
            Some(n) => self.x < n && self.y < n,
            None => false,
        }
    }

    /// Check validity, producing the error the HTTP layer reports as 404.
    pub fn validate(&self) -> TileResult<()> {
        if self.z > MAX_ZOOM {
            return Err(TileError::InvalidTile(format!(
                "zoom {} is too big (max {})",
                self.z, MAX_ZOOM
            )));
        }
        if !self.is_valid() {
            return Err(TileError::InvalidTile(format!(
                "{} is outside the tile matrix",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// The upstream data tile that covers a requested tile, plus where its
/// content has to be placed on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTileRef {
    pub data_z: u32,
    pub data_x: u32,
    pub data_y: u32,
    /// Magnification factor, `2^(z - 14)` when overzoomed, otherwise 1.
    pub scale: u32,
    /// Pixel displacement of the magnified data tile on the output canvas.
    pub raster_offset_x: i64,
    pub raster_offset_y: i64,
}

impl DataTileRef {
    /// The data tile is at the source's maximum zoom; sequences are drawn thin.
    pub fn is_detailed(&self) -> bool {
        self.data_z == MAX_DATA_ZOOM
    }

    /// The requested tile is deeper than the data, so content is magnified.
    pub fn is_overzoomed(&self) -> bool {
        self.scale > 1
    }

    /// Data tile path component, `z/x/y`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.data_z, self.data_x, self.data_y)
    }

    /// Build the upstream request URL. The token is only appended when set.
    pub fn url(&self, base_url: &str, access_token: Option<&str>) -> String {
        let mut url = format!("{}/{}", base_url.trim_end_matches('/'), self.path());
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            url.push_str("?access_token=");
            url.push_str(token);
        }
        url
    }
}

/// Map a requested tile onto the data tile that has to be fetched.
///
/// Tiles up to zoom 14 map onto themselves. Deeper tiles use their zoom-14
/// ancestor, magnified by `scale` and shifted by a negative raster offset so
/// that only the requested quadrant is visible on a `tile_size` canvas.
pub fn resolve(tile: TileCoord, tile_size: u32) -> TileResult<DataTileRef> {
    tile.validate()?;

    if tile.z <= MAX_DATA_ZOOM {
        return Ok(DataTileRef {
            data_z: tile.z,
            data_x: tile.x,
            data_y: tile.y,
            scale: 1,
            raster_offset_x: 0,
            raster_offset_y: 0,
        });
    }

    let offset_z = tile.z - MAX_DATA_ZOOM;
    let scale = 1u32 << offset_z;
    let data_x = tile.x / scale;
    let data_y = tile.y / scale;
    let size = tile_size as i64;

    Ok(DataTileRef {
        data_z: MAX_DATA_ZOOM,
        data_x,
        data_y,
        scale,
        raster_offset_x: -size * (tile.x - data_x * scale) as i64,
        raster_offset_y: -size * (tile.y - data_y * scale) as i64,
    })
}
