//! Mapbox Vector Tile decoding.
//!
//! The protobuf wire format is handled by geozero's generated `Tile` types;
//! this module expands the geometry command streams into [`Geometry`] values
//! and extracts the `is_pano` property.

use geozero::mvt::{tile, Message, Tile};

use tile_common::{TileError, TileResult};

use crate::layer::{Feature, Geometry, Point, VectorLayer};

/// Extent assumed when a layer does not declare one.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Property flagging 360° imagery.
const PANO_KEY: &str = "is_pano";

const GEOM_POINT: i32 = 1;
const GEOM_LINESTRING: i32 = 2;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// Decode an MVT payload into layers.
///
/// Polygons and untyped features are dropped; everything else becomes one or
/// more [`Feature`]s in source order.
pub fn decode_tile(data: &[u8]) -> TileResult<Vec<VectorLayer>> {
    let tile = Tile::decode(data).map_err(|e| TileError::Decode(e.to_string()))?;
    tile.layers.iter().map(decode_layer).collect()
}

fn decode_layer(layer: &tile::Layer) -> TileResult<VectorLayer> {
    let extent = layer.extent.unwrap_or(DEFAULT_EXTENT);
    if extent == 0 {
        return Err(TileError::Decode(format!("layer '{}' has zero extent", layer.name)));
    }

    let pano_key = layer.keys.iter().position(|k| k == PANO_KEY);
    let mut features = Vec::with_capacity(layer.features.len());

    for feature in &layer.features {
        let is_pano = match pano_key {
            Some(key) => read_flag(layer, feature, key as u32)?,
            None => false,
        };
        let parts = decode_commands(&feature.geometry)
            .map_err(|e| TileError::Decode(format!("layer '{}': {}", layer.name, e)))?;

        match feature.r#type.unwrap_or(0) {
            GEOM_POINT => {
                // MULTIPOINT arrives as one MoveTo with several points
                features.extend(
                    parts
                        .into_iter()
                        .flatten()
                        .map(|p| Feature { geometry: Geometry::Point(p), is_pano }),
                );
            }
            GEOM_LINESTRING => {
                let geometry = match parts.len() {
                    0 => continue,
                    1 => Geometry::LineString(parts.into_iter().flatten().collect()),
                    _ => Geometry::MultiLineString(parts),
                };
                features.push(Feature { geometry, is_pano });
            }
            _ => continue,
        }
    }

    Ok(VectorLayer {
        name: layer.name.clone(),
        extent,
        features,
    })
}

/// Look up a boolean property through the feature's key/value tag pairs.
fn read_flag(layer: &tile::Layer, feature: &tile::Feature, key: u32) -> TileResult<bool> {
    if feature.tags.len() % 2 != 0 {
        return Err(TileError::Decode(format!(
            "layer '{}': odd number of feature tags",
            layer.name
        )));
    }

    for pair in feature.tags.chunks_exact(2) {
        if pair[0] != key {
            continue;
        }
        let value = layer.values.get(pair[1] as usize).ok_or_else(|| {
            TileError::Decode(format!("layer '{}': tag value {} out of range", layer.name, pair[1]))
        })?;
        return Ok(value_is_truthy(value));
    }
    Ok(false)
}

fn value_is_truthy(value: &tile::Value) -> bool {
    if let Some(b) = value.bool_value {
        return b;
    }
    value
        .int_value
        .or(value.sint_value)
        .map(|v| v != 0)
        .or(value.uint_value.map(|v| v != 0))
        .unwrap_or(false)
}

fn zigzag(n: u32) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Expand a geometry command stream into its parts. Each MoveTo starts a
/// new part; LineTo extends the current one; ClosePath repeats its start.
fn decode_commands(commands: &[u32]) -> Result<Vec<Vec<Point>>, String> {
    let mut parts: Vec<Vec<Point>> = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    let mut i = 0;

    while i < commands.len() {
        let command = commands[i];
        let id = command & 0x7;
        let count = (command >> 3) as usize;
        i += 1;

        match id {
            CMD_MOVE_TO | CMD_LINE_TO => {
                if id == CMD_LINE_TO && parts.is_empty() {
                    return Err("LineTo before MoveTo".to_string());
                }
                let params = commands
                    .get(i..i + count * 2)
                    .ok_or_else(|| format!("truncated geometry at command {}", i - 1))?;
                for delta in params.chunks_exact(2) {
                    x += zigzag(delta[0]);
                    y += zigzag(delta[1]);
                    let point = Point::new(x as f64, y as f64);
                    match parts.last_mut() {
                        Some(part) if id == CMD_LINE_TO => part.push(point),
                        _ => parts.push(vec![point]),
                    }
                }
                i += count * 2;
            }
            CMD_CLOSE_PATH => {
                if let Some(part) = parts.last_mut() {
                    if let Some(&start) = part.first() {
                        part.push(start);
                    }
                }
            }
            other => return Err(format!("unknown geometry command {}", other)),
        }
    }

    Ok(parts)
}
