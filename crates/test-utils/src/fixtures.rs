//! MVT fixtures for decoder, renderer and server tests.
//!
//! Payloads are built with geozero's protobuf types so tests exercise the
//! same wire format the upstream tile API serves.

use geozero::mvt::{tile, Message, Tile};

const GEOM_POINT: i32 = 1;
const GEOM_LINESTRING: i32 = 2;
const GEOM_POLYGON: i32 = 3;

fn zigzag(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

fn command(id: u32, count: usize) -> u32 {
    (id & 0x7) | ((count as u32) << 3)
}

/// Encode parts as MoveTo/LineTo command runs with cursor-relative deltas.
fn encode_parts(parts: &[&[(i32, i32)]]) -> Vec<u32> {
    let mut out = Vec::new();
    let (mut cx, mut cy) = (0, 0);
    for part in parts {
        let Some((&(x0, y0), rest)) = part.split_first() else {
            continue;
        };
        out.extend([command(1, 1), zigzag(x0 - cx), zigzag(y0 - cy)]);
        (cx, cy) = (x0, y0);
        if !rest.is_empty() {
            out.push(command(2, rest.len()));
            for &(x, y) in rest {
                out.extend([zigzag(x - cx), zigzag(y - cy)]);
                (cx, cy) = (x, y);
            }
        }
    }
    out
}

/// Builder for one vector tile layer.
#[derive(Debug, Clone)]
pub struct MvtLayer {
    layer: tile::Layer,
}

impl MvtLayer {
    pub fn new(name: &str) -> Self {
        Self {
            layer: tile::Layer {
                version: 2,
                name: name.to_string(),
                keys: vec!["is_pano".to_string()],
                values: vec![
                    tile::Value {
                        bool_value: Some(false),
                        ..Default::default()
                    },
                    tile::Value {
                        bool_value: Some(true),
                        ..Default::default()
                    },
                ],
                extent: Some(4096),
                ..Default::default()
            },
        }
    }

    pub fn extent(mut self, extent: u32) -> Self {
        self.layer.extent = Some(extent);
        self
    }

    /// Leave the extent field unset so decoders fall back to the default.
    pub fn without_extent(mut self) -> Self {
        self.layer.extent = None;
        self
    }

    fn push(mut self, geom_type: i32, geometry: Vec<u32>, tags: Vec<u32>) -> Self {
        self.layer.features.push(tile::Feature {
            tags,
            r#type: Some(geom_type),
            geometry,
            ..Default::default()
        });
        self
    }

    fn pano_tags(is_pano: bool) -> Vec<u32> {
        vec![0, is_pano as u32]
    }

    pub fn point(self, x: i32, y: i32, is_pano: bool) -> Self {
        self.push(GEOM_POINT, encode_parts(&[&[(x, y)]]), Self::pano_tags(is_pano))
    }

    /// A point feature without any properties.
    pub fn untagged_point(self, x: i32, y: i32) -> Self {
        self.push(GEOM_POINT, encode_parts(&[&[(x, y)]]), Vec::new())
    }

    pub fn multi_point(self, points: &[(i32, i32)], is_pano: bool) -> Self {
        let Some(&(x0, y0)) = points.first() else {
            return self;
        };
        let mut geometry = vec![command(1, points.len()), zigzag(x0), zigzag(y0)];
        for pair in points.windows(2) {
            geometry.extend([zigzag(pair[1].0 - pair[0].0), zigzag(pair[1].1 - pair[0].1)]);
        }
        self.push(GEOM_POINT, geometry, Self::pano_tags(is_pano))
    }

    pub fn line(self, points: &[(i32, i32)], is_pano: bool) -> Self {
        self.push(GEOM_LINESTRING, encode_parts(&[points]), Self::pano_tags(is_pano))
    }

    pub fn multi_line(self, lines: &[&[(i32, i32)]], is_pano: bool) -> Self {
        self.push(GEOM_LINESTRING, encode_parts(lines), Self::pano_tags(is_pano))
    }

    pub fn polygon(self, ring: &[(i32, i32)]) -> Self {
        let mut geometry = encode_parts(&[ring]);
        geometry.push(command(7, 1));
        self.push(GEOM_POLYGON, geometry, Vec::new())
    }

    /// Attach a raw feature, for malformed-geometry cases.
    pub fn raw_feature(self, geom_type: i32, geometry: Vec<u32>, tags: Vec<u32>) -> Self {
        self.push(geom_type, geometry, tags)
    }
}

/// Encode layers into an MVT payload.
pub fn encode_tile(layers: Vec<MvtLayer>) -> Vec<u8> {
    Tile {
        layers: layers.into_iter().map(|l| l.layer).collect(),
    }
    .encode_to_vec()
}

/// A tile with a single non-panoramic image at the tile origin.
pub fn origin_image_tile() -> Vec<u8> {
    encode_tile(vec![MvtLayer::new("image").point(0, 0, false)])
}

/// Bytes that are not a valid protobuf message.
pub fn malformed_tile() -> Vec<u8> {
    vec![0x1a, 0xff, 0xff, 0xff, 0xff, 0x0f, 0x01]
}
