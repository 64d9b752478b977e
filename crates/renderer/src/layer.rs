//! Decoded vector tile content.

/// A position in layer coordinates (0..extent across the tile).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The geometry shapes the renderer knows how to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
    MultiLineString(Vec<Vec<Point>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    /// Captured by a 360° camera.
    pub is_pano: bool,
}

impl Feature {
    pub fn point(x: f64, y: f64, is_pano: bool) -> Self {
        Self {
            geometry: Geometry::Point(Point::new(x, y)),
            is_pano,
        }
    }

    pub fn line(points: &[(f64, f64)], is_pano: bool) -> Self {
        Self {
            geometry: Geometry::LineString(points.iter().map(|&(x, y)| Point::new(x, y)).collect()),
            is_pano,
        }
    }
}

/// A named layer of a vector tile.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub name: String,
    /// Coordinate-space denominator: geometry spans 0..extent across the tile.
    pub extent: u32,
    pub features: Vec<Feature>,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, extent: u32, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            extent,
            features,
        }
    }
}

/// Axis-aligned bounds of a line in layer coordinates.
pub fn line_bounds(line: &[Point]) -> Option<(f64, f64, f64, f64)> {
    let first = line.first()?;
    let init = (first.x, first.y, first.x, first.y);
    Some(line.iter().fold(init, |(min_x, min_y, max_x, max_y), p| {
        (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
    }))
}
