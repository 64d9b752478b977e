//! Two-pass categorized rasterization of coverage layers.
//!
//! Every layer set is drawn twice: first the regular (non-panoramic)
//! features, then the panoramic ones, so panoramic markers end up on top
//! wherever both overlap. The layer name decides how features are drawn:
//!
//! | Layer      | Shape  | Size                                |
//! |------------|--------|-------------------------------------|
//! | `overview` | points | radius 6, all features in pass one  |
//! | `image`    | points | radius 6                            |
//! | `sequence` | lines  | width 2 at data zoom 14, 6 below it |
//!
//! Other layers are ignored.

use tracing::debug;

use tile_common::{DataTileRef, TileResult};

use crate::canvas::{Canvas, LineCap, LineJoin, Rgb, SkiaCanvas};
use crate::layer::{line_bounds, Feature, Geometry, Point, VectorLayer};
use crate::png::encode_png;

/// Color of regular images and sequences.
pub const NON_PANO_COLOR: Rgb = Rgb(0, 100, 0);

/// Color of panoramic images and sequences.
pub const PANO_COLOR: Rgb = Rgb(50, 205, 50);

pub const POINT_RADIUS: f64 = 6.0;
pub const DETAILED_LINE_WIDTH: f64 = 2.0;
pub const COARSE_LINE_WIDTH: f64 = 6.0;

const OVERVIEW_LAYER: &str = "overview";

/// Primitives traced before the pending path is stroked.
const STROKE_BATCH: usize = 100;

/// Placement of a data tile on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub tile_size: u32,
    pub scale: u32,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Data zoom is the source's maximum zoom.
    pub detailed: bool,
    /// Requested zoom is beyond the data zoom; enables culling.
    pub overzoomed: bool,
}

impl RenderParams {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            scale: 1,
            offset_x: 0.0,
            offset_y: 0.0,
            detailed: false,
            overzoomed: false,
        }
    }

    pub fn for_data_tile(data_tile: &DataTileRef, tile_size: u32) -> Self {
        Self {
            tile_size,
            scale: data_tile.scale,
            offset_x: data_tile.raster_offset_x as f64,
            offset_y: data_tile.raster_offset_y as f64,
            detailed: data_tile.is_detailed(),
            overzoomed: data_tile.is_overzoomed(),
        }
    }

    fn pixel_scale(&self, extent: u32) -> f64 {
        (self.tile_size as f64 * self.scale as f64) / extent as f64
    }
}

/// Counters gathered while drawing, used for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub points: usize,
    pub lines: usize,
    /// Features skipped because they fall outside the visible region.
    pub culled: usize,
    /// Features whose geometry does not fit the layer's drawing rule.
    pub skipped: usize,
}

/// Feature category drawn by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Regular,
    Panoramic,
}

impl Pass {
    const ORDER: [Pass; 2] = [Pass::Regular, Pass::Panoramic];

    fn color(self) -> Rgb {
        match self {
            Pass::Regular => NON_PANO_COLOR,
            Pass::Panoramic => PANO_COLOR,
        }
    }

    /// The aggregate `overview` layer is drawn whole in the regular pass;
    /// its panoramic markers are drawn again on top in the second pass.
    fn accepts(self, layer: &str, feature: &Feature) -> bool {
        match self {
            Pass::Regular => layer == OVERVIEW_LAYER || !feature.is_pano,
            Pass::Panoramic => feature.is_pano,
        }
    }
}

/// How a layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LayerStyle {
    Points { radius: f64 },
    Lines { width: f64 },
}

impl LayerStyle {
    fn for_layer(name: &str, detailed: bool) -> Option<Self> {
        match name {
            OVERVIEW_LAYER | "image" => Some(LayerStyle::Points {
                radius: POINT_RADIUS,
            }),
            "sequence" => Some(LayerStyle::Lines {
                width: if detailed {
                    DETAILED_LINE_WIDTH
                } else {
                    COARSE_LINE_WIDTH
                },
            }),
            _ => None,
        }
    }

    /// Distance a primitive reaches beyond its geometry, in pixels.
    fn reach(self) -> f64 {
        match self {
            LayerStyle::Points { radius } => radius,
            LayerStyle::Lines { width } => width / 2.0,
        }
    }
}

/// Layer-to-canvas coordinate mapping.
#[derive(Debug, Clone, Copy)]
struct Projection {
    pixel_scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    fn apply(&self, p: Point) -> (f32, f32) {
        (
            (p.x * self.pixel_scale + self.offset_x) as f32,
            (p.y * self.pixel_scale + self.offset_y) as f32,
        )
    }
}

/// Visible canvas region back-projected into layer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CullBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl CullBox {
    /// Region of layer space that lands on the canvas, padded by `reach`
    /// pixels so strokes centered just outside the edge still get drawn.
    fn visible(params: &RenderParams, projection: &Projection, reach: f64) -> Self {
        let size = params.tile_size as f64;
        let s = projection.pixel_scale;
        Self {
            min_x: (-projection.offset_x - reach) / s,
            min_y: (-projection.offset_y - reach) / s,
            max_x: (size - projection.offset_x + reach) / s,
            max_y: (size - projection.offset_y + reach) / s,
        }
    }

    fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    fn intersects(&self, line: &[Point]) -> bool {
        match line_bounds(line) {
            Some((min_x, min_y, max_x, max_y)) => {
                min_x <= self.max_x && max_x >= self.min_x && min_y <= self.max_y && max_y >= self.min_y
            }
            None => false,
        }
    }
}

/// Strokes the pending path every [`STROKE_BATCH`] primitives. Where the
/// canvas paints is its own concern; batch boundaries must not show up in
/// the pixels.
struct Batch<'a, C: Canvas> {
    canvas: &'a mut C,
    pending: usize,
}

impl<'a, C: Canvas> Batch<'a, C> {
    fn new(canvas: &'a mut C) -> Self {
        Self { canvas, pending: 0 }
    }

    fn added(&mut self, primitives: usize) {
        self.pending += primitives;
        if self.pending > STROKE_BATCH {
            self.canvas.stroke();
            self.pending = 0;
        }
    }

    fn finish(self) {
        self.canvas.stroke();
    }
}

/// Draw all recognised layers onto `canvas`.
pub fn render<C: Canvas>(layers: &[VectorLayer], params: &RenderParams, canvas: &mut C) -> RenderStats {
    let mut stats = RenderStats::default();

    for pass in Pass::ORDER {
        canvas.set_color(pass.color());
        for layer in layers {
            let Some(style) = LayerStyle::for_layer(&layer.name, params.detailed) else {
                continue;
            };
            if layer.extent == 0 {
                continue;
            }

            let projection = Projection {
                pixel_scale: params.pixel_scale(layer.extent),
                offset_x: params.offset_x,
                offset_y: params.offset_y,
            };
            let cull = params
                .overzoomed
                .then(|| CullBox::visible(params, &projection, style.reach()));
            let features = layer
                .features
                .iter()
                .filter(|f| pass.accepts(&layer.name, f));

            match style {
                LayerStyle::Points { radius } => {
                    draw_points(canvas, features, radius, &projection, cull.as_ref(), &mut stats)
                }
                LayerStyle::Lines { width } => {
                    draw_lines(canvas, features, width, &projection, cull.as_ref(), &mut stats)
                }
            }
        }
    }
    canvas.flush();

    debug!(
        points = stats.points,
        lines = stats.lines,
        culled = stats.culled,
        skipped = stats.skipped,
        "Rendered layers"
    );
    stats
}

fn draw_points<'f, C: Canvas>(
    canvas: &mut C,
    features: impl Iterator<Item = &'f Feature>,
    radius: f64,
    projection: &Projection,
    cull: Option<&CullBox>,
    stats: &mut RenderStats,
) {
    canvas.set_line_width((radius * 2.0) as f32);
    canvas.set_line_cap(LineCap::Round);

    let mut batch = Batch::new(canvas);
    for feature in features {
        let &Geometry::Point(point) = &feature.geometry else {
            stats.skipped += 1;
            continue;
        };
        if cull.is_some_and(|b| !b.contains(point)) {
            stats.culled += 1;
            continue;
        }

        let (x, y) = projection.apply(point);
        batch.canvas.move_to(x, y);
        batch.canvas.line_to(x, y);
        stats.points += 1;
        batch.added(1);
    }
    batch.finish();
}

fn draw_lines<'f, C: Canvas>(
    canvas: &mut C,
    features: impl Iterator<Item = &'f Feature>,
    width: f64,
    projection: &Projection,
    cull: Option<&CullBox>,
    stats: &mut RenderStats,
) {
    canvas.set_line_width(width as f32);
    canvas.set_line_cap(LineCap::Round);
    canvas.set_line_join(LineJoin::Round);

    let mut batch = Batch::new(canvas);
    for feature in features {
        match &feature.geometry {
            Geometry::LineString(line) => {
                trace_line(&mut batch, line, projection, cull, stats);
            }
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    trace_line(&mut batch, line, projection, cull, stats);
                }
            }
            Geometry::Point(_) => stats.skipped += 1,
        }
    }
    batch.finish();
}

fn trace_line<C: Canvas>(
    batch: &mut Batch<'_, C>,
    line: &[Point],
    projection: &Projection,
    cull: Option<&CullBox>,
    stats: &mut RenderStats,
) {
    let Some((&first, rest)) = line.split_first() else {
        return;
    };
    if cull.is_some_and(|b| !b.intersects(line)) {
        stats.culled += 1;
        return;
    }

    let (x, y) = projection.apply(first);
    batch.canvas.move_to(x, y);
    if rest.is_empty() {
        // Single-vertex line: leave a dot rather than nothing
        batch.canvas.line_to(x, y);
    }
    for &p in rest {
        let (x, y) = projection.apply(p);
        batch.canvas.line_to(x, y);
    }
    stats.lines += 1;
    batch.added(rest.len().max(1));
}

/// Render layers onto a fresh transparent canvas and encode it as PNG.
pub fn render_png(layers: &[VectorLayer], params: &RenderParams) -> TileResult<(Vec<u8>, RenderStats)> {
    let mut canvas = SkiaCanvas::new(params.tile_size, params.tile_size)?;
    let stats = render(layers, params, &mut canvas);
    let png = encode_png(&canvas)?;
    Ok((png, stats))
}
