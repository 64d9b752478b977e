//! Drawing surface abstraction.
//!
//! The rasterizer only speaks in terms of [`Canvas`]: pick a color and a
//! stroke style, trace subpaths, stroke. [`SkiaCanvas`] is the tiny-skia
//! backed implementation used to produce tiles.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use tile_common::{TileError, TileResult};

/// Opaque stroke color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// Vector drawing capability consumed by the rasterizer.
///
/// Subpaths accumulate between calls to [`Canvas::stroke`], which commits
/// them with the current color and stroke style and starts a new path.
/// A backend may defer painting committed strokes until the style changes
/// or [`Canvas::flush`] is called; the result must not depend on where
/// `stroke` calls fall.
pub trait Canvas {
    fn set_color(&mut self, color: Rgb);
    fn set_line_width(&mut self, width: f32);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_line_join(&mut self, join: LineJoin);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn stroke(&mut self);

    /// Paint everything committed so far.
    fn flush(&mut self) {}
}

/// tiny-skia canvas with a transparent background and antialiasing on.
///
/// Committed strokes of one style are painted together as a single path
/// when the color or stroke style changes, or on [`Canvas::flush`].
/// Overlapping antialiased edges therefore combine the same way however
/// the rasterizer batches its `stroke` calls.
pub struct SkiaCanvas {
    pixmap: Pixmap,
    paint: Paint<'static>,
    color: Rgb,
    stroke: Stroke,
    /// Subpaths traced since the last `stroke`.
    pending: Vec<Vec<(f32, f32)>>,
    /// Stroked subpaths not yet painted.
    committed: Vec<Vec<(f32, f32)>>,
}

impl SkiaCanvas {
    pub fn new(width: u32, height: u32) -> TileResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            TileError::Render(format!("cannot allocate {}x{} canvas", width, height))
        })?;

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color_rgba8(0, 0, 0, 255);

        Ok(Self {
            pixmap,
            paint,
            color: Rgb(0, 0, 0),
            stroke: Stroke::default(),
            pending: Vec::new(),
            committed: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight (non-premultiplied) RGBA bytes, row-major. Strokes that
    /// have not been flushed are not included.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        rgba
    }
}

impl SkiaCanvas {
    fn paint_committed(&mut self) {
        let subpaths = std::mem::take(&mut self.committed);
        if subpaths.is_empty() {
            return;
        }

        // Zero-length subpaths only show up through their caps. Draw those
        // caps as filled shapes so dots do not depend on stroker heuristics.
        let half_width = self.stroke.width / 2.0;
        let mut strokes = PathBuilder::new();
        let mut caps = PathBuilder::new();

        for subpath in &subpaths {
            let (x0, y0) = subpath[0];
            let degenerate = subpath.iter().all(|&(x, y)| x == x0 && y == y0);
            if degenerate {
                match self.stroke.line_cap {
                    tiny_skia::LineCap::Round => caps.push_circle(x0, y0, half_width),
                    tiny_skia::LineCap::Square => {
                        if let Some(rect) = tiny_skia::Rect::from_xywh(
                            x0 - half_width,
                            y0 - half_width,
                            self.stroke.width,
                            self.stroke.width,
                        ) {
                            caps.push_rect(rect);
                        }
                    }
                    tiny_skia::LineCap::Butt => {}
                }
                continue;
            }

            strokes.move_to(x0, y0);
            for &(x, y) in &subpath[1..] {
                strokes.line_to(x, y);
            }
        }

        if let Some(path) = strokes.finish() {
            self.pixmap
                .stroke_path(&path, &self.paint, &self.stroke, Transform::identity(), None);
        }
        if let Some(path) = caps.finish() {
            self.pixmap
                .fill_path(&path, &self.paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

impl Canvas for SkiaCanvas {
    fn set_color(&mut self, color: Rgb) {
        if color != self.color {
            self.paint_committed();
            self.color = color;
            self.paint.set_color_rgba8(color.0, color.1, color.2, 255);
        }
    }

    fn set_line_width(&mut self, width: f32) {
        if width != self.stroke.width {
            self.paint_committed();
            self.stroke.width = width;
        }
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        let cap = match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        };
        if cap != self.stroke.line_cap {
            self.paint_committed();
            self.stroke.line_cap = cap;
        }
    }

    fn set_line_join(&mut self, join: LineJoin) {
        let join = match join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        };
        if join != self.stroke.line_join {
            self.paint_committed();
            self.stroke.line_join = join;
        }
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.pending.push(vec![(x, y)]);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        match self.pending.last_mut() {
            Some(subpath) => subpath.push((x, y)),
            None => self.pending.push(vec![(x, y)]),
        }
    }

    fn stroke(&mut self) {
        self.committed.append(&mut self.pending);
    }

    fn flush(&mut self) {
        self.stroke();
        self.paint_committed();
    }
}
