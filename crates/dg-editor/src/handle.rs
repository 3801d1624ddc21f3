//! Handle identities, hit rectangles, and the overlay layer previews
//! are drawn into.

use dg_core::{Bounds, Color, Point, ShapeDefaults};
use dg_render::shape::{Painter, Shape, ShapeKind};
use dg_render::{Document, NodeRef, TextMeasurer};
use std::sync::Arc;

/// A vertex handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexHandle {
    /// Resize sizer. 0 nw, 1 n, 2 ne, 3 w, 4 e, 5 sw, 6 s, 7 se.
    Sizer(usize),
    Label,
    Rotation,
}

/// An edge handle. `Point(0)` is the source end, the last index the
/// target end, the rest are waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeHandle {
    Point(usize),
    Label,
}

/// Square of side `size` centered on `p`, snapped to whole pixels.
pub fn handle_bounds(p: Point, size: f64) -> Bounds {
    Bounds::new(
        (p.x - size / 2.0).round(),
        (p.y - size / 2.0).round(),
        size,
        size,
    )
}

/// Whether `p` hits `bounds` grown by `tolerance` on every side.
pub fn hit(bounds: &Bounds, p: Point, tolerance: f64) -> bool {
    let mut b = *bounds;
    b.grow(tolerance);
    b.contains(p)
}

/// Square of side `2 * tolerance` around `p`.
pub fn tolerance_rect(p: Point, tolerance: f64) -> Bounds {
    Bounds::new(p.x - tolerance, p.y - tolerance, 2.0 * tolerance, 2.0 * tolerance)
}

pub(crate) fn color(hex: &str) -> Option<Color> {
    Color::parse(hex)
}

// ─── Preview layer ──────────────────────────────────────────────────────

/// Where handles and previews live: the overlay pane of the retained
/// tree plus what painting needs.
pub struct PreviewLayer<'a> {
    pub doc: &'a mut Document,
    pub pane: NodeRef,
    pub measurer: &'a dyn TextMeasurer,
    pub defaults: &'a Arc<ShapeDefaults>,
}

impl PreviewLayer<'_> {
    /// A painted rectangle attached to the pane.
    pub fn rectangle(&mut self, bounds: Bounds, fill: Option<Color>, stroke: Option<Color>) -> Shape {
        let mut shape = Shape::new(Painter::Builtin(ShapeKind::Rectangle), Arc::clone(self.defaults))
            .with_bounds(bounds);
        shape.fill = fill;
        shape.stroke = stroke;
        shape.init(self.doc, self.pane);
        shape.redraw(self.doc, self.measurer);
        shape
    }

    /// A painted image attached to the pane.
    pub fn image(&mut self, src: &str, bounds: Bounds) -> Shape {
        let mut shape =
            Shape::new(Painter::Builtin(ShapeKind::Image), Arc::clone(self.defaults)).with_bounds(bounds);
        shape.image = Some(src.to_string());
        shape.init(self.doc, self.pane);
        shape.redraw(self.doc, self.measurer);
        shape
    }

    /// Attach a prepared shape and paint it.
    pub fn show(&mut self, shape: &mut Shape) {
        shape.init(self.doc, self.pane);
        shape.redraw(self.doc, self.measurer);
    }

    pub fn repaint(&mut self, shape: &mut Shape) {
        shape.redraw(self.doc, self.measurer);
    }

    pub fn remove(&mut self, shape: Option<Shape>) {
        if let Some(mut s) = shape {
            s.destroy(self.doc);
        }
    }

    pub fn remove_all(&mut self, shapes: &mut Vec<Shape>) {
        for mut s in shapes.drain(..) {
            s.destroy(self.doc);
        }
    }
}
