//! Overlay descriptors and the fold control icon placement.

use dg_core::{Bounds, CellState, Point};
use dg_render::text::{HAlign, VAlign};

/// An image reference with its natural size in unscaled pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub src: String,
    pub width: f64,
    pub height: f64,
}

impl ImageRef {
    pub fn new(src: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            src: src.into(),
            width,
            height,
        }
    }
}

/// A badge drawn on top of a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOverlay {
    pub image: ImageRef,
    pub align: HAlign,
    pub valign: VAlign,
    /// Unscaled offset from the aligned anchor.
    pub offset: Point,
    pub tooltip: Option<String>,
}

impl CellOverlay {
    /// Bottom-right badge, the usual placement for warnings.
    pub fn new(image: ImageRef) -> Self {
        Self {
            image,
            align: HAlign::Right,
            valign: VAlign::Bottom,
            offset: Point::ZERO,
            tooltip: None,
        }
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Screen bounds, centered on the anchor. Vertices anchor on the
    /// aligned side of their bounds; edges on the middle of the route.
    pub fn bounds(&self, state: &CellState, scale: f64) -> Bounds {
        let anchor = if state.is_edge() {
            let pts = &state.absolute_points;
            let n = pts.len();
            match n {
                0 => state.center(),
                _ if n % 2 == 1 => pts[n / 2],
                _ => {
                    let (a, b) = (pts[n / 2 - 1], pts[n / 2]);
                    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
                }
            }
        } else {
            let b = &state.bounds;
            let x = match self.align {
                HAlign::Left => b.x,
                HAlign::Center => b.x + b.width / 2.0,
                HAlign::Right => b.x + b.width,
            };
            let y = match self.valign {
                VAlign::Top => b.y,
                VAlign::Middle => b.y + b.height / 2.0,
                VAlign::Bottom => b.y + b.height,
            };
            Point::new(x, y)
        };
        let w = self.image.width * scale;
        let h = self.image.height * scale;
        Bounds::new(
            (anchor.x - w / 2.0 + self.offset.x * scale).round(),
            (anchor.y - h / 2.0 + self.offset.y * scale).round(),
            w,
            h,
        )
    }
}

/// Bounds of a `w`×`h` fold icon. Vertices place it near the top-left
/// corner, rotated with the shape; edges center it.
pub fn control_bounds(state: &CellState, w: f64, h: f64, scale: f64, rotation: f64) -> Bounds {
    let mut c = state.center();
    if !state.is_edge() {
        c = Point::new(state.bounds.x + w * scale, state.bounds.y + h * scale);
        if rotation != 0.0 {
            let (sin, cos) = rotation.to_radians().sin_cos();
            c = dg_core::geom::rotate_point(c, cos, sin, state.center());
        }
    }
    Bounds::new(
        (c.x - w / 2.0 * scale).round(),
        (c.y - h / 2.0 * scale).round(),
        (w * scale).round(),
        (h * scale).round(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::{CellId, CellKind, Style};
    use pretty_assertions::assert_eq;

    fn state(kind: CellKind) -> CellState {
        CellState {
            cell: CellId::intern("ov"),
            kind,
            style: Style::new(),
            bounds: Bounds::new(10.0, 10.0, 100.0, 50.0),
            origin: Point::ZERO,
            absolute_points: vec![Point::new(0.0, 0.0), Point::new(40.0, 0.0)],
            absolute_offset: Point::ZERO,
            value: None,
            source: None,
            target: None,
            parent: None,
        }
    }

    #[test]
    fn vertex_overlay_centers_on_corner() {
        let o = CellOverlay::new(ImageRef::new("warning.png", 16.0, 16.0));
        assert_eq!(o.bounds(&state(CellKind::Vertex), 1.0), Bounds::new(102.0, 52.0, 16.0, 16.0));
    }

    #[test]
    fn edge_overlay_sits_mid_route() {
        let o = CellOverlay::new(ImageRef::new("x.png", 10.0, 10.0));
        assert_eq!(o.bounds(&state(CellKind::Edge), 2.0), Bounds::new(10.0, -10.0, 20.0, 20.0));
    }

    #[test]
    fn control_follows_top_left_corner() {
        let b = control_bounds(&state(CellKind::Vertex), 9.0, 9.0, 1.0, 0.0);
        assert_eq!(b, Bounds::new(15.0, 15.0, 9.0, 9.0));
        let edge = control_bounds(&state(CellKind::Edge), 9.0, 9.0, 1.0, 0.0);
        assert_eq!(edge.x, 56.0);
    }
}
