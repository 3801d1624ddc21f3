//! Built-in edge painters: polylines, connectors with markers, straight
//! lines and wide arrows. Points are unscaled.

use super::marker::{create_marker, Marker};
use super::{Shape, ShapeKind};
use crate::canvas::Canvas2D;
use dg_core::Point;

const ARROW_SPACING: f64 = 10.0;
const ARROW_WIDTH: f64 = 30.0;
const ARROW_SIZE: f64 = 30.0;

pub(crate) fn paint_edge_shape(kind: ShapeKind, c: &mut dyn Canvas2D, shape: &Shape, pts: &[Point]) {
    match kind {
        ShapeKind::Connector => paint_connector(c, shape, pts),
        ShapeKind::Arrow => paint_arrow(c, pts),
        ShapeKind::Line => {
            if let (Some(first), Some(last)) = (pts.first(), pts.last()) {
                c.begin();
                c.move_to(first.x, first.y);
                c.line_to(last.x, last.y);
                c.stroke();
            }
        }
        _ => paint_polyline(c, shape, pts),
    }
}

/// Stroke the points, rounded or curved per the shape's style.
pub fn paint_polyline(c: &mut dyn Canvas2D, shape: &Shape, pts: &[Point]) {
    if pts.len() < 2 {
        return;
    }
    if shape.curved {
        paint_curved_line(c, pts);
    } else {
        let arc = shape.arc_size.unwrap_or(shape.defaults.line_arc_size) / 2.0;
        c.begin();
        add_points(c, pts, shape.rounded, arc);
        c.stroke();
    }
}

fn paint_connector(c: &mut dyn Canvas2D, shape: &Shape, pts: &[Point]) {
    let mut pts = pts.to_vec();
    let sw = shape.stroke_width;
    let source: Option<Marker> = create_marker(
        shape.start_arrow.as_deref(),
        &mut pts,
        true,
        shape.start_size,
        sw,
        shape.start_fill,
    );
    let target: Option<Marker> = create_marker(
        shape.end_arrow.as_deref(),
        &mut pts,
        false,
        shape.end_size,
        sw,
        shape.end_fill,
    );
    paint_polyline(c, shape, &pts);

    if source.is_some() || target.is_some() {
        c.set_fill_color(shape.stroke);
        c.set_shadow(false);
        c.set_dashed(false);
        for marker in source.iter().chain(target.iter()) {
            marker.paint(c);
        }
    }
}

/// Quadratic segments through the midpoints of interior points.
fn paint_curved_line(c: &mut dyn Canvas2D, pts: &[Point]) {
    let n = pts.len();
    c.begin();
    c.move_to(pts[0].x, pts[0].y);
    for i in 1..n.saturating_sub(2) {
        let (p0, p1) = (pts[i], pts[i + 1]);
        c.quad_to(p0.x, p0.y, (p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);
    }
    let (p0, p1) = (pts[n - 2], pts[n - 1]);
    c.quad_to(p0.x, p0.y, p1.x, p1.y);
    c.stroke();
}

/// Line through `pts`; interior corners are cut back by up to `arc` and
/// joined with a quadratic curve when `rounded`.
pub(crate) fn add_points(c: &mut dyn Canvas2D, pts: &[Point], rounded: bool, arc: f64) {
    let Some(&first) = pts.first() else {
        return;
    };
    let Some(&pe) = pts.last() else {
        return;
    };
    let mut pt = first;
    c.move_to(pt.x, pt.y);

    for i in 1..pts.len() - 1 {
        let tmp = pts[i];
        let d = pt - tmp;
        if rounded && (d.x != 0.0 || d.y != 0.0) {
            let dist = d.hypot();
            let n1 = d * (arc.min(dist / 2.0) / dist);
            let p1 = tmp + n1;
            c.line_to(p1.x, p1.y);

            // Skip duplicates to find the outgoing direction.
            let next = pts[i + 1..]
                .iter()
                .copied()
                .find(|p| *p != tmp)
                .unwrap_or(pe);
            let d2 = next - tmp;
            let dist2 = d2.hypot().max(1.0);
            let n2 = d2 * (arc.min(dist2 / 2.0) / dist2);
            let p2 = tmp + n2;
            c.quad_to(tmp.x, tmp.y, p2.x, p2.y);
            pt = p2;
        } else {
            c.line_to(tmp.x, tmp.y);
            pt = tmp;
        }
    }
    c.line_to(pe.x, pe.y);
}

/// Wide block arrow from the first to the last point.
fn paint_arrow(c: &mut dyn Canvas2D, pts: &[Point]) {
    let (Some(&p0), Some(&pe)) = (pts.first(), pts.last()) else {
        return;
    };
    let d = pe - p0;
    let dist = d.hypot();
    if dist == 0.0 {
        return;
    }
    let length = dist - 2.0 * ARROW_SPACING - ARROW_SIZE;
    let (nx, ny) = (d.x / dist, d.y / dist);
    let (basex, basey) = (length * nx, length * ny);
    let floorx = ARROW_WIDTH * ny / 3.0;
    let floory = -ARROW_WIDTH * nx / 3.0;

    let p0x = p0.x - floorx / 2.0 + ARROW_SPACING * nx;
    let p0y = p0.y - floory / 2.0 + ARROW_SPACING * ny;
    let (p1x, p1y) = (p0x + floorx, p0y + floory);
    let (p2x, p2y) = (p1x + basex, p1y + basey);
    let (p3x, p3y) = (p2x + floorx, p2y + floory);
    let (p5x, p5y) = (p3x - 3.0 * floorx, p3y - 3.0 * floory);

    c.begin();
    c.move_to(p0x, p0y);
    c.line_to(p1x, p1y);
    c.line_to(p2x, p2y);
    c.line_to(p3x, p3y);
    c.line_to(pe.x - ARROW_SPACING * nx, pe.y - ARROW_SPACING * ny);
    c.line_to(p5x, p5y);
    c.line_to(p5x + floorx, p5y + floory);
    c.close();
    c.fill_and_stroke();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::XmlCanvas;
    use crate::markup::Document;
    use crate::shape::Painter;
    use dg_core::{Color, ShapeDefaults};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn edge(points: Vec<Point>) -> Shape {
        let mut s = Shape::new(
            Painter::Builtin(ShapeKind::Connector),
            Arc::new(ShapeDefaults::default()),
        )
        .with_points(points);
        s.stroke = Some(Color::BLACK);
        s.update_bounds_from_points();
        s
    }

    fn paths(shape: &Shape) -> Vec<String> {
        let mut doc = Document::new("output");
        let root = doc.root();
        let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
        shape.paint(&mut c);
        c.calls()
            .into_iter()
            .filter(|t| {
                matches!(
                    t.as_str(),
                    "move" | "line" | "quad" | "stroke" | "fillstroke" | "ellipse" | "close"
                )
            })
            .collect()
    }

    #[test]
    fn curved_line_uses_midpoint_quads() {
        let mut s = edge(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 50.0),
        ]);
        s.curved = true;
        assert_eq!(paths(&s), vec!["move", "quad", "quad", "stroke"]);
    }

    #[test]
    fn rounded_corner_inserts_quad() {
        let mut s = edge(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
        ]);
        s.rounded = true;
        assert_eq!(paths(&s), vec!["move", "line", "quad", "line", "stroke"]);
    }

    #[test]
    fn connector_paints_marker_after_line() {
        let mut s = edge(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        s.end_arrow = Some("classic".into());
        assert_eq!(
            paths(&s),
            vec!["move", "line", "stroke", "move", "line", "line", "line", "close", "fillstroke"]
        );
    }

    #[test]
    fn open_marker_is_stroked_only() {
        let mut s = edge(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        s.start_arrow = Some("open".into());
        assert_eq!(
            paths(&s),
            vec!["move", "line", "stroke", "move", "line", "line", "stroke"]
        );
    }
}
