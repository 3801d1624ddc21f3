//! Model-space geometry of a cell.

use crate::geom::{Bounds, Point, rotate_point};
use serde::{Deserialize, Serialize};

/// Geometry stored on a cell, in unscaled model coordinates.
///
/// For vertices `bounds` is relative to the parent's origin, or a
/// fraction of the parent's size when `relative` is set. Edges use
/// `points` for their control points and `source_point`/`target_point`
/// when a terminal is not connected to a cell. `offset` moves the label
/// of either kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub bounds: Bounds,
    pub relative: bool,
    pub offset: Option<Point>,
    pub points: Vec<Point>,
    pub source_point: Option<Point>,
    pub target_point: Option<Point>,
    pub alternate_bounds: Option<Bounds>,
}

impl Geometry {
    pub fn vertex(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            bounds: Bounds::new(x, y, width, height),
            ..Self::default()
        }
    }

    /// Edge geometry with no control points. `relative` is set as for
    /// every edge so label offsets are measured along the route.
    pub fn edge() -> Self {
        Self {
            relative: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn terminal_point(&self, source: bool) -> Option<Point> {
        if source {
            self.source_point
        } else {
            self.target_point
        }
    }

    pub fn set_terminal_point(&mut self, point: Option<Point>, source: bool) {
        if source {
            self.source_point = point;
        } else {
            self.target_point = point;
        }
    }

    /// Exchange `bounds` with `alternate_bounds` (collapse/expand).
    /// Keeps the current origin.
    pub fn swap(&mut self) {
        if let Some(alt) = self.alternate_bounds {
            let old = self.bounds;
            self.bounds = Bounds::new(old.x, old.y, alt.width, alt.height);
            self.alternate_bounds = Some(old);
        }
    }

    /// Move the geometry. Relative vertices stay put since their position
    /// is a fraction of the parent.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if !self.relative {
            self.bounds.x += dx;
            self.bounds.y += dy;
        }
        for p in [&mut self.source_point, &mut self.target_point]
            .into_iter()
            .flatten()
        {
            p.x += dx;
            p.y += dy;
        }
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Rotate the geometry around `center` (model coordinates) by
    /// `degrees`. Vertex bounds keep their size and move their center.
    pub fn rotate(&mut self, degrees: f64, center: Point) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        if !self.relative {
            let c = rotate_point(self.bounds.center(), cos, sin, center);
            self.bounds.x = c.x - self.bounds.width / 2.0;
            self.bounds.y = c.y - self.bounds.height / 2.0;
        }
        for p in [&mut self.source_point, &mut self.target_point]
            .into_iter()
            .flatten()
        {
            *p = rotate_point(*p, cos, sin, center);
        }
        for p in &mut self.points {
            *p = rotate_point(*p, cos, sin, center);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translate_skips_relative_bounds() {
        let mut g = Geometry::vertex(0.5, 0.5, 10.0, 10.0);
        g.relative = true;
        g.translate(5.0, 5.0);
        assert_eq!(g.bounds.x, 0.5);

        let mut e = Geometry::edge().with_points(vec![Point::new(1.0, 2.0)]);
        e.translate(5.0, 5.0);
        assert_eq!(e.points, vec![Point::new(6.0, 7.0)]);
    }

    #[test]
    fn swap_exchanges_sizes() {
        let mut g = Geometry::vertex(10.0, 10.0, 200.0, 100.0);
        g.alternate_bounds = Some(Bounds::new(0.0, 0.0, 80.0, 30.0));
        g.swap();
        assert_eq!(g.bounds, Bounds::new(10.0, 10.0, 80.0, 30.0));
        g.swap();
        assert_eq!(g.bounds, Bounds::new(10.0, 10.0, 200.0, 100.0));
    }

    #[test]
    fn rotate_moves_center() {
        let mut g = Geometry::vertex(90.0, 0.0, 20.0, 20.0);
        g.rotate(90.0, Point::new(0.0, 0.0));
        let c = g.bounds.center();
        assert!((c.x + 10.0).abs() < 0.01);
        assert!((c.y - 100.0).abs() < 0.01);
    }
}
