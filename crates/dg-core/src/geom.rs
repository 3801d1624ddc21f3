//! Rectangle and point math shared by the view, shapes, and handlers.
//!
//! Bounds are stored as `x, y, width, height` rather than two corners:
//! handlers routinely produce negative extents mid-drag and the model
//! has to carry them until they are normalized.

use serde::{Deserialize, Serialize};

pub use kurbo::{Point, Vec2};

// ─── Bounds ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point. `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// All components finite and a strictly positive area.
    pub fn is_paintable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Grow this rectangle to also cover `other`.
    pub fn add(&mut self, other: &Bounds) {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        *self = Self::new(min_x, min_y, max_x - min_x, max_y - min_y);
    }

    /// Grow by `amount` on every side.
    pub fn grow(&mut self, amount: f64) {
        self.x -= amount;
        self.y -= amount;
        self.width += 2.0 * amount;
        self.height += 2.0 * amount;
    }

    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Floor the origin and ceil the extent so the box covers whole pixels.
    #[must_use]
    pub fn snapped_outward(&self) -> Self {
        Self::new(
            self.x.floor(),
            self.y.floor(),
            self.width.ceil(),
            self.height.ceil(),
        )
    }

    /// Flip a negative width/height so the rectangle covers the same area.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = *self;
        if out.width < 0.0 {
            out.x += out.width;
            out.width = out.width.abs();
        }
        if out.height < 0.0 {
            out.y += out.height;
            out.height = out.height.abs();
        }
        out
    }

    /// Axis-aligned box of this rectangle rotated by `degrees` around
    /// `center` (the rectangle's own center if `None`).
    #[must_use]
    pub fn rotated(&self, degrees: f64, center: Option<Point>) -> Self {
        if degrees == 0.0 {
            return *self;
        }
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        let c = center.unwrap_or_else(|| self.center());
        let corners = [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x + self.width, self.y + self.height),
            Point::new(self.x, self.y + self.height),
        ]
        .map(|p| rotate_point(p, cos, sin, c));
        Self::from_points(&corners).unwrap_or(*self)
    }

    pub fn to_rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

// ─── Point helpers ───────────────────────────────────────────────────────

/// Rotate `p` around `center` given a precomputed cosine and sine.
pub fn rotate_point(p: Point, cos: f64, sin: f64, center: Point) -> Point {
    let x = p.x - center.x;
    let y = p.y - center.y;
    Point::new(x * cos - y * sin + center.x, y * cos + x * sin + center.y)
}

/// Snap a value to the nearest grid multiple.
pub fn snap(value: f64, grid_size: f64) -> f64 {
    if grid_size > 0.0 {
        (value / grid_size).round() * grid_size
    } else {
        value
    }
}

/// Squared distance from `p` to the segment `a`-`b`.
pub fn segment_distance_sq(a: Point, b: Point, p: Point) -> f64 {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot2();
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (p - proj).hypot2()
}

/// Index of the segment of `points` closest to `p`. Segment `i` spans
/// `points[i]..points[i + 1]`, which is also the control-point insertion
/// index for a polyline whose first and last entries are terminals.
pub fn nearest_segment(points: &[Point], p: Point) -> usize {
    let mut index = 0;
    let mut min = f64::INFINITY;
    for (i, pair) in points.windows(2).enumerate() {
        let d = segment_distance_sq(pair[0], pair[1], p);
        if d < min {
            min = d;
            index = i;
        }
    }
    index
}

/// Whether every consecutive pair shares an x or a y coordinate.
pub fn is_orthogonal(points: &[Point]) -> bool {
    points
        .windows(2)
        .all(|w| w[0].x == w[1].x || w[0].y == w[1].y)
}

/// Round to two decimals, the precision used in emitted markup.
pub fn f2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
