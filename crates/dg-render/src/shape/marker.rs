//! Arrow heads painted at the ends of connectors.
//!
//! Creating a marker moves the line end back so the stroke stops inside
//! the head; the head itself is painted after the line.

use crate::canvas::Canvas2D;
use dg_core::{Point, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Classic,
    Block,
    Open,
    Oval,
    Diamond,
    DiamondThin,
}

impl MarkerKind {
    /// `none` and unknown names have no marker.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classic" => Some(Self::Classic),
            "block" => Some(Self::Block),
            "open" => Some(Self::Open),
            "oval" => Some(Self::Oval),
            "diamond" => Some(Self::Diamond),
            "diamondThin" => Some(Self::DiamondThin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    /// Tip of the head.
    pub tip: Point,
    /// Direction of the line end, scaled by the head length.
    pub unit: Vec2,
    pub size: f64,
    pub filled: bool,
}

/// Build the marker for one end of `pts` and shorten that end. Returns
/// `None` for fewer than two points or an unknown kind.
pub fn create_marker(
    name: Option<&str>,
    pts: &mut [Point],
    source: bool,
    size: f64,
    stroke_width: f64,
    filled: bool,
) -> Option<Marker> {
    let kind = MarkerKind::parse(name?)?;
    let n = pts.len();
    if n < 2 {
        return None;
    }
    let (end, prev) = if source { (0, 1) } else { (n - 1, n - 2) };
    let pe = pts[end];
    let d = pe - pts[prev];
    if !d.x.is_finite() || !d.y.is_finite() {
        return None;
    }
    let dist = d.hypot().max(1.0);
    let u = d / dist;

    let (tip, unit, shift) = match kind {
        MarkerKind::Classic | MarkerKind::Block => {
            let end_offset = u * stroke_width * 1.118;
            let unit = u * (size + stroke_width);
            let f = if kind == MarkerKind::Classic { 0.75 } else { 1.0 };
            (pe - end_offset, unit, -unit * f - end_offset)
        }
        MarkerKind::Open => {
            let end_offset = u * stroke_width * 1.118;
            let unit = u * (size + stroke_width);
            (pe - end_offset, unit, -end_offset * 2.0)
        }
        MarkerKind::Oval => (pe, u, -u * (size / 2.0)),
        MarkerKind::Diamond | MarkerKind::DiamondThin => {
            let factor = if kind == MarkerKind::Diamond { 0.7071 } else { 0.9862 };
            let end_offset = u * stroke_width * factor;
            let unit = u * (size + stroke_width);
            (pe - end_offset, unit, -unit - end_offset)
        }
    };
    pts[end] = pe + shift;
    Some(Marker {
        kind,
        tip,
        unit,
        size,
        filled,
    })
}

impl Marker {
    /// Paint the head. The caller sets the fill to the stroke color and
    /// turns off shadow and dashing beforehand.
    pub fn paint(&self, c: &mut dyn Canvas2D) {
        let pt = self.tip;
        let (ux, uy) = (self.unit.x, self.unit.y);
        match self.kind {
            MarkerKind::Classic | MarkerKind::Block => {
                c.begin();
                c.move_to(pt.x, pt.y);
                c.line_to(pt.x - ux - uy / 2.0, pt.y - uy + ux / 2.0);
                if self.kind == MarkerKind::Classic {
                    c.line_to(pt.x - ux * 3.0 / 4.0, pt.y - uy * 3.0 / 4.0);
                }
                c.line_to(pt.x + uy / 2.0 - ux, pt.y - uy - ux / 2.0);
                c.close();
                self.finish(c);
            }
            MarkerKind::Open => {
                c.begin();
                c.move_to(pt.x - ux - uy / 2.0, pt.y - uy + ux / 2.0);
                c.line_to(pt.x, pt.y);
                c.line_to(pt.x + uy / 2.0 - ux, pt.y - uy - ux / 2.0);
                c.stroke();
            }
            MarkerKind::Oval => {
                let a = self.size / 2.0;
                c.ellipse(pt.x - a, pt.y - a, self.size, self.size);
                self.finish(c);
            }
            MarkerKind::Diamond | MarkerKind::DiamondThin => {
                let tk = if self.kind == MarkerKind::Diamond { 2.0 } else { 3.4 };
                c.begin();
                c.move_to(pt.x, pt.y);
                c.line_to(pt.x - ux / 2.0 - uy / tk, pt.y + ux / tk - uy / 2.0);
                c.line_to(pt.x - ux, pt.y - uy);
                c.line_to(pt.x - ux / 2.0 + uy / tk, pt.y - uy / 2.0 - ux / tk);
                c.close();
                self.finish(c);
            }
        }
    }

    fn finish(&self, c: &mut dyn Canvas2D) {
        if self.filled {
            c.fill_and_stroke();
        } else {
            c.stroke();
        }
    }
}
