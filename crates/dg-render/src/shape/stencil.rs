//! Data-defined shapes.
//!
//! A [`Stencil`] is a list of drawing ops in its own `w0 × h0` space.
//! Drawing maps every coordinate into the shape bounds, optionally
//! keeping the aspect ratio, and replays the ops on the surface. Stencils
//! are built in memory or deserialized by the embedding shell; nothing
//! here reads files.

use super::Shape;
use crate::canvas::{Canvas2D, LineCap, LineJoin, TextOptions};
use crate::text::{FontStyle, HAlign, VAlign};
use dg_core::{Color, Direction, Point, Vec2};
use kurbo::{PathEl, SvgArc};
use serde::{Deserialize, Serialize};

/// Flattening tolerance for arcs, in surface units.
const ARC_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    #[default]
    Variable,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeWidth {
    /// Use the shape's own stroke width.
    Inherit,
    /// Scaled by the smaller of the two stencil scales.
    Fixed(f64),
}

impl Default for StrokeWidth {
    fn default() -> Self {
        Self::Fixed(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StencilOp {
    /// Begins a path and draws the nested segments.
    Path {
        ops: Vec<StencilOp>,
    },
    Move {
        x: f64,
        y: f64,
    },
    Line {
        x: f64,
        y: f64,
    },
    Quad {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Curve {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    },
    /// Elliptical arc in SVG endpoint form. Rotation is in degrees.
    Arc {
        rx: f64,
        ry: f64,
        #[serde(default)]
        rotation: f64,
        #[serde(default)]
        large_arc: bool,
        #[serde(default)]
        sweep: bool,
        x: f64,
        y: f64,
    },
    Close,
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    /// `arcsize` is a percentage of the smaller side; 0 uses the default
    /// rounding factor.
    Roundrect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        #[serde(default)]
        arcsize: f64,
    },
    Ellipse {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        src: String,
        #[serde(default)]
        flip_h: bool,
        #[serde(default)]
        flip_v: bool,
    },
    Text {
        x: f64,
        y: f64,
        #[serde(rename = "str")]
        text: String,
        #[serde(default)]
        align: Option<String>,
        #[serde(default)]
        valign: Option<String>,
        #[serde(default)]
        vertical: bool,
        #[serde(default)]
        rotation: f64,
    },
    Fill,
    Stroke,
    FillStroke,
    Save,
    Restore,
    StrokeWidth {
        width: f64,
        #[serde(default)]
        fixed: bool,
    },
    Dashed {
        dashed: bool,
    },
    DashPattern {
        pattern: String,
    },
    StrokeColor {
        color: String,
    },
    FillColor {
        color: String,
    },
    LineCap {
        cap: String,
    },
    LineJoin {
        join: String,
    },
    MiterLimit {
        limit: f64,
    },
    Alpha {
        alpha: f64,
    },
    FontColor {
        color: String,
    },
    FontStyle {
        style: u8,
    },
    FontFamily {
        family: String,
    },
    FontSize {
        size: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    pub name: String,
    pub w0: f64,
    pub h0: f64,
    #[serde(default)]
    pub aspect: Aspect,
    #[serde(default)]
    pub stroke_width: StrokeWidth,
    #[serde(default)]
    pub background: Vec<StencilOp>,
    #[serde(default)]
    pub foreground: Vec<StencilOp>,
}

/// Offset and scales mapping stencil space into the shape box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectMap {
    pub x0: f64,
    pub y0: f64,
    pub sx: f64,
    pub sy: f64,
}

impl AspectMap {
    fn point(&self, x: f64, y: f64) -> Point {
        Point::new(self.x0 + x * self.sx, self.y0 + y * self.sy)
    }

    fn min_scale(&self) -> f64 {
        self.sx.min(self.sy)
    }
}

/// Replay state for one op list.
struct Cursor {
    map: AspectMap,
    last: Point,
    disable_shadow: bool,
}

impl Stencil {
    pub fn new(name: impl Into<String>, w0: f64, h0: f64) -> Self {
        Self {
            name: name.into(),
            w0,
            h0,
            aspect: Aspect::Variable,
            stroke_width: StrokeWidth::default(),
            background: Vec::new(),
            foreground: Vec::new(),
        }
    }

    /// Map `w0 × h0` into the box. North/south shapes are laid out with
    /// width and height exchanged; fixed aspect centers the result.
    pub fn compute_aspect(&self, x: f64, y: f64, w: f64, h: f64, direction: Direction) -> AspectMap {
        let (mut x0, mut y0) = (x, y);
        let w0 = if self.w0 > 0.0 { self.w0 } else { 1.0 };
        let h0 = if self.h0 > 0.0 { self.h0 } else { 1.0 };
        let mut sx = w / w0;
        let mut sy = h / h0;

        let inverse = direction.is_inverted();
        if inverse {
            sy = w / h0;
            sx = h / w0;
            let delta = (w - h) / 2.0;
            x0 += delta;
            y0 -= delta;
        }

        if self.aspect == Aspect::Fixed {
            sy = sx.min(sy);
            sx = sy;
            if inverse {
                x0 += (h - w0 * sx) / 2.0;
                y0 += (w - h0 * sy) / 2.0;
            } else {
                x0 += (w - w0 * sx) / 2.0;
                y0 += (h - h0 * sy) / 2.0;
            }
        }
        AspectMap { x0, y0, sx, sy }
    }

    /// Paint the background, then the foreground. The first fill or
    /// stroke of the foreground turns the shadow off.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_shape(&self, c: &mut dyn Canvas2D, shape: &Shape, x: f64, y: f64, w: f64, h: f64) {
        log::trace!("stencil {} at {x},{y} {w}x{h}", self.name);
        self.draw_ops(c, shape, x, y, w, h, &self.background, false);
        self.draw_ops(c, shape, x, y, w, h, &self.foreground, true);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_ops(
        &self,
        c: &mut dyn Canvas2D,
        shape: &Shape,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        ops: &[StencilOp],
        disable_shadow: bool,
    ) {
        if ops.is_empty() {
            return;
        }
        let map = self.compute_aspect(x, y, w, h, shape.direction);
        let sw = match self.stroke_width {
            StrokeWidth::Inherit => shape.stroke_width,
            StrokeWidth::Fixed(v) => v * map.min_scale(),
        };
        c.set_stroke_width(sw);

        let mut cursor = Cursor {
            map,
            last: Point::new(map.x0, map.y0),
            disable_shadow,
        };
        for op in ops {
            draw_op(c, shape, op, &mut cursor);
        }
    }
}

fn color(s: &str) -> Option<Color> {
    Color::parse(s)
}

fn draw_op(c: &mut dyn Canvas2D, shape: &Shape, op: &StencilOp, cur: &mut Cursor) {
    let m = cur.map;
    let min_scale = m.min_scale();
    match op {
        StencilOp::Path { ops } => {
            c.begin();
            for child in ops {
                draw_op(c, shape, child, cur);
            }
        }
        StencilOp::Move { x, y } => {
            let p = m.point(*x, *y);
            c.move_to(p.x, p.y);
            cur.last = p;
        }
        StencilOp::Line { x, y } => {
            let p = m.point(*x, *y);
            c.line_to(p.x, p.y);
            cur.last = p;
        }
        StencilOp::Quad { x1, y1, x2, y2 } => {
            let (p1, p2) = (m.point(*x1, *y1), m.point(*x2, *y2));
            c.quad_to(p1.x, p1.y, p2.x, p2.y);
            cur.last = p2;
        }
        StencilOp::Curve {
            x1,
            y1,
            x2,
            y2,
            x3,
            y3,
        } => {
            let (p1, p2, p3) = (m.point(*x1, *y1), m.point(*x2, *y2), m.point(*x3, *y3));
            c.curve_to(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y);
            cur.last = p3;
        }
        StencilOp::Arc {
            rx,
            ry,
            rotation,
            large_arc,
            sweep,
            x,
            y,
        } => {
            let to = m.point(*x, *y);
            arc_to(c, cur.last, to, Vec2::new(rx * m.sx, ry * m.sy), *rotation, *large_arc, *sweep);
            cur.last = to;
        }
        StencilOp::Close => c.close(),
        StencilOp::Rect { x, y, w, h } => {
            let p = m.point(*x, *y);
            c.rect(p.x, p.y, w * m.sx, h * m.sy);
        }
        StencilOp::Roundrect { x, y, w, h, arcsize } => {
            let p = m.point(*x, *y);
            let (w, h) = (w * m.sx, h * m.sy);
            let factor = if *arcsize == 0.0 {
                shape.defaults.rounding_factor
            } else {
                arcsize / 100.0
            };
            let r = (w * factor).min(h * factor);
            c.roundrect(p.x, p.y, w, h, r, r);
        }
        StencilOp::Ellipse { x, y, w, h } => {
            let p = m.point(*x, *y);
            c.ellipse(p.x, p.y, w * m.sx, h * m.sy);
        }
        StencilOp::Image {
            x,
            y,
            w,
            h,
            src,
            flip_h,
            flip_v,
        } => {
            let p = m.point(*x, *y);
            c.image(p.x, p.y, w * m.sx, h * m.sy, src, false, *flip_h, *flip_v);
        }
        StencilOp::Text {
            x,
            y,
            text,
            align,
            valign,
            vertical,
            rotation,
        } => {
            let p = m.point(*x, *y);
            let base = if *vertical { -90.0 } else { 0.0 };
            let options = TextOptions {
                align: HAlign::parse(align.as_deref().unwrap_or("left")),
                valign: VAlign::parse(valign.as_deref().unwrap_or("top")),
                rotation: base - rotation,
                ..TextOptions::default()
            };
            c.text(p.x, p.y, 0.0, 0.0, text, &options);
        }
        StencilOp::Fill => c.fill(),
        StencilOp::Stroke => c.stroke(),
        StencilOp::FillStroke => c.fill_and_stroke(),
        StencilOp::Save => c.save(),
        StencilOp::Restore => c.restore(),
        StencilOp::StrokeWidth { width, fixed } => {
            let s = if *fixed { 1.0 } else { min_scale };
            c.set_stroke_width(width * s);
        }
        StencilOp::Dashed { dashed } => c.set_dashed(*dashed),
        StencilOp::DashPattern { pattern } => {
            let scaled: Vec<String> = pattern
                .split_whitespace()
                .filter_map(|t| t.parse::<f64>().ok())
                .map(|v| crate::canvas::fmt_num(v * min_scale))
                .collect();
            c.set_dash_pattern(&scaled.join(" "));
        }
        StencilOp::StrokeColor { color: s } => c.set_stroke_color(color(s)),
        StencilOp::FillColor { color: s } => c.set_fill_color(color(s)),
        StencilOp::LineCap { cap } => c.set_line_cap(LineCap::parse(cap)),
        StencilOp::LineJoin { join } => c.set_line_join(LineJoin::parse(join)),
        StencilOp::MiterLimit { limit } => c.set_miter_limit(*limit),
        StencilOp::Alpha { alpha } => c.set_alpha(*alpha),
        StencilOp::FontColor { color: s } => c.set_font_color(color(s)),
        StencilOp::FontStyle { style } => c.set_font_style(FontStyle(*style)),
        StencilOp::FontFamily { family } => c.set_font_family(family),
        StencilOp::FontSize { size } => c.set_font_size(size * min_scale),
    }

    if cur.disable_shadow
        && matches!(op, StencilOp::Fill | StencilOp::Stroke | StencilOp::FillStroke)
    {
        cur.disable_shadow = false;
        c.set_shadow(false);
    }
}

/// Append an SVG endpoint arc as cubic segments. Degenerate arcs become
/// a straight line.
fn arc_to(
    c: &mut dyn Canvas2D,
    from: Point,
    to: Point,
    radii: Vec2,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
) {
    let svg = SvgArc {
        from,
        to,
        radii,
        x_rotation: rotation.to_radians(),
        large_arc,
        sweep,
    };
    let Some(arc) = kurbo::Arc::from_svg_arc(&svg) else {
        c.line_to(to.x, to.y);
        return;
    };
    for el in arc.append_iter(ARC_TOLERANCE) {
        match el {
            PathEl::CurveTo(p1, p2, p3) => c.curve_to(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y),
            PathEl::QuadTo(p1, p2) => c.quad_to(p1.x, p1.y, p2.x, p2.y),
            PathEl::LineTo(p) => c.line_to(p.x, p.y),
            PathEl::MoveTo(_) | PathEl::ClosePath => {}
        }
    }
}
