//! The painting surface: a stateful 2-D path and paint API.
//!
//! [`Canvas2D`] carries the backend-independent part as default methods
//! over a [`CanvasCore`]: the save/restore stack, the translate/scale/
//! rotate state, and the path builder. Coordinates are transformed when
//! they enter the path, so a backend only sees final surface coordinates
//! and decides how to emit [`Primitive`]s when `fill`/`stroke` flushes.

pub mod html;
pub mod svg;
pub mod vml;
pub mod xml;

use crate::text::{FontStyle, HAlign, TextFormat, VAlign};
use dg_core::geom::f2;
use dg_core::{Bounds, Color, Direction, Point, ShapeDefaults};
use std::fmt::Write;

pub use html::HtmlCanvas;
pub use svg::SvgCanvas;
pub use vml::VmlCanvas;
pub use xml::XmlCanvas;

// ─── State ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Flat,
    Round,
    Square,
}

impl LineCap {
    pub fn parse(s: &str) -> Self {
        match s {
            "round" => Self::Round,
            "square" => Self::Square,
            _ => Self::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Round => "round",
            Self::Square => "square",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn parse(s: &str) -> Self {
        match s {
            "round" => Self::Round,
            "bevel" => Self::Bevel,
            _ => Self::Miter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Miter => "miter",
            Self::Round => "round",
            Self::Bevel => "bevel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientFill {
    pub start: Color,
    pub end: Color,
    pub alpha1: f64,
    pub alpha2: f64,
    pub direction: Direction,
    /// Area the gradient spans, in surface coordinates.
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasState {
    pub dx: f64,
    pub dy: f64,
    pub scale: f64,
    pub alpha: f64,
    pub fill_alpha: f64,
    pub stroke_alpha: f64,
    pub fill: Option<Color>,
    pub gradient: Option<GradientFill>,
    pub stroke: Option<Color>,
    /// Already multiplied by `scale`.
    pub stroke_width: f64,
    pub dashed: bool,
    pub dash_pattern: String,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub font_color: Option<Color>,
    pub font_size: f64,
    pub font_family: String,
    pub font_style: FontStyle,
    pub font_background: Option<Color>,
    pub font_border: Option<Color>,
    pub shadow: bool,
    pub shadow_color: Color,
    pub shadow_alpha: f64,
    pub shadow_dx: f64,
    pub shadow_dy: f64,
    /// Concatenated transform, emitted verbatim at flush time.
    pub transform: String,
    pub rotation: f64,
    pub rotation_cx: f64,
    pub rotation_cy: f64,
    pub flip_h: bool,
    pub flip_v: bool,
    /// Extra hit width added around stroked paths, 0 to disable.
    pub stroke_tolerance: f64,
    /// Id of the active clip definition.
    pub clip: Option<String>,
}

impl CanvasState {
    pub fn new(defaults: &ShapeDefaults) -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            scale: 1.0,
            alpha: 1.0,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            fill: None,
            gradient: None,
            stroke: None,
            stroke_width: 1.0,
            dashed: false,
            dash_pattern: defaults.dash_pattern.clone(),
            line_cap: LineCap::Flat,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            font_color: Color::parse(&defaults.font_color),
            font_size: defaults.font_size,
            font_family: defaults.font_family.clone(),
            font_style: FontStyle::default(),
            font_background: None,
            font_border: None,
            shadow: false,
            shadow_color: Color::parse(&defaults.shadow_color).unwrap_or(Color::BLACK),
            shadow_alpha: defaults.shadow_opacity,
            shadow_dx: defaults.shadow_offset_x,
            shadow_dy: defaults.shadow_offset_y,
            transform: String::new(),
            rotation: 0.0,
            rotation_cx: 0.0,
            rotation_cy: 0.0,
            flip_h: false,
            flip_v: false,
            stroke_tolerance: 0.0,
            clip: None,
        }
    }

    /// Dash array in surface units: the pattern times the stroke width.
    pub fn dash_array(&self) -> Option<String> {
        if !self.dashed {
            return None;
        }
        let parts: Vec<String> = self
            .dash_pattern
            .split_whitespace()
            .filter_map(|p| p.parse::<f64>().ok())
            .map(|v| fmt_num(f2(v * self.stroke_width.max(1.0))))
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(&ShapeDefaults::default())
    }
}

// ─── Path primitives ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSeg {
    Move(Point),
    Line(Point),
    Quad(Point, Point),
    Curve(Point, Point, Point),
    Close,
}

/// Geometry waiting for `fill`/`stroke`, in surface coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Path { segs: Vec<PathSeg>, orthogonal: bool },
    Rect { x: f64, y: f64, w: f64, h: f64, rx: f64, ry: f64 },
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
}

/// SVG path data (`M x y L x y … Z`).
pub fn path_data(segs: &[PathSeg]) -> String {
    let mut d = String::new();
    for seg in segs {
        if !d.is_empty() {
            d.push(' ');
        }
        let _ = match seg {
            PathSeg::Move(p) => write!(d, "M {} {}", fmt_num(p.x), fmt_num(p.y)),
            PathSeg::Line(p) => write!(d, "L {} {}", fmt_num(p.x), fmt_num(p.y)),
            PathSeg::Quad(c, p) => write!(
                d,
                "Q {} {} {} {}",
                fmt_num(c.x),
                fmt_num(c.y),
                fmt_num(p.x),
                fmt_num(p.y)
            ),
            PathSeg::Curve(c1, c2, p) => write!(
                d,
                "C {} {} {} {} {} {}",
                fmt_num(c1.x),
                fmt_num(c1.y),
                fmt_num(c2.x),
                fmt_num(c2.y),
                fmt_num(p.x),
                fmt_num(p.y)
            ),
            PathSeg::Close => write!(d, "Z"),
        };
    }
    d
}

/// Number without a trailing `.0`, two decimals at most.
pub fn fmt_num(v: f64) -> String {
    let v = f2(v);
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Text placement options.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub align: HAlign,
    pub valign: VAlign,
    pub wrap: bool,
    pub format: TextFormat,
    /// Clip the text to its box.
    pub clip: bool,
    /// Degrees, applied around the box center.
    pub rotation: f64,
    /// `false` paints the text rotated by -90°.
    pub horizontal: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            align: HAlign::Center,
            valign: VAlign::Middle,
            wrap: false,
            format: TextFormat::Plain,
            clip: false,
            rotation: 0.0,
            horizontal: true,
        }
    }
}

// ─── Core ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CanvasCore {
    pub state: CanvasState,
    stack: Vec<CanvasState>,
    pending: Option<Primitive>,
    last: Option<Point>,
}

impl CanvasCore {
    pub fn new(defaults: &ShapeDefaults) -> Self {
        Self {
            state: CanvasState::new(defaults),
            stack: Vec::new(),
            pending: None,
            last: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    pub fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        } else {
            log::warn!("canvas restore without save");
        }
    }

    /// User-space x/y → surface coordinates.
    pub fn pt(&self, x: f64, y: f64) -> Point {
        Point::new(
            f2((x + self.state.dx) * self.state.scale),
            f2((y + self.state.dy) * self.state.scale),
        )
    }

    /// User-space length → surface length.
    pub fn len(&self, v: f64) -> f64 {
        f2(v * self.state.scale)
    }

    pub fn rotate(&mut self, theta: f64, flip_h: bool, flip_v: bool, cx: f64, cy: f64) {
        let c = self.pt(cx, cy);
        let s = &mut self.state;
        if flip_h || flip_v {
            let sx = if flip_h { -1 } else { 1 };
            let sy = if flip_v { -1 } else { 1 };
            let _ = write!(
                s.transform,
                "translate({},{})scale({sx},{sy})translate({},{})",
                fmt_num(c.x),
                fmt_num(c.y),
                fmt_num(-c.x),
                fmt_num(-c.y)
            );
        }
        if theta != 0.0 {
            let _ = write!(
                s.transform,
                "rotate({},{},{})",
                fmt_num(theta),
                fmt_num(c.x),
                fmt_num(c.y)
            );
        }
        s.flip_h ^= flip_h;
        s.flip_v ^= flip_v;
        s.rotation += theta;
        s.rotation_cx = c.x;
        s.rotation_cy = c.y;
    }

    pub fn begin(&mut self) {
        self.pending = Some(Primitive::Path {
            segs: Vec::new(),
            orthogonal: true,
        });
        self.last = None;
    }

    fn push_seg(&mut self, seg: PathSeg, end: Point, keeps_orthogonal: bool) {
        let last = self.last;
        if let Some(Primitive::Path { segs, orthogonal }) = &mut self.pending {
            if !keeps_orthogonal {
                *orthogonal = false;
            } else if let (PathSeg::Line(_), Some(l)) = (seg, last)
                && l.x != end.x
                && l.y != end.y
            {
                *orthogonal = false;
            }
            segs.push(seg);
            self.last = Some(end);
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.pt(x, y);
        self.push_seg(PathSeg::Move(p), p, true);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        let p = self.pt(x, y);
        self.push_seg(PathSeg::Line(p), p, true);
    }

    pub fn quad_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let c = self.pt(x1, y1);
        let p = self.pt(x2, y2);
        self.push_seg(PathSeg::Quad(c, p), p, false);
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        let c1 = self.pt(x1, y1);
        let c2 = self.pt(x2, y2);
        let p = self.pt(x3, y3);
        self.push_seg(PathSeg::Curve(c1, c2, p), p, false);
    }

    pub fn close(&mut self) {
        if let Some(Primitive::Path { segs, .. }) = &mut self.pending {
            segs.push(PathSeg::Close);
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, rx: f64, ry: f64) {
        let p = self.pt(x, y);
        self.pending = Some(Primitive::Rect {
            x: p.x,
            y: p.y,
            w: self.len(w),
            h: self.len(h),
            rx: self.len(rx),
            ry: self.len(ry),
        });
    }

    pub fn ellipse(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let c = self.pt(x + w / 2.0, y + h / 2.0);
        self.pending = Some(Primitive::Ellipse {
            cx: c.x,
            cy: c.y,
            rx: self.len(w / 2.0),
            ry: self.len(h / 2.0),
        });
    }

    pub fn take_pending(&mut self) -> Option<Primitive> {
        self.pending.take()
    }

    /// Restore a primitive so a second flush can reuse it.
    pub fn set_pending(&mut self, primitive: Primitive) {
        self.pending = Some(primitive);
    }
}

// ─── Canvas2D ────────────────────────────────────────────────────────────

pub trait Canvas2D {
    fn core(&self) -> &CanvasCore;
    fn core_mut(&mut self) -> &mut CanvasCore;

    fn state(&self) -> &CanvasState {
        &self.core().state
    }

    fn save(&mut self) {
        self.core_mut().save();
    }

    fn restore(&mut self) {
        self.core_mut().restore();
    }

    fn scale(&mut self, value: f64) {
        let s = &mut self.core_mut().state;
        s.scale *= value;
        s.stroke_width *= value;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let s = &mut self.core_mut().state;
        s.dx += dx;
        s.dy += dy;
    }

    /// Rotate by `theta` degrees around `(cx, cy)`, flipping first.
    fn rotate(&mut self, theta: f64, flip_h: bool, flip_v: bool, cx: f64, cy: f64) {
        self.core_mut().rotate(theta, flip_h, flip_v, cx, cy);
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.core_mut().state.alpha = alpha;
    }

    fn set_fill_alpha(&mut self, alpha: f64) {
        self.core_mut().state.fill_alpha = alpha;
    }

    fn set_stroke_alpha(&mut self, alpha: f64) {
        self.core_mut().state.stroke_alpha = alpha;
    }

    fn set_fill_color(&mut self, color: Option<Color>) {
        let s = &mut self.core_mut().state;
        s.fill = color;
        s.gradient = None;
    }

    /// Linear gradient over `x, y, w, h` (user space).
    #[allow(clippy::too_many_arguments)]
    fn set_gradient(
        &mut self,
        start: Color,
        end: Color,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        direction: Direction,
        alpha1: f64,
        alpha2: f64,
    ) {
        let core = self.core_mut();
        let p = core.pt(x, y);
        let bounds = Bounds::new(p.x, p.y, core.len(w), core.len(h));
        core.state.gradient = Some(GradientFill {
            start,
            end,
            alpha1,
            alpha2,
            direction,
            bounds,
        });
        core.state.fill = Some(start);
    }

    fn set_stroke_color(&mut self, color: Option<Color>) {
        self.core_mut().state.stroke = color;
    }

    /// Stroke width in user space; stored scaled.
    fn set_stroke_width(&mut self, width: f64) {
        let s = &mut self.core_mut().state;
        s.stroke_width = width * s.scale;
    }

    fn set_dashed(&mut self, dashed: bool) {
        self.core_mut().state.dashed = dashed;
    }

    fn set_dash_pattern(&mut self, pattern: &str) {
        self.core_mut().state.dash_pattern = pattern.to_string();
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.core_mut().state.line_cap = cap;
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.core_mut().state.line_join = join;
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.core_mut().state.miter_limit = limit;
    }

    fn set_font_color(&mut self, color: Option<Color>) {
        self.core_mut().state.font_color = color;
    }

    fn set_font_size(&mut self, size: f64) {
        self.core_mut().state.font_size = size;
    }

    fn set_font_family(&mut self, family: &str) {
        self.core_mut().state.font_family = family.to_string();
    }

    fn set_font_style(&mut self, style: FontStyle) {
        self.core_mut().state.font_style = style;
    }

    fn set_font_background_color(&mut self, color: Option<Color>) {
        self.core_mut().state.font_background = color;
    }

    fn set_font_border_color(&mut self, color: Option<Color>) {
        self.core_mut().state.font_border = color;
    }

    fn set_shadow(&mut self, enabled: bool) {
        self.core_mut().state.shadow = enabled;
    }

    fn set_shadow_color(&mut self, color: Color) {
        self.core_mut().state.shadow_color = color;
    }

    fn set_shadow_alpha(&mut self, alpha: f64) {
        self.core_mut().state.shadow_alpha = alpha;
    }

    fn set_shadow_offset(&mut self, dx: f64, dy: f64) {
        let s = &mut self.core_mut().state;
        s.shadow_dx = dx;
        s.shadow_dy = dy;
    }

    fn set_stroke_tolerance(&mut self, tolerance: f64) {
        self.core_mut().state.stroke_tolerance = tolerance;
    }

    fn begin(&mut self) {
        self.core_mut().begin();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.core_mut().move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.core_mut().line_to(x, y);
    }

    fn quad_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.core_mut().quad_to(x1, y1, x2, y2);
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.core_mut().curve_to(x1, y1, x2, y2, x3, y3);
    }

    fn close(&mut self) {
        self.core_mut().close();
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.core_mut().rect(x, y, w, h, 0.0, 0.0);
    }

    fn roundrect(&mut self, x: f64, y: f64, w: f64, h: f64, dx: f64, dy: f64) {
        self.core_mut().rect(x, y, w, h, dx, dy);
    }

    fn ellipse(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.core_mut().ellipse(x, y, w, h);
    }

    fn fill(&mut self);
    fn stroke(&mut self);
    fn fill_and_stroke(&mut self);

    /// Clip subsequent output to the current path.
    fn clip(&mut self) {
        log::debug!("clip not supported by this surface");
        self.core_mut().take_pending();
    }

    #[allow(clippy::too_many_arguments)]
    fn image(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        src: &str,
        aspect: bool,
        flip_h: bool,
        flip_v: bool,
    );

    #[allow(clippy::too_many_arguments)]
    fn text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, options: &TextOptions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_is_transformed_on_entry() {
        let mut core = CanvasCore::new(&ShapeDefaults::default());
        core.state.dx = 10.0;
        core.state.scale = 2.0;
        core.begin();
        core.move_to(0.0, 0.0);
        core.line_to(5.0, 0.0);
        core.line_to(5.0, 5.0);
        core.close();
        let Some(Primitive::Path { segs, orthogonal }) = core.take_pending() else {
            panic!("expected path");
        };
        assert!(orthogonal);
        assert_eq!(path_data(&segs), "M 20 0 L 30 0 L 30 10 Z");
    }

    #[test]
    fn diagonal_line_breaks_orthogonality() {
        let mut core = CanvasCore::new(&ShapeDefaults::default());
        core.begin();
        core.move_to(0.0, 0.0);
        core.line_to(3.0, 4.0);
        match core.take_pending() {
            Some(Primitive::Path { orthogonal, .. }) => assert!(!orthogonal),
            _ => panic!("expected path"),
        }
    }

    #[test]
    fn rotate_appends_flip_then_rotation() {
        let mut core = CanvasCore::new(&ShapeDefaults::default());
        core.rotate(45.0, true, false, 50.0, 20.0);
        assert_eq!(
            core.state.transform,
            "translate(50,20)scale(-1,1)translate(-50,-20)rotate(45,50,20)"
        );
        assert_eq!(core.state.rotation, 45.0);
        assert_eq!((core.state.rotation_cx, core.state.rotation_cy), (50.0, 20.0));
    }

    #[test]
    fn save_restore_round_trips_state() {
        let mut core = CanvasCore::new(&ShapeDefaults::default());
        core.save();
        core.state.alpha = 0.3;
        core.state.dashed = true;
        core.restore();
        assert_eq!(core.state.alpha, 1.0);
        assert!(!core.state.dashed);
        assert_eq!(core.depth(), 0);
    }

    #[test]
    fn dash_array_scales_with_stroke_width() {
        let mut s = CanvasState::default();
        s.dashed = true;
        s.stroke_width = 2.0;
        assert_eq!(s.dash_array().as_deref(), Some("6 6"));
        s.dashed = false;
        assert_eq!(s.dash_array(), None);
    }

    #[test]
    fn numbers_drop_trailing_zeros() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(1.256), "1.26");
        assert_eq!(fmt_num(-0.5), "-0.5");
    }
}
