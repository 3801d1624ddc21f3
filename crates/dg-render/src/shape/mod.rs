//! Shapes: style-driven paintable primitives.
//!
//! A [`Shape`] owns one `<g>` node in the retained tree and a
//! denormalized copy of the style fields it paints with. [`Shape::redraw`]
//! clears the node and replays [`Shape::paint`] into an SVG surface;
//! the export pass calls `paint` directly on any surface.
//!
//! `paint` is a template: transform, configure the surface, then hand off
//! to a stencil, a custom painter, or the built-in vertex/edge painters.
//! Vertex painters draw a background, then the shadow is switched off and
//! the foreground is drawn, so decorations never cast a second shadow.

pub mod edge;
pub mod marker;
pub mod stencil;
pub mod text;
pub mod vertex;

use crate::canvas::{Canvas2D, LineCap, LineJoin, SvgCanvas};
use crate::markup::{Document, NodeRef};
use crate::text::TextMeasurer;
use dg_core::style::keys;
use dg_core::{Bounds, Color, Direction, Point, ShapeDefaults, Style};
use stencil::Stencil;
use std::fmt;
use std::sync::Arc;

// ─── Kinds and painters ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    DoubleEllipse,
    Rhombus,
    Triangle,
    Hexagon,
    Cloud,
    Actor,
    Cylinder,
    Swimlane,
    Label,
    Image,
    Line,
    Arrow,
    Connector,
    Polyline,
    /// Cell labels.
    Text,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 17] = [
        Self::Rectangle,
        Self::Ellipse,
        Self::DoubleEllipse,
        Self::Rhombus,
        Self::Triangle,
        Self::Hexagon,
        Self::Cloud,
        Self::Actor,
        Self::Cylinder,
        Self::Swimlane,
        Self::Label,
        Self::Image,
        Self::Line,
        Self::Arrow,
        Self::Connector,
        Self::Polyline,
        Self::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::DoubleEllipse => "doubleEllipse",
            Self::Rhombus => "rhombus",
            Self::Triangle => "triangle",
            Self::Hexagon => "hexagon",
            Self::Cloud => "cloud",
            Self::Actor => "actor",
            Self::Cylinder => "cylinder",
            Self::Swimlane => "swimlane",
            Self::Label => "label",
            Self::Image => "image",
            Self::Line => "line",
            Self::Arrow => "arrow",
            Self::Connector => "connector",
            Self::Polyline => "polyline",
            Self::Text => "text",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Custom painters registered under a name at runtime.
pub trait ShapePainter: fmt::Debug + Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn paint_background(&self, _c: &mut dyn Canvas2D, _shape: &Shape, _x: f64, _y: f64, _w: f64, _h: f64) {}

    #[allow(clippy::too_many_arguments)]
    fn paint_foreground(&self, _c: &mut dyn Canvas2D, _shape: &Shape, _x: f64, _y: f64, _w: f64, _h: f64) {}

    /// Points are unscaled.
    fn paint_edge(&self, c: &mut dyn Canvas2D, shape: &Shape, pts: &[Point]) {
        edge::paint_polyline(c, shape, pts);
    }
}

#[derive(Debug, Clone)]
pub enum Painter {
    Builtin(ShapeKind),
    Stencil(Arc<Stencil>),
    Custom(Arc<dyn ShapePainter>),
}

impl Painter {
    pub fn kind(&self) -> Option<ShapeKind> {
        match self {
            Self::Builtin(k) => Some(*k),
            _ => None,
        }
    }

    pub fn is_stencil(&self) -> bool {
        matches!(self, Self::Stencil(_))
    }
}

// ─── Shape ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Shape {
    pub painter: Painter,
    pub bounds: Bounds,
    /// Absolute points of edge shapes; empty for vertices.
    pub points: Vec<Point>,
    pub scale: f64,
    pub visible: bool,

    pub fill: Option<Color>,
    pub gradient: Option<Color>,
    pub gradient_direction: Direction,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
    pub stroke_opacity: f64,
    pub rotation: f64,
    pub direction: Direction,
    pub flip_h: bool,
    pub flip_v: bool,
    pub dashed: bool,
    pub dash_pattern: Option<String>,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub shadow: bool,
    pub rounded: bool,
    pub arc_size: Option<f64>,
    pub curved: bool,
    pub start_arrow: Option<String>,
    pub end_arrow: Option<String>,
    pub start_size: f64,
    pub end_size: f64,
    pub start_fill: bool,
    pub end_fill: bool,
    pub spacing: f64,
    pub image: Option<String>,
    pub indicator_color: Option<Color>,
    pub pointer_events: bool,
    /// Hit tolerance added around stroked paths in screen pixels.
    pub stroke_tolerance: f64,

    /// The resolved style last applied.
    pub style: Style,
    /// Label text, for [`ShapeKind::Text`].
    pub value: Option<String>,

    pub bounding_box: Option<Bounds>,
    pub defaults: Arc<ShapeDefaults>,
    node: Option<NodeRef>,
    gradients: Vec<String>,
}

impl Shape {
    pub fn new(painter: Painter, defaults: Arc<ShapeDefaults>) -> Self {
        Self {
            painter,
            bounds: Bounds::default(),
            points: Vec::new(),
            scale: 1.0,
            visible: true,
            fill: None,
            gradient: None,
            gradient_direction: Direction::South,
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
            fill_opacity: 1.0,
            stroke_opacity: 1.0,
            rotation: 0.0,
            direction: Direction::East,
            flip_h: false,
            flip_v: false,
            dashed: false,
            dash_pattern: None,
            line_cap: LineCap::Flat,
            line_join: LineJoin::Miter,
            shadow: false,
            rounded: false,
            arc_size: None,
            curved: false,
            start_arrow: None,
            end_arrow: None,
            start_size: defaults.marker_size,
            end_size: defaults.marker_size,
            start_fill: true,
            end_fill: true,
            spacing: 2.0,
            image: None,
            indicator_color: None,
            pointer_events: true,
            stroke_tolerance: 0.0,
            style: Style::new(),
            value: None,
            bounding_box: None,
            defaults,
            node: None,
            gradients: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        self.painter.kind()
    }

    pub fn node(&self) -> Option<NodeRef> {
        self.node
    }

    /// Gradient ids referenced by the last paint.
    pub fn gradient_ids(&self) -> &[String] {
        &self.gradients
    }

    /// Create the backend node under `container`. Calling again keeps the
    /// existing node.
    pub fn init(&mut self, doc: &mut Document, container: NodeRef) -> NodeRef {
        if let Some(n) = self.node
            && doc.contains(n)
        {
            return n;
        }
        let n = doc.create("g");
        doc.append(container, n);
        self.node = Some(n);
        n
    }

    /// Copy the paint-relevant fields out of a resolved style.
    pub fn apply(&mut self, style: &Style) {
        let percent = |key: &str| (style.get_number(key, 100.0) / 100.0).clamp(0.0, 1.0);
        self.fill = style.get_color(keys::FILL_COLOR);
        self.gradient = style.get_color(keys::GRADIENT_COLOR);
        self.gradient_direction = style
            .get(keys::GRADIENT_DIRECTION)
            .and_then(Direction::parse)
            .unwrap_or(Direction::South);
        self.stroke = style.get_color(keys::STROKE_COLOR);
        self.stroke_width = style.get_number(keys::STROKE_WIDTH, 1.0);
        self.opacity = percent(keys::OPACITY);
        self.fill_opacity = percent(keys::FILL_OPACITY);
        self.stroke_opacity = percent(keys::STROKE_OPACITY);
        self.rotation = style.rotation();
        self.direction = style.direction();
        self.flip_h = style.get_bool(keys::FLIP_H, false);
        self.flip_v = style.get_bool(keys::FLIP_V, false);
        self.dashed = style.get_bool(keys::DASHED, false);
        self.dash_pattern = style.get(keys::DASH_PATTERN).map(str::to_string);
        self.line_cap = LineCap::parse(style.get_str("lineCap", "flat"));
        self.line_join = LineJoin::parse(style.get_str("lineJoin", "miter"));
        self.shadow = style.get_bool(keys::SHADOW, false);
        self.rounded = style.get_bool(keys::ROUNDED, false);
        self.arc_size = style.get(keys::ARC_SIZE).and_then(|v| v.parse().ok());
        self.curved = style.get_bool(keys::CURVED, false);
        self.start_arrow = style.get(keys::START_ARROW).map(str::to_string);
        self.end_arrow = style.get(keys::END_ARROW).map(str::to_string);
        self.start_size = style.get_number(keys::START_SIZE, self.defaults.marker_size);
        self.end_size = style.get_number(keys::END_SIZE, self.defaults.marker_size);
        self.start_fill = style.get_bool(keys::START_FILL, true);
        self.end_fill = style.get_bool(keys::END_FILL, true);
        self.spacing = style.get_number(keys::SPACING, 2.0);
        self.image = style.get(keys::IMAGE).map(str::to_string);
        self.indicator_color = style.get_color(keys::INDICATOR_COLOR);
        self.pointer_events = style.get_bool(keys::POINTER_EVENTS, true);
        self.style = style.clone();
    }

    /// Whether this shape is painted along its points.
    pub fn is_edge_shape(&self) -> bool {
        !self.points.is_empty()
    }

    /// Vertex shapes facing north or south paint into a box with width
    /// and height exchanged, then rotate into place.
    pub fn is_paint_bounds_inverted(&self) -> bool {
        !self.painter.is_stencil()
            && !self.is_edge_shape()
            && self.kind() != Some(ShapeKind::Text)
            && self.direction.is_inverted()
    }

    /// Style rotation plus the quarter turns implied by `direction`.
    pub fn shape_rotation(&self) -> f64 {
        let mut rot = self.rotation;
        if self.direction != Direction::East {
            rot += self.direction.rotation_offset();
        }
        dg_core::style::normalize_degrees(rot)
    }

    pub fn update_bounds_from_points(&mut self) {
        if let Some(b) = Bounds::from_points(&self.points) {
            self.bounds = b;
        }
    }

    /// Finite bounds with positive area. Point shapes may be flat along
    /// one axis; labels may be empty boxes anchored at a point.
    pub fn check_bounds(&self) -> bool {
        let b = &self.bounds;
        let finite = b.x.is_finite()
            && b.y.is_finite()
            && b.width.is_finite()
            && b.height.is_finite()
            && self.scale.is_finite()
            && self.scale > 0.0;
        if !finite {
            return false;
        }
        if self.kind() == Some(ShapeKind::Text) {
            b.width >= 0.0 && b.height >= 0.0
        } else if self.is_edge_shape() {
            b.width >= 0.0 && b.height >= 0.0 && (b.width > 0.0 || b.height > 0.0)
        } else {
            b.is_paintable()
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Repaint into the node. Returns `false` if the shape is hidden.
    pub fn redraw(&mut self, doc: &mut Document, measurer: &dyn TextMeasurer) -> bool {
        let Some(node) = self.node.filter(|n| doc.contains(*n)) else {
            log::warn!("redraw before init");
            return false;
        };
        if self.is_edge_shape() {
            self.update_bounds_from_points();
        }
        doc.clear_children(node);

        if !self.visible || !self.check_bounds() {
            doc.set_attr(node, "visibility", "hidden");
            self.bounding_box = None;
            self.release_gradients(doc);
            log::trace!("shape hidden, bounds {:?}", self.bounds);
            return false;
        }
        if let Some(e) = doc.element_mut(node) {
            e.remove_attr("visibility");
        }

        let acquired = {
            let mut canvas = SvgCanvas::new(doc, node, measurer, &self.defaults);
            canvas.pointer_events = self.pointer_events;
            canvas.set_stroke_tolerance(self.stroke_tolerance);
            self.paint(&mut canvas);
            canvas.take_gradients()
        };
        // Release after acquiring so unchanged gradients are not rebuilt.
        let previous = std::mem::replace(&mut self.gradients, acquired);
        for id in previous {
            doc.release_gradient(&id);
        }
        self.update_bounding_box();
        true
    }

    fn release_gradients(&mut self, doc: &mut Document) {
        for id in self.gradients.drain(..) {
            doc.release_gradient(&id);
        }
    }

    /// Remove the node and drop every gradient reference.
    pub fn destroy(&mut self, doc: &mut Document) {
        self.release_gradients(doc);
        if let Some(n) = self.node.take() {
            doc.remove(n);
        }
        self.bounding_box = None;
        log::debug!("shape destroyed");
    }

    // ─── Painting ───────────────────────────────────────────────────────

    pub fn paint(&self, c: &mut dyn Canvas2D) {
        let s = self.scale;
        let mut x = self.bounds.x / s;
        let mut y = self.bounds.y / s;
        let mut w = self.bounds.width / s;
        let mut h = self.bounds.height / s;
        if self.is_paint_bounds_inverted() {
            let t = (w - h) / 2.0;
            x += t;
            y -= t;
            std::mem::swap(&mut w, &mut h);
        }

        c.save();
        self.update_transform(c, x, y, w, h);
        self.configure_canvas(c, x, y, w, h);

        match &self.painter {
            Painter::Stencil(stencil) => stencil.draw_shape(c, self, x, y, w, h),
            Painter::Builtin(ShapeKind::Text) => text::paint_text(c, self, x, y, w, h),
            Painter::Custom(custom) => {
                c.set_stroke_width(self.stroke_width);
                if self.is_edge_shape() {
                    custom.paint_edge(c, self, &self.unscaled_points());
                } else {
                    custom.paint_background(c, self, x, y, w, h);
                    c.set_shadow(false);
                    custom.paint_foreground(c, self, x, y, w, h);
                }
            }
            Painter::Builtin(kind) => {
                c.set_stroke_width(self.stroke_width);
                if self.is_edge_shape() {
                    edge::paint_edge_shape(*kind, c, self, &self.unscaled_points());
                } else {
                    vertex::paint_background(*kind, c, self, x, y, w, h);
                    c.set_shadow(false);
                    vertex::paint_foreground(*kind, c, self, x, y, w, h);
                }
            }
        }
        c.restore();
    }

    fn unscaled_points(&self) -> Vec<Point> {
        self.points
            .iter()
            .map(|p| Point::new(p.x / self.scale, p.y / self.scale))
            .collect()
    }

    fn update_transform(&self, c: &mut dyn Canvas2D, x: f64, y: f64, w: f64, h: f64) {
        c.scale(self.scale);
        if self.is_edge_shape() || self.kind() == Some(ShapeKind::Text) {
            return;
        }
        let rotation = self.shape_rotation();
        if rotation != 0.0 || self.flip_h || self.flip_v {
            c.rotate(rotation, self.flip_h, self.flip_v, x + w / 2.0, y + h / 2.0);
        }
    }

    fn configure_canvas(&self, c: &mut dyn Canvas2D, x: f64, y: f64, w: f64, h: f64) {
        c.set_alpha(self.opacity);
        c.set_fill_alpha(self.fill_opacity);
        c.set_stroke_alpha(self.stroke_opacity);

        if let Some(color) = Color::parse(&self.defaults.shadow_color) {
            c.set_shadow_color(color);
        }
        c.set_shadow_alpha(self.defaults.shadow_opacity);
        c.set_shadow_offset(self.defaults.shadow_offset_x, self.defaults.shadow_offset_y);
        c.set_shadow(self.shadow);

        c.set_dashed(self.dashed);
        if let Some(pattern) = &self.dash_pattern {
            c.set_dash_pattern(pattern);
        }
        c.set_line_cap(self.line_cap);
        c.set_line_join(self.line_join);

        match (self.fill, self.gradient) {
            (Some(fill), Some(gradient)) => c.set_gradient(
                fill,
                gradient,
                x,
                y,
                w,
                h,
                self.gradient_direction,
                1.0,
                1.0,
            ),
            (fill, _) => c.set_fill_color(fill),
        }
        c.set_stroke_color(self.stroke);
    }

    // ─── Bounding box ───────────────────────────────────────────────────

    pub fn create_bounding_box(&self) -> Bounds {
        let mut bb = self.bounds;
        let stencil_inverted = self.painter.is_stencil() && self.direction.is_inverted();
        if stencil_inverted || self.is_paint_bounds_inverted() {
            let t = (bb.width - bb.height) / 2.0;
            bb.x += t;
            bb.y -= t;
            std::mem::swap(&mut bb.width, &mut bb.height);
        }
        bb
    }

    pub fn augment_bounding_box(&self, bb: &mut Bounds) {
        if self.shadow {
            bb.width += (self.defaults.shadow_offset_x * self.scale).ceil();
            bb.height += (self.defaults.shadow_offset_y * self.scale).ceil();
        }
        bb.grow(self.stroke_width * self.scale / 2.0);

        if self.is_edge_shape() && self.kind() == Some(ShapeKind::Connector) {
            let has = |arrow: &Option<String>| {
                arrow
                    .as_deref()
                    .and_then(marker::MarkerKind::parse)
                    .is_some()
            };
            let mut size: f64 = 0.0;
            if has(&self.start_arrow) {
                size = self.start_size + 1.0;
            }
            if has(&self.end_arrow) {
                size = size.max(self.end_size + 1.0);
            }
            bb.grow((size * self.scale).ceil());
        }
    }

    pub fn update_bounding_box(&mut self) {
        let mut bb = self.create_bounding_box();
        self.augment_bounding_box(&mut bb);
        if !self.is_edge_shape() {
            let rotation = self.shape_rotation();
            if rotation != 0.0 {
                bb = bb.rotated(rotation, None);
            }
        }
        self.bounding_box = Some(bb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::XmlCanvas;
    use crate::text::ApproximateMeasurer;
    use pretty_assertions::assert_eq;

    fn shape(kind: ShapeKind) -> Shape {
        Shape::new(Painter::Builtin(kind), Arc::new(ShapeDefaults::default()))
    }

    #[test]
    fn apply_reads_style_fields() {
        let mut s = shape(ShapeKind::Rectangle);
        let style = Style::parse("fillColor=#FF0000;strokeWidth=3;opacity=50;rotation=-90;direction=north;dashed=1")
            .unwrap();
        s.apply(&style);
        assert_eq!(s.fill, Color::parse("#FF0000"));
        assert_eq!(s.stroke_width, 3.0);
        assert_eq!(s.opacity, 0.5);
        assert_eq!(s.rotation, 270.0);
        assert_eq!(s.direction, Direction::North);
        assert!(s.dashed);
    }

    #[test]
    fn direction_adds_quarter_turns() {
        let mut s = shape(ShapeKind::Triangle);
        s.direction = Direction::South;
        s.rotation = 10.0;
        assert_eq!(s.shape_rotation(), 100.0);
        s.direction = Direction::North;
        assert_eq!(s.shape_rotation(), 280.0);
        s.direction = Direction::West;
        assert_eq!(s.shape_rotation(), 190.0);
    }

    #[test]
    fn inverted_bounding_box_swaps_and_rotates_back() {
        let mut s = shape(ShapeKind::Triangle).with_bounds(Bounds::new(0.0, 0.0, 100.0, 40.0));
        s.direction = Direction::South;
        s.stroke_width = 0.0;
        let bb = s.create_bounding_box();
        assert_eq!(bb, Bounds::new(30.0, -30.0, 40.0, 100.0));
        s.update_bounding_box();
        let bb = s.bounding_box.unwrap();
        assert!((bb.x - 0.0).abs() < 0.01);
        assert!((bb.width - 100.0).abs() < 0.01);
        assert!((bb.height - 40.0).abs() < 0.01);
    }

    #[test]
    fn bounding_box_grows_by_stroke_and_shadow() {
        let mut s = shape(ShapeKind::Rectangle).with_bounds(Bounds::new(10.0, 10.0, 20.0, 20.0));
        s.stroke_width = 4.0;
        s.shadow = true;
        s.update_bounding_box();
        assert_eq!(s.bounding_box, Some(Bounds::new(8.0, 8.0, 26.0, 27.0)));
    }

    #[test]
    fn connector_bounding_box_includes_markers() {
        let mut s = shape(ShapeKind::Connector)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        s.update_bounds_from_points();
        s.end_arrow = Some("classic".into());
        s.stroke_width = 0.0;
        s.update_bounding_box();
        assert_eq!(s.bounding_box, Some(Bounds::new(-7.0, -7.0, 114.0, 14.0)));
    }

    #[test]
    fn vertex_paint_disables_shadow_before_foreground() {
        let mut doc = Document::new("output");
        let root = doc.root();
        let mut s = shape(ShapeKind::Cylinder).with_bounds(Bounds::new(0.0, 0.0, 40.0, 60.0));
        s.shadow = true;
        let calls = {
            let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
            s.paint(&mut c);
            c.calls()
        };
        let bg = calls.iter().position(|c| c == "fillstroke").unwrap();
        let off = calls.iter().rposition(|c| c == "shadow").unwrap();
        let fg = calls.iter().rposition(|c| c == "stroke").unwrap();
        assert!(bg < off && off < fg);
        assert_eq!(calls.first().map(String::as_str), Some("save"));
        assert_eq!(calls.last().map(String::as_str), Some("restore"));
    }

    #[test]
    fn init_is_idempotent() {
        let mut doc = Document::svg();
        let root = doc.root();
        let mut s = shape(ShapeKind::Rectangle);
        let a = s.init(&mut doc, root);
        let b = s.init(&mut doc, root);
        assert_eq!(a, b);
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn redraw_clears_previous_content() {
        let mut doc = Document::svg();
        let root = doc.root();
        let m = ApproximateMeasurer::default();
        let mut s = shape(ShapeKind::Rectangle).with_bounds(Bounds::new(0.0, 0.0, 10.0, 10.0));
        s.fill = Some(Color::WHITE);
        let node = s.init(&mut doc, root);
        assert!(s.redraw(&mut doc, &m));
        assert!(s.redraw(&mut doc, &m));
        assert_eq!(doc.children(node).len(), 1);
    }
}
