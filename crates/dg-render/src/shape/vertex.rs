//! Built-in vertex painters.
//!
//! Coordinates are unscaled; the surface carries the scale. Each kind
//! paints a background (the part that casts the shadow) and optionally a
//! foreground drawn with the shadow off.

use super::{edge, Shape, ShapeKind};
use crate::canvas::Canvas2D;
use dg_core::style::keys;

#[allow(clippy::too_many_arguments)]
pub(crate) fn paint_background(
    kind: ShapeKind,
    c: &mut dyn Canvas2D,
    shape: &Shape,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) {
    match kind {
        ShapeKind::Rectangle | ShapeKind::Label => paint_rect(c, shape, x, y, w, h),
        ShapeKind::Ellipse | ShapeKind::DoubleEllipse => {
            c.ellipse(x, y, w, h);
            c.fill_and_stroke();
        }
        ShapeKind::Rhombus => {
            let (hw, hh) = (w / 2.0, h / 2.0);
            c.begin();
            c.move_to(x + hw, y);
            c.line_to(x + w, y + hh);
            c.line_to(x + hw, y + h);
            c.line_to(x, y + hh);
            c.close();
            c.fill_and_stroke();
        }
        ShapeKind::Triangle => {
            c.begin();
            c.move_to(x, y);
            c.line_to(x + w, y + h / 2.0);
            c.line_to(x, y + h);
            c.close();
            c.fill_and_stroke();
        }
        ShapeKind::Hexagon => {
            c.begin();
            c.move_to(x + 0.25 * w, y);
            c.line_to(x + 0.75 * w, y);
            c.line_to(x + w, y + 0.5 * h);
            c.line_to(x + 0.75 * w, y + h);
            c.line_to(x + 0.25 * w, y + h);
            c.line_to(x, y + 0.5 * h);
            c.close();
            c.fill_and_stroke();
        }
        ShapeKind::Cloud => paint_cloud(c, x, y, w, h),
        ShapeKind::Actor => paint_actor(c, x, y, w, h),
        ShapeKind::Cylinder => {
            let dy = cylinder_cap(h);
            c.begin();
            c.move_to(x, y + dy);
            c.curve_to(x, y - dy / 3.0, x + w, y - dy / 3.0, x + w, y + dy);
            c.line_to(x + w, y + h - dy);
            c.curve_to(x + w, y + h + dy / 3.0, x, y + h + dy / 3.0, x, y + h - dy);
            c.close();
            c.fill_and_stroke();
        }
        ShapeKind::Swimlane => paint_swimlane(c, shape, x, y, w, h),
        ShapeKind::Image => {
            if shape.fill.is_some() || shape.stroke.is_some() {
                c.rect(x, y, w, h);
                c.fill_and_stroke();
            }
        }
        ShapeKind::Line => {
            c.begin();
            if shape.direction.is_inverted() {
                c.move_to(x + w / 2.0, y);
                c.line_to(x + w / 2.0, y + h);
            } else {
                c.move_to(x, y + h / 2.0);
                c.line_to(x + w, y + h / 2.0);
            }
            c.stroke();
        }
        ShapeKind::Arrow | ShapeKind::Connector | ShapeKind::Polyline => {
            // Edge kinds bound to a box paint a straight line through it.
            let pts = [
                dg_core::Point::new(x, y + h / 2.0),
                dg_core::Point::new(x + w, y + h / 2.0),
            ];
            edge::paint_polyline(c, shape, &pts);
        }
        ShapeKind::Text => {}
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn paint_foreground(
    kind: ShapeKind,
    c: &mut dyn Canvas2D,
    shape: &Shape,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) {
    match kind {
        ShapeKind::DoubleEllipse => {
            let inset = (4.0 + shape.stroke_width).min((w / 5.0).min(h / 5.0));
            c.ellipse(x + inset, y + inset, w - 2.0 * inset, h - 2.0 * inset);
            c.stroke();
        }
        ShapeKind::Cylinder => {
            let dy = cylinder_cap(h);
            c.begin();
            c.move_to(x, y + dy);
            c.curve_to(x, y + 2.0 * dy, x + w, y + 2.0 * dy, x + w, y + dy);
            c.stroke();
        }
        ShapeKind::Label => paint_label_decorations(c, shape, x, y, w, h),
        ShapeKind::Image => {
            if let Some(src) = &shape.image {
                let aspect = shape.style.get_str(keys::ASPECT, "variable") == "fixed";
                c.image(x, y, w, h, src, aspect, shape.flip_h, shape.flip_v);
            }
        }
        _ => {}
    }
}

fn cylinder_cap(h: f64) -> f64 {
    (h / 5.0).floor().min(40.0)
}

/// Corner radius for `rounded=1` boxes: `arcSize` percent of the smaller
/// side, or the configured rounding factor.
pub(crate) fn corner_radius(shape: &Shape, w: f64, h: f64) -> f64 {
    let factor = shape
        .arc_size
        .map_or(shape.defaults.rounding_factor, |a| a / 100.0);
    (w * factor).min(h * factor)
}

fn paint_rect(c: &mut dyn Canvas2D, shape: &Shape, x: f64, y: f64, w: f64, h: f64) {
    if shape.rounded {
        let r = corner_radius(shape, w, h);
        c.roundrect(x, y, w, h, r, r);
    } else {
        c.rect(x, y, w, h);
    }
    c.fill_and_stroke();
}

fn paint_cloud(c: &mut dyn Canvas2D, x: f64, y: f64, w: f64, h: f64) {
    c.translate(x, y);
    c.begin();
    c.move_to(0.25 * w, 0.25 * h);
    c.curve_to(0.05 * w, 0.25 * h, 0.0, 0.5 * h, 0.16 * w, 0.55 * h);
    c.curve_to(0.0, 0.66 * h, 0.18 * w, 0.9 * h, 0.31 * w, 0.8 * h);
    c.curve_to(0.4 * w, h, 0.7 * w, h, 0.8 * w, 0.8 * h);
    c.curve_to(w, 0.8 * h, w, 0.6 * h, 0.875 * w, 0.5 * h);
    c.curve_to(w, 0.3 * h, 0.8 * w, 0.1 * h, 0.625 * w, 0.2 * h);
    c.curve_to(0.5 * w, 0.05 * h, 0.3 * w, 0.05 * h, 0.25 * w, 0.25 * h);
    c.close();
    c.fill_and_stroke();
    c.translate(-x, -y);
}

fn paint_actor(c: &mut dyn Canvas2D, x: f64, y: f64, w: f64, h: f64) {
    let width = w / 3.0;
    c.translate(x, y);
    c.begin();
    c.move_to(0.0, h);
    c.curve_to(0.0, 3.0 * h / 5.0, 0.0, 2.0 * h / 5.0, w / 2.0, 2.0 * h / 5.0);
    c.curve_to(w / 2.0 - width, 2.0 * h / 5.0, w / 2.0 - width, 0.0, w / 2.0, 0.0);
    c.curve_to(w / 2.0 + width, 0.0, w / 2.0 + width, 2.0 * h / 5.0, w / 2.0, 2.0 * h / 5.0);
    c.curve_to(w, 2.0 * h / 5.0, w, 3.0 * h / 5.0, w, h);
    c.close();
    c.fill_and_stroke();
    c.translate(-x, -y);
}

/// Title bar plus content area. The bar uses the fill color; the
/// content area uses `swimlaneFillColor` and is only outlined without it.
fn paint_swimlane(c: &mut dyn Canvas2D, shape: &Shape, x: f64, y: f64, w: f64, h: f64) {
    let horizontal = shape.style.get_bool(keys::HORIZONTAL, true);
    let start = shape
        .style
        .get_number(keys::START_SIZE, shape.defaults.swimlane_start_size);
    let (bar, content) = if horizontal {
        let s = start.min(h);
        ((x, y, w, s), (x, y + s, w, h - s))
    } else {
        let s = start.min(w);
        ((x, y, s, h), (x + s, y, w - s, h))
    };

    c.rect(bar.0, bar.1, bar.2, bar.3);
    c.fill_and_stroke();

    let lane_fill = shape.style.get_color(keys::SWIMLANE_FILL_COLOR);
    c.set_fill_color(lane_fill);
    c.rect(content.0, content.1, content.2, content.3);
    if lane_fill.is_some() {
        c.fill_and_stroke();
    } else {
        c.stroke();
    }
}

/// Image at the leading edge and an optional indicator dot.
fn paint_label_decorations(c: &mut dyn Canvas2D, shape: &Shape, x: f64, y: f64, w: f64, h: f64) {
    let spacing = shape.spacing;
    if let Some(src) = &shape.image {
        let iw = shape.style.get_number(keys::IMAGE_WIDTH, 24.0);
        let ih = shape.style.get_number(keys::IMAGE_HEIGHT, 24.0);
        c.image(x + spacing, y + (h - ih) / 2.0, iw, ih, src, true, false, false);
    }
    if let Some(color) = shape.indicator_color {
        let size = (w.min(h) / 4.0).min(10.0);
        let ix = x + w - size - spacing;
        let iy = y + (h - size) / 2.0;
        c.set_fill_color(Some(color));
        c.set_stroke_color(None);
        match shape.style.get_str(keys::INDICATOR_SHAPE, "ellipse") {
            "rectangle" => c.rect(ix, iy, size, size),
            _ => c.ellipse(ix, iy, size, size),
        }
        c.fill();
    }
}
