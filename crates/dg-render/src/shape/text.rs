//! Cell labels: placement of the label box and the label painter.

use super::Shape;
use crate::canvas::{Canvas2D, TextOptions};
use crate::text::{FontStyle, HAlign, TextFormat, VAlign};
use dg_core::geom::rotate_point;
use dg_core::style::{keys, normalize_degrees};
use dg_core::{Bounds, CellState, Geometry, Point, ShapeDefaults, Style};

/// Rotation of a label: `labelRotation` when set, else the cell's.
pub fn text_rotation(style: &Style) -> f64 {
    match style.get(keys::LABEL_ROTATION).and_then(|v| v.parse::<f64>().ok()) {
        Some(r) if r.is_finite() => normalize_degrees(r),
        _ => style.rotation(),
    }
}

pub fn text_options(style: &Style) -> TextOptions {
    TextOptions {
        align: HAlign::parse(style.get_str(keys::ALIGN, "center")),
        valign: VAlign::parse(style.get_str(keys::VERTICAL_ALIGN, "middle")),
        wrap: style.get_str(keys::WHITE_SPACE, "nowrap") == "wrap",
        format: if style.get_bool(keys::HTML, false) {
            TextFormat::Html
        } else {
            TextFormat::Plain
        },
        clip: style.get_str("overflow", "visible") == "hidden",
        rotation: 0.0,
        horizontal: style.get_bool(keys::HORIZONTAL, true),
    }
}

/// Screen box the label of `state` is laid out in.
///
/// Edge labels are centered on the route midpoint plus the label offset,
/// sized by the edge geometry. Vertex labels fill the cell (or a
/// swimlane's title bar) and follow the label rotation around the cell
/// center.
pub fn label_bounds(
    state: &CellState,
    geometry: Option<&Geometry>,
    scale: f64,
    defaults: &ShapeDefaults,
) -> Bounds {
    let style = &state.style;
    let spacing = Point::new(
        style.get_number("spacingLeft", 0.0) - style.get_number("spacingRight", 0.0),
        style.get_number("spacingTop", 0.0) - style.get_number("spacingBottom", 0.0),
    );
    if state.is_edge() {
        let (w, h) = geometry.map_or((0.0, 0.0), |g| {
            ((g.bounds.width * scale).max(0.0), (g.bounds.height * scale).max(0.0))
        });
        return Bounds::new(
            state.absolute_offset.x + spacing.x * scale - w / 2.0,
            state.absolute_offset.y + spacing.y * scale - h / 2.0,
            w,
            h,
        );
    }

    let mut b = Bounds::new(
        state.bounds.x + state.absolute_offset.x,
        state.bounds.y + state.absolute_offset.y,
        state.bounds.width.max(1.0),
        state.bounds.height.max(1.0),
    );
    if style.get(keys::SHAPE) == Some("swimlane") {
        let size = style.get_number(keys::START_SIZE, defaults.swimlane_start_size) * scale;
        if style.get_bool(keys::HORIZONTAL, true) {
            b.height = size.min(b.height);
        } else {
            b.width = size.min(b.width);
        }
    }

    let theta = text_rotation(style);
    if theta != 0.0 {
        let center = state.center();
        let own = b.center();
        if own != center {
            let (sin, cos) = theta.to_radians().sin_cos();
            let moved = rotate_point(own, cos, sin, center);
            b.x += moved.x - own.x;
            b.y += moved.y - own.y;
        }
    }
    b
}

/// Paint `shape.value` into the box, inset by the spacing.
pub(crate) fn paint_text(c: &mut dyn Canvas2D, shape: &Shape, x: f64, y: f64, w: f64, h: f64) {
    let Some(value) = shape.value.as_deref().filter(|v| !v.is_empty()) else {
        return;
    };
    let style = &shape.style;
    c.set_font_color(style.get_color(keys::FONT_COLOR));
    c.set_font_size(style.get_number(keys::FONT_SIZE, shape.defaults.font_size));
    c.set_font_family(style.get_str(keys::FONT_FAMILY, &shape.defaults.font_family));
    c.set_font_style(FontStyle(style.get_number(keys::FONT_STYLE, 0.0) as u8));
    c.set_font_background_color(style.get_color(keys::LABEL_BACKGROUND_COLOR));
    c.set_font_border_color(style.get_color(keys::LABEL_BORDER_COLOR));

    let mut options = text_options(style);
    options.rotation = shape.rotation;

    let sp = shape.spacing;
    let (x, y, w, h) = if w > 2.0 * sp && h > 2.0 * sp {
        (x + sp, y + sp, w - 2.0 * sp, h - 2.0 * sp)
    } else {
        (x, y, w, h)
    };
    c.text(x, y, w, h, value, &options);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::{CellId, CellKind};
    use pretty_assertions::assert_eq;

    fn vertex_state(style: &str, bounds: Bounds) -> CellState {
        CellState {
            cell: CellId::intern("v"),
            kind: CellKind::Vertex,
            style: Style::parse(style).unwrap(),
            bounds,
            origin: Point::ZERO,
            absolute_points: Vec::new(),
            absolute_offset: Point::ZERO,
            value: Some("label".into()),
            source: None,
            target: None,
            parent: None,
        }
    }

    #[test]
    fn swimlane_label_uses_title_bar() {
        let s = vertex_state("shape=swimlane;startSize=30", Bounds::new(0.0, 0.0, 200.0, 100.0));
        let b = label_bounds(&s, None, 1.0, &ShapeDefaults::default());
        assert_eq!(b, Bounds::new(0.0, 0.0, 200.0, 30.0));
        let s = vertex_state(
            "shape=swimlane;startSize=30;horizontal=0",
            Bounds::new(0.0, 0.0, 200.0, 100.0),
        );
        let b = label_bounds(&s, None, 2.0, &ShapeDefaults::default());
        assert_eq!(b, Bounds::new(0.0, 0.0, 60.0, 100.0));
    }

    #[test]
    fn offset_label_rotates_about_cell_center() {
        let mut s = vertex_state("labelRotation=180", Bounds::new(0.0, 0.0, 100.0, 100.0));
        s.absolute_offset = Point::new(10.0, 0.0);
        let b = label_bounds(&s, None, 1.0, &ShapeDefaults::default());
        assert!((b.x - -10.0).abs() < 0.01);
        assert!((b.y - 0.0).abs() < 0.01);
        assert_eq!(b.width, 100.0);
    }

    #[test]
    fn edge_label_is_centered_on_offset() {
        let mut s = vertex_state("", Bounds::default());
        s.kind = CellKind::Edge;
        s.absolute_offset = Point::new(50.0, 20.0);
        let mut geo = Geometry::edge();
        geo.bounds.width = 40.0;
        geo.bounds.height = 10.0;
        let b = label_bounds(&s, Some(&geo), 1.0, &ShapeDefaults::default());
        assert_eq!(b, Bounds::new(30.0, 15.0, 40.0, 10.0));
    }

    #[test]
    fn label_rotation_overrides_cell_rotation() {
        let style = Style::parse("rotation=30;labelRotation=-90").unwrap();
        assert_eq!(text_rotation(&style), 270.0);
        let style = Style::parse("rotation=30").unwrap();
        assert_eq!(text_rotation(&style), 30.0);
    }
}
