//! Recording surface: every call becomes an element under the output
//! node, in call order. Used to replay drawings and to assert on the
//! exact paint sequence a shape produces.

use super::{fmt_num, Canvas2D, CanvasCore, LineCap, LineJoin, TextOptions};
use crate::markup::{Document, NodeRef};
use crate::text::{FontStyle, TextFormat};
use dg_core::{Color, Direction, ShapeDefaults};

pub struct XmlCanvas<'d> {
    core: CanvasCore,
    doc: &'d mut Document,
    parent: NodeRef,
}

fn color_str(c: Option<Color>) -> String {
    c.map_or_else(|| "none".to_string(), |c| c.to_hex())
}

impl<'d> XmlCanvas<'d> {
    pub fn new(doc: &'d mut Document, parent: NodeRef, defaults: &ShapeDefaults) -> Self {
        Self {
            core: CanvasCore::new(defaults),
            doc,
            parent,
        }
    }

    fn record(&mut self, tag: &str, attrs: &[(&str, String)]) {
        let n = self.doc.create(tag);
        for (k, v) in attrs {
            self.doc.set_attr(n, k, v);
        }
        self.doc.append(self.parent, n);
    }

    /// Tags of the recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.doc
            .children(self.parent)
            .iter()
            .filter_map(|&n| self.doc.element(n).map(|e| e.tag.clone()))
            .collect()
    }
}

impl Canvas2D for XmlCanvas<'_> {
    fn core(&self) -> &CanvasCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CanvasCore {
        &mut self.core
    }

    fn save(&mut self) {
        self.core.save();
        self.record("save", &[]);
    }

    fn restore(&mut self) {
        self.core.restore();
        self.record("restore", &[]);
    }

    fn scale(&mut self, value: f64) {
        let s = &mut self.core.state;
        s.scale *= value;
        s.stroke_width *= value;
        self.record("scale", &[("scale", fmt_num(value))]);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.core.state.dx += dx;
        self.core.state.dy += dy;
        self.record("translate", &[("dx", fmt_num(dx)), ("dy", fmt_num(dy))]);
    }

    fn rotate(&mut self, theta: f64, flip_h: bool, flip_v: bool, cx: f64, cy: f64) {
        self.core.rotate(theta, flip_h, flip_v, cx, cy);
        self.record(
            "rotate",
            &[
                ("theta", fmt_num(theta)),
                ("flipH", u8::from(flip_h).to_string()),
                ("flipV", u8::from(flip_v).to_string()),
                ("cx", fmt_num(cx)),
                ("cy", fmt_num(cy)),
            ],
        );
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.core.state.alpha = alpha;
        self.record("alpha", &[("alpha", fmt_num(alpha))]);
    }

    fn set_fill_alpha(&mut self, alpha: f64) {
        self.core.state.fill_alpha = alpha;
        self.record("fillalpha", &[("alpha", fmt_num(alpha))]);
    }

    fn set_stroke_alpha(&mut self, alpha: f64) {
        self.core.state.stroke_alpha = alpha;
        self.record("strokealpha", &[("alpha", fmt_num(alpha))]);
    }

    fn set_fill_color(&mut self, color: Option<Color>) {
        self.core.state.fill = color;
        self.core.state.gradient = None;
        self.record("fillcolor", &[("color", color_str(color))]);
    }

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
        let p = self.core.pt(x, y);
        let bounds = dg_core::Bounds::new(p.x, p.y, self.core.len(w), self.core.len(h));
        self.core.state.gradient = Some(super::GradientFill {
            start,
            end,
            alpha1,
            alpha2,
            direction,
            bounds,
        });
        self.core.state.fill = Some(start);
        self.record(
            "gradient",
            &[
                ("c1", start.to_hex()),
                ("c2", end.to_hex()),
                ("x", fmt_num(x)),
                ("y", fmt_num(y)),
                ("w", fmt_num(w)),
                ("h", fmt_num(h)),
                ("direction", direction.as_str().to_string()),
                ("alpha1", fmt_num(alpha1)),
                ("alpha2", fmt_num(alpha2)),
            ],
        );
    }

    fn set_stroke_color(&mut self, color: Option<Color>) {
        self.core.state.stroke = color;
        self.record("strokecolor", &[("color", color_str(color))]);
    }

    fn set_stroke_width(&mut self, width: f64) {
        self.core.state.stroke_width = width * self.core.state.scale;
        self.record("strokewidth", &[("width", fmt_num(width))]);
    }

    fn set_dashed(&mut self, dashed: bool) {
        self.core.state.dashed = dashed;
        self.record("dashed", &[("dashed", u8::from(dashed).to_string())]);
    }

    fn set_dash_pattern(&mut self, pattern: &str) {
        self.core.state.dash_pattern = pattern.to_string();
        self.record("dashpattern", &[("pattern", pattern.to_string())]);
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.core.state.line_cap = cap;
        self.record("linecap", &[("cap", cap.as_str().to_string())]);
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.core.state.line_join = join;
        self.record("linejoin", &[("join", join.as_str().to_string())]);
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.core.state.miter_limit = limit;
        self.record("miterlimit", &[("limit", fmt_num(limit))]);
    }

    fn set_font_color(&mut self, color: Option<Color>) {
        self.core.state.font_color = color;
        self.record("fontcolor", &[("color", color_str(color))]);
    }

    fn set_font_size(&mut self, size: f64) {
        self.core.state.font_size = size;
        self.record("fontsize", &[("size", fmt_num(size))]);
    }

    fn set_font_family(&mut self, family: &str) {
        self.core.state.font_family = family.to_string();
        self.record("fontfamily", &[("family", family.to_string())]);
    }

    fn set_font_style(&mut self, style: FontStyle) {
        self.core.state.font_style = style;
        self.record("fontstyle", &[("style", style.0.to_string())]);
    }

    fn set_shadow(&mut self, enabled: bool) {
        self.core.state.shadow = enabled;
        self.record("shadow", &[("enabled", u8::from(enabled).to_string())]);
    }

    fn begin(&mut self) {
        self.core.begin();
        self.record("begin", &[]);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.core.move_to(x, y);
        self.record("move", &[("x", fmt_num(x)), ("y", fmt_num(y))]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.core.line_to(x, y);
        self.record("line", &[("x", fmt_num(x)), ("y", fmt_num(y))]);
    }

    fn quad_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.core.quad_to(x1, y1, x2, y2);
        self.record(
            "quad",
            &[
                ("x1", fmt_num(x1)),
                ("y1", fmt_num(y1)),
                ("x2", fmt_num(x2)),
                ("y2", fmt_num(y2)),
            ],
        );
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.core.curve_to(x1, y1, x2, y2, x3, y3);
        self.record(
            "curve",
            &[
                ("x1", fmt_num(x1)),
                ("y1", fmt_num(y1)),
                ("x2", fmt_num(x2)),
                ("y2", fmt_num(y2)),
                ("x3", fmt_num(x3)),
                ("y3", fmt_num(y3)),
            ],
        );
    }

    fn close(&mut self) {
        self.core.close();
        self.record("close", &[]);
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.core.rect(x, y, w, h, 0.0, 0.0);
        self.record(
            "rect",
            &[("x", fmt_num(x)), ("y", fmt_num(y)), ("w", fmt_num(w)), ("h", fmt_num(h))],
        );
    }

    fn roundrect(&mut self, x: f64, y: f64, w: f64, h: f64, dx: f64, dy: f64) {
        self.core.rect(x, y, w, h, dx, dy);
        self.record(
            "roundrect",
            &[
                ("x", fmt_num(x)),
                ("y", fmt_num(y)),
                ("w", fmt_num(w)),
                ("h", fmt_num(h)),
                ("dx", fmt_num(dx)),
                ("dy", fmt_num(dy)),
            ],
        );
    }

    fn ellipse(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.core.ellipse(x, y, w, h);
        self.record(
            "ellipse",
            &[("x", fmt_num(x)), ("y", fmt_num(y)), ("w", fmt_num(w)), ("h", fmt_num(h))],
        );
    }

    fn fill(&mut self) {
        self.core.take_pending();
        self.record("fill", &[]);
    }

    fn stroke(&mut self) {
        self.core.take_pending();
        self.record("stroke", &[]);
    }

    fn fill_and_stroke(&mut self) {
        self.core.take_pending();
        self.record("fillstroke", &[]);
    }

    fn clip(&mut self) {
        self.core.take_pending();
        self.record("clip", &[]);
    }

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
    ) {
        self.record(
            "image",
            &[
                ("x", fmt_num(x)),
                ("y", fmt_num(y)),
                ("w", fmt_num(w)),
                ("h", fmt_num(h)),
                ("src", src.to_string()),
                ("aspect", u8::from(aspect).to_string()),
                ("flipH", u8::from(flip_h).to_string()),
                ("flipV", u8::from(flip_v).to_string()),
            ],
        );
    }

    fn text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, options: &TextOptions) {
        let format = match options.format {
            TextFormat::Plain => "",
            TextFormat::Html => "html",
        };
        self.record(
            "text",
            &[
                ("x", fmt_num(x)),
                ("y", fmt_num(y)),
                ("w", fmt_num(w)),
                ("h", fmt_num(h)),
                ("str", text.to_string()),
                ("format", format.to_string()),
                ("rotation", fmt_num(options.rotation)),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn calls_are_recorded_in_order() {
        let mut doc = Document::new("output");
        let root = doc.root();
        let calls = {
            let mut c = XmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
            c.save();
            c.set_stroke_color(Some(Color::BLACK));
            c.begin();
            c.move_to(0.0, 0.0);
            c.line_to(1.5, 2.0);
            c.stroke();
            c.restore();
            c.calls()
        };
        assert_eq!(
            calls,
            vec!["save", "strokecolor", "begin", "move", "line", "stroke", "restore"]
        );
        assert_eq!(
            doc.to_markup(),
            "<output><save/><strokecolor color=\"#000000\"/><begin/><move x=\"0\" y=\"0\"/>\
             <line x=\"1.5\" y=\"2\"/><stroke/><restore/></output>"
        );
    }
}
