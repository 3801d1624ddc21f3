//! VML-style surface.
//!
//! Coordinates are rounded to integers, paths use the `m/l/c/x/e`
//! command letters, and paint attributes ride on child `<v:fill>`,
//! `<v:stroke>` and `<v:shadow>` elements. Rotation and flipping are
//! expressed in the element's style rather than a transform.

use super::{fmt_num, Canvas2D, CanvasCore, CanvasState, PathSeg, Primitive, TextOptions};
use super::html::{box_css, font_css};
use crate::markup::{escape_xml, Document, NodeRef};
use crate::text::TextFormat;
use dg_core::{Direction, Point, ShapeDefaults};
use std::fmt::Write;

fn vi(v: f64) -> i64 {
    v.round() as i64
}

/// Quadratic segments have no VML command; they are raised to cubics.
pub fn vml_path(segs: &[PathSeg]) -> String {
    let mut d = String::new();
    let mut last = Point::ZERO;
    for seg in segs {
        let _ = match *seg {
            PathSeg::Move(p) => {
                last = p;
                write!(d, "m {} {} ", vi(p.x), vi(p.y))
            }
            PathSeg::Line(p) => {
                last = p;
                write!(d, "l {} {} ", vi(p.x), vi(p.y))
            }
            PathSeg::Quad(c, p) => {
                let c1 = last + (c - last) * (2.0 / 3.0);
                let c2 = p + (c - p) * (2.0 / 3.0);
                last = p;
                write!(
                    d,
                    "c {} {} {} {} {} {} ",
                    vi(c1.x),
                    vi(c1.y),
                    vi(c2.x),
                    vi(c2.y),
                    vi(p.x),
                    vi(p.y)
                )
            }
            PathSeg::Curve(c1, c2, p) => {
                last = p;
                write!(
                    d,
                    "c {} {} {} {} {} {} ",
                    vi(c1.x),
                    vi(c1.y),
                    vi(c2.x),
                    vi(c2.y),
                    vi(p.x),
                    vi(p.y)
                )
            }
            PathSeg::Close => write!(d, "x "),
        };
    }
    d.push('e');
    d
}

fn dash_style(s: &CanvasState) -> String {
    // VML dash lengths are in stroke-width units already.
    let parts: Vec<String> = s
        .dash_pattern
        .split_whitespace()
        .filter_map(|p| p.parse::<f64>().ok())
        .map(|v| vi(v).to_string())
        .collect();
    if parts.is_empty() {
        "dash".to_string()
    } else {
        parts.join(" ")
    }
}

pub struct VmlCanvas<'d> {
    core: CanvasCore,
    doc: &'d mut Document,
    parent: NodeRef,
}

impl<'d> VmlCanvas<'d> {
    pub fn new(doc: &'d mut Document, parent: NodeRef, defaults: &ShapeDefaults) -> Self {
        Self {
            core: CanvasCore::new(defaults),
            doc,
            parent,
        }
    }

    fn rotation_style(s: &CanvasState) -> String {
        let mut css = String::new();
        if s.rotation != 0.0 {
            css.push_str(&format!("rotation:{};", vi(s.rotation)));
        }
        match (s.flip_h, s.flip_v) {
            (true, true) => css.push_str("flip:x y;"),
            (true, false) => css.push_str("flip:x;"),
            (false, true) => css.push_str("flip:y;"),
            _ => {}
        }
        css
    }

    fn create_element(&mut self, primitive: &Primitive) -> NodeRef {
        match primitive {
            Primitive::Path { segs, .. } => {
                let n = self.doc.create("v:shape");
                self.doc.set_attr(
                    n,
                    "style",
                    "position:absolute;left:0px;top:0px;width:1px;height:1px;",
                );
                self.doc.set_attr(n, "coordsize", "1 1");
                self.doc.set_attr(n, "path", vml_path(segs));
                n
            }
            Primitive::Rect { x, y, w, h, rx, ry } => {
                let rounded = *rx > 0.0 || *ry > 0.0;
                let n = self.doc.create(if rounded { "v:roundrect" } else { "v:rect" });
                if rounded {
                    let arc = (rx / w.min(*h).max(1.0)).min(0.5);
                    self.doc.set_attr(n, "arcsize", format!("{}%", vi(arc * 100.0)));
                }
                self.doc
                    .set_attr(n, "style", box_css(vi(*x) as f64, vi(*y) as f64, vi(*w) as f64, vi(*h) as f64));
                n
            }
            Primitive::Ellipse { cx, cy, rx, ry } => {
                let n = self.doc.create("v:oval");
                self.doc.set_attr(
                    n,
                    "style",
                    box_css(
                        vi(cx - rx) as f64,
                        vi(cy - ry) as f64,
                        vi(rx * 2.0) as f64,
                        vi(ry * 2.0) as f64,
                    ),
                );
                n
            }
        }
    }

    fn add_node(&mut self, filled: bool, stroked: bool) {
        let Some(primitive) = self.core.take_pending() else {
            return;
        };
        let s = self.core.state.clone();
        let node = self.create_element(&primitive);
        let rotation = Self::rotation_style(&s);
        if !rotation.is_empty()
            && let Some(style) = self.doc.attr(node, "style").map(str::to_string)
        {
            self.doc.set_attr(node, "style", format!("{style}{rotation}"));
        }

        let fill_color = s.fill.filter(|_| filled);
        self.doc
            .set_attr(node, "filled", if fill_color.is_some() { "true" } else { "false" });
        if let Some(c) = fill_color {
            self.doc.set_attr(node, "fillcolor", c.to_hex());
            let fill = self.doc.create("v:fill");
            if let Some(g) = &s.gradient {
                let angle = match g.direction {
                    Direction::South => 180,
                    Direction::East => 90,
                    Direction::North => 0,
                    Direction::West => 270,
                };
                self.doc.set_attr(fill, "type", "gradient");
                self.doc.set_attr(fill, "color2", g.end.to_hex());
                self.doc.set_attr(fill, "angle", angle);
                if g.alpha1 < 1.0 || g.alpha2 < 1.0 {
                    self.doc.set_attr(fill, "opacity", fmt_num(g.alpha1 * s.alpha));
                    self.doc.set_attr(fill, "o:opacity2", fmt_num(g.alpha2 * s.alpha));
                }
            }
            let opacity = s.alpha * s.fill_alpha;
            if opacity < 1.0 {
                self.doc.set_attr(fill, "opacity", fmt_num(opacity));
            }
            if self.doc.element(fill).is_some_and(|e| !e.attrs.is_empty()) {
                self.doc.append(node, fill);
            } else {
                self.doc.remove(fill);
            }
        }

        let stroke_color = s.stroke.filter(|_| stroked);
        self.doc
            .set_attr(node, "stroked", if stroke_color.is_some() { "true" } else { "false" });
        if let Some(c) = stroke_color {
            self.doc.set_attr(node, "strokecolor", c.to_hex());
            self.doc
                .set_attr(node, "strokeweight", format!("{}px", fmt_num(s.stroke_width.max(1.0))));
            let stroke = self.doc.create("v:stroke");
            self.doc.set_attr(stroke, "endcap", s.line_cap.as_str());
            self.doc.set_attr(stroke, "joinstyle", s.line_join.as_str());
            self.doc.set_attr(stroke, "miterlimit", fmt_num(s.miter_limit));
            if s.dashed {
                self.doc.set_attr(stroke, "dashstyle", dash_style(&s));
            }
            let opacity = s.alpha * s.stroke_alpha;
            if opacity < 1.0 {
                self.doc.set_attr(stroke, "opacity", fmt_num(opacity));
            }
            self.doc.append(node, stroke);
        }

        if s.shadow {
            let shadow = self.doc.create("v:shadow");
            self.doc.set_attr(shadow, "on", "true");
            self.doc.set_attr(shadow, "color", s.shadow_color.to_hex());
            self.doc.set_attr(
                shadow,
                "offset",
                format!(
                    "{}px,{}px",
                    vi(s.shadow_dx * s.scale),
                    vi(s.shadow_dy * s.scale)
                ),
            );
            if s.shadow_alpha < 1.0 {
                self.doc.set_attr(shadow, "opacity", fmt_num(s.shadow_alpha));
            }
            self.doc.append(node, shadow);
        }
        self.doc.append(self.parent, node);
    }
}

impl Canvas2D for VmlCanvas<'_> {
    fn core(&self) -> &CanvasCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CanvasCore {
        &mut self.core
    }

    fn fill(&mut self) {
        self.add_node(true, false);
    }

    fn stroke(&mut self) {
        self.add_node(false, true);
    }

    fn fill_and_stroke(&mut self) {
        self.add_node(true, true);
    }

    fn image(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        src: &str,
        _aspect: bool,
        flip_h: bool,
        flip_v: bool,
    ) {
        let p = self.core.pt(x, y);
        let mut css = box_css(
            vi(p.x) as f64,
            vi(p.y) as f64,
            vi(self.core.len(w)) as f64,
            vi(self.core.len(h)) as f64,
        );
        let mut s = self.core.state.clone();
        s.flip_h ^= flip_h;
        s.flip_v ^= flip_v;
        css.push_str(&Self::rotation_style(&s));
        let n = self.doc.create("v:image");
        self.doc.set_attr(n, "src", src);
        self.doc.set_attr(n, "style", css);
        if s.alpha < 1.0 {
            self.doc.set_attr(n, "opacity", fmt_num(s.alpha));
        }
        self.doc.append(self.parent, n);
    }

    fn text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, options: &TextOptions) {
        if text.is_empty() {
            return;
        }
        let s = &self.core.state;
        let p = self.core.pt(x, y);
        let mut css = box_css(
            vi(p.x) as f64,
            vi(p.y) as f64,
            vi(self.core.len(w)) as f64,
            vi(self.core.len(h)) as f64,
        );
        css.push_str(&font_css(s, options.align));
        if !options.wrap {
            css.push_str("white-space:nowrap;");
        }
        if options.clip {
            css.push_str("overflow:hidden;");
        }
        let mut rotation = options.rotation + s.rotation;
        if !options.horizontal {
            rotation -= 90.0;
        }
        if rotation != 0.0 {
            css.push_str(&format!("rotation:{};", vi(rotation)));
        }
        let body = match options.format {
            TextFormat::Html => text.to_string(),
            TextFormat::Plain => escape_xml(text).replace('\n', "<br/>"),
        };
        let n = self.doc.create("v:textbox");
        self.doc.set_attr(n, "style", css);
        self.doc.set_raw(n, body);
        self.doc.append(self.parent, n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_uses_integer_commands() {
        let mut doc = Document::new("div");
        let root = doc.root();
        {
            let mut c = VmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
            c.set_stroke_color(Some(Color::BLACK));
            c.set_dashed(true);
            c.begin();
            c.move_to(0.4, 0.6);
            c.line_to(10.2, 10.0);
            c.close();
            c.stroke();
        }
        let shape = doc.children(root)[0];
        assert_eq!(doc.attr(shape, "path"), Some("m 0 1 l 10 10 x e"));
        assert_eq!(doc.attr(shape, "filled"), Some("false"));
        let stroke = doc.children(shape)[0];
        assert_eq!(doc.attr(stroke, "dashstyle"), Some("3 3"));
        assert_eq!(doc.attr(stroke, "endcap"), Some("flat"));
    }

    #[test]
    fn gradient_is_inline_fill() {
        let mut doc = Document::new("div");
        let root = doc.root();
        {
            let mut c = VmlCanvas::new(&mut doc, root, &ShapeDefaults::default());
            c.set_gradient(
                Color::WHITE,
                Color::BLACK,
                0.0,
                0.0,
                10.0,
                10.0,
                Direction::East,
                1.0,
                1.0,
            );
            c.rotate(30.0, true, false, 5.0, 5.0);
            c.rect(0.0, 0.0, 10.0, 10.0);
            c.fill();
        }
        let rect = doc.children(root)[0];
        assert_eq!(doc.element(rect).map(|e| e.tag.as_str()), Some("v:rect"));
        assert!(
            doc.attr(rect, "style")
                .is_some_and(|s| s.ends_with("rotation:30;flip:x;"))
        );
        let fill = doc.children(rect)[0];
        assert_eq!(doc.attr(fill, "type"), Some("gradient"));
        assert_eq!(doc.attr(fill, "color2"), Some("#000000"));
        assert_eq!(doc.attr(fill, "angle"), Some("90"));
    }
}
