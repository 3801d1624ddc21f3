//! Styled-box surface: every primitive becomes an absolutely positioned
//! `<div>`. Boxes, ellipses, text and images are supported; free-form
//! paths are skipped.

use super::{fmt_num, Canvas2D, CanvasCore, CanvasState, Primitive, TextOptions};
use crate::markup::{escape_xml, Document, NodeRef};
use crate::text::{HAlign, TextFormat, VAlign};
use dg_core::{Direction, ShapeDefaults};

/// Font declarations for a text box.
pub(crate) fn font_css(s: &CanvasState, align: HAlign) -> String {
    let mut css = format!(
        "font-size:{}px;font-family:{};text-align:{};",
        fmt_num(s.font_size * s.scale),
        s.font_family,
        match align {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        }
    );
    if let Some(c) = s.font_color {
        css.push_str(&format!("color:{};", c.to_hex()));
    }
    if s.font_style.bold() {
        css.push_str("font-weight:bold;");
    }
    if s.font_style.italic() {
        css.push_str("font-style:italic;");
    }
    if s.font_style.underline() {
        css.push_str("text-decoration:underline;");
    }
    css
}

pub(crate) fn box_css(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;",
        fmt_num(x),
        fmt_num(y),
        fmt_num(w.max(0.0)),
        fmt_num(h.max(0.0))
    )
}

pub struct HtmlCanvas<'d> {
    core: CanvasCore,
    doc: &'d mut Document,
    parent: NodeRef,
}

impl<'d> HtmlCanvas<'d> {
    pub fn new(doc: &'d mut Document, parent: NodeRef, defaults: &ShapeDefaults) -> Self {
        Self {
            core: CanvasCore::new(defaults),
            doc,
            parent,
        }
    }

    fn rotation_css(s: &CanvasState) -> String {
        let mut t = String::new();
        if s.flip_h || s.flip_v {
            t.push_str(&format!(
                "scale({},{})",
                if s.flip_h { -1 } else { 1 },
                if s.flip_v { -1 } else { 1 }
            ));
        }
        if s.rotation != 0.0 {
            t.push_str(&format!("rotate({}deg)", fmt_num(s.rotation)));
        }
        if t.is_empty() {
            t
        } else {
            format!("transform:{t};")
        }
    }

    fn add_box(&mut self, filled: bool, stroked: bool) {
        let Some(primitive) = self.core.take_pending() else {
            return;
        };
        let s = &self.core.state;
        let mut css = match primitive {
            Primitive::Rect { x, y, w, h, rx, .. } => {
                let mut css = box_css(x, y, w, h);
                if rx > 0.0 {
                    css.push_str(&format!("border-radius:{}px;", fmt_num(rx)));
                }
                css
            }
            Primitive::Ellipse { cx, cy, rx, ry } => {
                let mut css = box_css(cx - rx, cy - ry, rx * 2.0, ry * 2.0);
                css.push_str("border-radius:50%;");
                css
            }
            Primitive::Path { .. } => {
                log::warn!("path painting is not supported by the styled-box surface");
                return;
            }
        };
        if filled {
            if let Some(g) = &s.gradient {
                let angle = match g.direction {
                    Direction::North => "0deg",
                    Direction::East => "90deg",
                    Direction::West => "270deg",
                    Direction::South => "180deg",
                };
                css.push_str(&format!(
                    "background:linear-gradient({angle},{},{});",
                    g.start.to_hex(),
                    g.end.to_hex()
                ));
            } else if let Some(c) = s.fill {
                css.push_str(&format!("background-color:{};", c.to_hex()));
            }
        }
        if stroked && let Some(c) = s.stroke {
            let style = if s.dashed { "dashed" } else { "solid" };
            css.push_str(&format!(
                "border:{}px {style} {};box-sizing:border-box;",
                fmt_num(s.stroke_width.max(1.0)),
                c.to_hex()
            ));
        }
        if s.alpha < 1.0 {
            css.push_str(&format!("opacity:{};", fmt_num(s.alpha)));
        }
        if s.shadow {
            css.push_str(&format!(
                "box-shadow:{}px {}px 0 {};",
                fmt_num(s.shadow_dx * s.scale),
                fmt_num(s.shadow_dy * s.scale),
                s.shadow_color.to_hex()
            ));
        }
        css.push_str(&Self::rotation_css(s));

        let n = self.doc.create("div");
        self.doc.set_attr(n, "style", css);
        self.doc.append(self.parent, n);
    }
}

impl Canvas2D for HtmlCanvas<'_> {
    fn core(&self) -> &CanvasCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CanvasCore {
        &mut self.core
    }

    fn fill(&mut self) {
        self.add_box(true, false);
    }

    fn stroke(&mut self) {
        self.add_box(false, true);
    }

    fn fill_and_stroke(&mut self) {
        self.add_box(true, true);
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
        let mut css = box_css(p.x, p.y, self.core.len(w), self.core.len(h));
        if flip_h || flip_v {
            css.push_str(&format!(
                "transform:scale({},{});",
                if flip_h { -1 } else { 1 },
                if flip_v { -1 } else { 1 }
            ));
        }
        if self.core.state.alpha < 1.0 {
            css.push_str(&format!("opacity:{};", fmt_num(self.core.state.alpha)));
        }
        let n = self.doc.create("img");
        self.doc.set_attr(n, "src", src);
        self.doc.set_attr(n, "style", css);
        self.doc.append(self.parent, n);
    }

    fn text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, options: &TextOptions) {
        if text.is_empty() {
            return;
        }
        let s = &self.core.state;
        let p = self.core.pt(x, y);
        let mut css = box_css(p.x, p.y, self.core.len(w), self.core.len(h));
        css.push_str("display:flex;");
        css.push_str(match options.valign {
            VAlign::Top => "align-items:flex-start;",
            VAlign::Middle => "align-items:center;",
            VAlign::Bottom => "align-items:flex-end;",
        });
        css.push_str(&font_css(s, options.align));
        if !options.wrap {
            css.push_str("white-space:nowrap;");
        }
        if options.clip {
            css.push_str("overflow:hidden;");
        }
        if let Some(c) = s.font_background {
            css.push_str(&format!("background-color:{};", c.to_hex()));
        }
        if let Some(c) = s.font_border {
            css.push_str(&format!("border:1px solid {};", c.to_hex()));
        }
        let mut rotation = options.rotation;
        if !options.horizontal {
            rotation -= 90.0;
        }
        if rotation != 0.0 {
            css.push_str(&format!("transform:rotate({}deg);", fmt_num(rotation)));
        }
        let body = match options.format {
            TextFormat::Html => text.to_string(),
            TextFormat::Plain => escape_xml(text).replace('\n', "<br/>"),
        };
        let n = self.doc.create("div");
        self.doc.set_attr(n, "style", css);
        self.doc.set_raw(n, format!("<div style=\"width:100%\">{body}</div>"));
        self.doc.append(self.parent, n);
    }
}
