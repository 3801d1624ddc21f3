//! SVG surface writing into a [`Document`].

use super::{fmt_num, Canvas2D, CanvasCore, CanvasState, LineCap, Primitive, TextOptions};
use crate::gradient::GradientKey;
use crate::markup::{escape_xml, Document, NodeRef};
use crate::text::{
    align_offset, layout_lines, FontSpec, HAlign, Size, TextFormat, TextMeasurer,
};
use dg_core::ShapeDefaults;

pub struct SvgCanvas<'d> {
    core: CanvasCore,
    doc: &'d mut Document,
    parent: NodeRef,
    measurer: &'d dyn TextMeasurer,
    gradients: Vec<String>,
    /// When false, unfilled areas do not take pointer events.
    pub pointer_events: bool,
}

impl<'d> SvgCanvas<'d> {
    pub fn new(
        doc: &'d mut Document,
        parent: NodeRef,
        measurer: &'d dyn TextMeasurer,
        defaults: &ShapeDefaults,
    ) -> Self {
        Self {
            core: CanvasCore::new(defaults),
            doc,
            parent,
            measurer,
            gradients: Vec::new(),
            pointer_events: true,
        }
    }

    pub fn document(&mut self) -> &mut Document {
        self.doc
    }

    pub fn parent(&self) -> NodeRef {
        self.parent
    }

    /// Redirect subsequent output under `parent`.
    pub fn set_parent(&mut self, parent: NodeRef) {
        self.parent = parent;
    }

    /// Gradient ids referenced by everything painted so far.
    pub fn take_gradients(&mut self) -> Vec<String> {
        std::mem::take(&mut self.gradients)
    }

    fn create_element(&mut self, primitive: &Primitive) -> NodeRef {
        match primitive {
            Primitive::Path { segs, orthogonal } => {
                let n = self.doc.create("path");
                self.doc.set_attr(n, "d", super::path_data(segs));
                if *orthogonal {
                    self.doc.set_attr(n, "shape-rendering", "crispEdges");
                }
                n
            }
            Primitive::Rect { x, y, w, h, rx, ry } => {
                let n = self.doc.create("rect");
                self.doc.set_attr(n, "x", fmt_num(*x));
                self.doc.set_attr(n, "y", fmt_num(*y));
                self.doc.set_attr(n, "width", fmt_num(*w));
                self.doc.set_attr(n, "height", fmt_num(*h));
                if *rx > 0.0 || *ry > 0.0 {
                    self.doc.set_attr(n, "rx", fmt_num(*rx));
                    self.doc.set_attr(n, "ry", fmt_num(*ry));
                } else {
                    self.doc.set_attr(n, "shape-rendering", "crispEdges");
                }
                n
            }
            Primitive::Ellipse { cx, cy, rx, ry } => {
                let n = self.doc.create("ellipse");
                self.doc.set_attr(n, "cx", fmt_num(*cx));
                self.doc.set_attr(n, "cy", fmt_num(*cy));
                self.doc.set_attr(n, "rx", fmt_num(*rx));
                self.doc.set_attr(n, "ry", fmt_num(*ry));
                n
            }
        }
    }

    fn apply_fill(&mut self, node: NodeRef, s: &CanvasState) {
        if let Some(g) = &s.gradient {
            let key = GradientKey::new(g.start, g.end, g.alpha1, g.alpha2, g.direction);
            let id = self.doc.acquire_gradient(&key);
            self.doc.set_attr(node, "fill", format!("url(#{id})"));
            self.gradients.push(id);
        } else if let Some(c) = s.fill {
            self.doc.set_attr(node, "fill", c.to_hex());
            if s.fill_alpha < 1.0 {
                self.doc.set_attr(node, "fill-opacity", fmt_num(s.fill_alpha));
            }
        } else {
            self.doc.set_attr(node, "fill", "none");
        }
    }

    fn apply_stroke(&mut self, node: NodeRef, s: &CanvasState, is_path: bool) {
        let Some(c) = s.stroke else {
            self.doc.set_attr(node, "stroke", "none");
            return;
        };
        self.doc.set_attr(node, "stroke", c.to_hex());
        if s.stroke_alpha < 1.0 {
            self.doc.set_attr(node, "stroke-opacity", fmt_num(s.stroke_alpha));
        }
        let sw = s.stroke_width.max(1.0);
        if sw != 1.0 {
            self.doc.set_attr(node, "stroke-width", fmt_num(sw));
        }
        if is_path {
            self.doc.set_attr(node, "stroke-linejoin", s.line_join.as_str());
            let cap = match s.line_cap {
                LineCap::Flat => "butt",
                other => other.as_str(),
            };
            self.doc.set_attr(node, "stroke-linecap", cap);
            self.doc.set_attr(node, "stroke-miterlimit", fmt_num(s.miter_limit));
        }
        if let Some(dash) = s.dash_array() {
            self.doc.set_attr(node, "stroke-dasharray", dash);
        }
    }

    /// Flush the pending primitive: style it, add its shadow beneath and
    /// its hit-tolerance outline above.
    fn add_node(&mut self, filled: bool, stroked: bool) {
        let Some(primitive) = self.core.take_pending() else {
            return;
        };
        let is_path = matches!(primitive, Primitive::Path { .. });
        let s = self.core.state.clone();
        let node = self.create_element(&primitive);

        if filled {
            self.apply_fill(node, &s);
        } else {
            self.doc.set_attr(node, "fill", "none");
        }
        if stroked {
            self.apply_stroke(node, &s, is_path);
        } else {
            self.doc.set_attr(node, "stroke", "none");
        }
        if s.alpha < 1.0 {
            self.doc.set_attr(node, "opacity", fmt_num(s.alpha));
        }
        if !s.transform.is_empty() {
            self.doc.set_attr(node, "transform", &s.transform);
        }
        if let Some(clip) = &s.clip {
            self.doc.set_attr(node, "clip-path", format!("url(#{clip})"));
        }
        if !self.pointer_events && self.doc.attr(node, "fill") == Some("none") {
            self.doc.set_attr(node, "pointer-events", "none");
        }

        if s.shadow {
            self.add_shadow(node, &s);
        }
        self.doc.append(self.parent, node);

        if stroked && is_path && s.stroke_tolerance > 0.0 {
            self.add_tolerance(node, &s);
        }
    }

    fn add_shadow(&mut self, node: NodeRef, s: &CanvasState) {
        let Some(shadow) = self.doc.clone_subtree(node) else {
            return;
        };
        let color = s.shadow_color.to_hex();
        for key in ["fill", "stroke"] {
            let paints = self
                .doc
                .attr(shadow, key)
                .is_some_and(|v| v != "none");
            if paints {
                self.doc.set_attr(shadow, key, &color);
            }
        }
        if let Some(e) = self.doc.element_mut(shadow) {
            e.remove_attr("fill-opacity");
            e.remove_attr("stroke-opacity");
            e.remove_attr("clip-path");
        }
        self.doc.set_attr(
            shadow,
            "transform",
            format!(
                "translate({},{}){}",
                fmt_num(s.shadow_dx * s.scale),
                fmt_num(s.shadow_dy * s.scale),
                s.transform
            ),
        );
        let opacity = s.shadow_alpha * s.alpha;
        if opacity < 1.0 {
            self.doc.set_attr(shadow, "opacity", fmt_num(opacity));
        }
        self.doc.append(self.parent, shadow);
    }

    fn add_tolerance(&mut self, node: NodeRef, s: &CanvasState) {
        let Some(hit) = self.doc.clone_subtree(node) else {
            return;
        };
        if let Some(e) = self.doc.element_mut(hit) {
            e.remove_attr("stroke-dasharray");
            e.remove_attr("shape-rendering");
            e.remove_attr("opacity");
        }
        self.doc.set_attr(hit, "fill", "none");
        self.doc.set_attr(hit, "stroke", "white");
        self.doc.set_attr(
            hit,
            "stroke-width",
            fmt_num(s.stroke_width.max(1.0) + s.stroke_tolerance),
        );
        self.doc.set_attr(hit, "pointer-events", "stroke");
        self.doc.set_attr(hit, "visibility", "hidden");
        self.doc.append(self.parent, hit);
    }

    fn font_spec(s: &CanvasState) -> FontSpec {
        FontSpec {
            family: s.font_family.clone(),
            size: s.font_size,
            style: s.font_style,
        }
    }

    /// Transform for a text box: the state transform followed by the
    /// vertical and label rotations around the box center.
    fn text_transform(s: &CanvasState, cx: f64, cy: f64, opts: &TextOptions) -> String {
        let mut t = s.transform.clone();
        if !opts.horizontal {
            t.push_str(&format!("rotate(-90,{},{})", fmt_num(cx), fmt_num(cy)));
        }
        if opts.rotation != 0.0 {
            t.push_str(&format!(
                "rotate({},{},{})",
                fmt_num(opts.rotation),
                fmt_num(cx),
                fmt_num(cy)
            ));
        }
        t
    }

    fn clip_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("dg-clip-{}", self.doc.next_id());
        let cp = self.doc.create("clipPath");
        self.doc.set_attr(cp, "id", &id);
        let r = self.doc.create("rect");
        self.doc.set_attr(r, "x", fmt_num(x));
        self.doc.set_attr(r, "y", fmt_num(y));
        self.doc.set_attr(r, "width", fmt_num(w));
        self.doc.set_attr(r, "height", fmt_num(h));
        self.doc.append(cp, r);
        let defs = self.doc.defs();
        self.doc.append(defs, cp);
        id
    }

    fn plain_text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, opts: &TextOptions) {
        let s = self.core.state.clone();
        let p = self.core.pt(x, y);
        let (w, h) = (self.core.len(w), self.core.len(h));
        let size = s.font_size * s.scale;
        let lines: Vec<&str> = text.split('\n').collect();
        let layout = layout_lines(p.x, p.y, w, h, lines.len(), size, opts.align, opts.valign, s.scale);

        let g = self.doc.create("g");
        if let Some(c) = s.font_color {
            self.doc.set_attr(g, "fill", c.to_hex());
        }
        self.doc.set_attr(g, "font-family", &s.font_family);
        self.doc.set_attr(g, "font-size", format!("{}px", size.floor()));
        let anchor = match opts.align {
            HAlign::Left => "start",
            HAlign::Center => "middle",
            HAlign::Right => "end",
        };
        self.doc.set_attr(g, "text-anchor", anchor);
        if s.font_style.bold() {
            self.doc.set_attr(g, "font-weight", "bold");
        }
        if s.font_style.italic() {
            self.doc.set_attr(g, "font-style", "italic");
        }
        if s.font_style.underline() {
            self.doc.set_attr(g, "text-decoration", "underline");
        }
        if s.alpha < 1.0 {
            self.doc.set_attr(g, "opacity", fmt_num(s.alpha));
        }
        let transform = Self::text_transform(&s, p.x + w / 2.0, p.y + h / 2.0, opts);
        if !transform.is_empty() {
            self.doc.set_attr(g, "transform", transform);
        }
        if opts.clip && w > 0.0 && h > 0.0 {
            let id = self.clip_rect(p.x, p.y, w, h);
            self.doc.set_attr(g, "clip-path", format!("url(#{id})"));
        }

        if s.font_background.is_some() || s.font_border.is_some() {
            let m = self
                .measurer
                .measure(text, TextFormat::Plain, &Self::font_spec(&s), None);
            let size = Size::new(m.width * s.scale, m.height * s.scale);
            let (ox, oy) = align_offset(w, h, size, opts.align, opts.valign);
            let bg = self.doc.create("rect");
            self.doc.set_attr(bg, "x", fmt_num(p.x + ox - 1.0));
            self.doc.set_attr(bg, "y", fmt_num(p.y + oy - 1.0));
            self.doc.set_attr(bg, "width", fmt_num(size.width + 2.0));
            self.doc.set_attr(bg, "height", fmt_num(size.height + 2.0));
            self.doc.set_attr(
                bg,
                "fill",
                s.font_background.map_or("none".to_string(), |c| c.to_hex()),
            );
            self.doc.set_attr(
                bg,
                "stroke",
                s.font_border.map_or("none".to_string(), |c| c.to_hex()),
            );
            self.doc.append(g, bg);
        }

        for (line, baseline) in lines.iter().zip(&layout.baselines) {
            let t = self.doc.create("text");
            self.doc.set_attr(t, "x", fmt_num(layout.x));
            self.doc.set_attr(t, "y", fmt_num(*baseline));
            self.doc.set_text(t, line);
            self.doc.append(g, t);
        }
        self.doc.append(self.parent, g);
    }

    /// Markup label inside a `foreignObject`, laid out in unscaled units
    /// under a `scale(s)` group.
    fn html_text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, opts: &TextOptions) {
        let s = self.core.state.clone();
        let (ux, uy) = (x + s.dx, y + s.dy);
        let max_width = (opts.wrap && w > 0.0).then_some(w);
        let measured = self
            .measurer
            .measure(text, TextFormat::Html, &Self::font_spec(&s), max_width);
        let (ox, oy) = align_offset(w, h, measured, opts.align, opts.valign);

        let g = self.doc.create("g");
        let c = self.core.pt(x + w / 2.0, y + h / 2.0);
        let mut transform = Self::text_transform(&s, c.x, c.y, opts);
        if s.scale != 1.0 {
            transform.push_str(&format!("scale({})", fmt_num(s.scale)));
        }
        if !transform.is_empty() {
            self.doc.set_attr(g, "transform", transform);
        }
        if s.alpha < 1.0 {
            self.doc.set_attr(g, "opacity", fmt_num(s.alpha));
        }

        let fo = self.doc.create("foreignObject");
        let (fx, fy, fw, fh) = if opts.clip && w > 0.0 && h > 0.0 {
            (ux, uy, w, h)
        } else {
            (ux + ox, uy + oy, measured.width, measured.height)
        };
        self.doc.set_attr(fo, "x", fmt_num(fx));
        self.doc.set_attr(fo, "y", fmt_num(fy));
        self.doc.set_attr(fo, "width", fmt_num(fw.ceil()));
        self.doc.set_attr(fo, "height", fmt_num(fh.ceil()));
        self.doc.set_attr(fo, "pointer-events", "all");

        let mut css = format!(
            "display:inline-block;font-size:{}px;font-family:{};text-align:{};",
            fmt_num(s.font_size),
            escape_xml(&s.font_family),
            match opts.align {
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
        if let Some(c) = s.font_background {
            css.push_str(&format!("background-color:{};", c.to_hex()));
        }
        if let Some(c) = s.font_border {
            css.push_str(&format!("border:1px solid {};", c.to_hex()));
        }
        if opts.wrap {
            css.push_str("white-space:normal;");
            if w > 0.0 {
                css.push_str(&format!("width:{}px;", fmt_num(w)));
            }
        } else {
            css.push_str("white-space:nowrap;");
        }
        if opts.clip {
            css.push_str("overflow:hidden;");
        }
        self.doc.set_raw(
            fo,
            format!("<div xmlns=\"http://www.w3.org/1999/xhtml\" style=\"{css}\">{text}</div>"),
        );
        self.doc.append(g, fo);
        self.doc.append(self.parent, g);
    }
}

impl Canvas2D for SvgCanvas<'_> {
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

    fn clip(&mut self) {
        let Some(primitive) = self.core.take_pending() else {
            return;
        };
        let node = self.create_element(&primitive);
        if !self.core.state.transform.is_empty() {
            self.doc.set_attr(node, "transform", &self.core.state.transform);
        }
        let id = format!("dg-clip-{}", self.doc.next_id());
        let cp = self.doc.create("clipPath");
        self.doc.set_attr(cp, "id", &id);
        self.doc.append(cp, node);
        let defs = self.doc.defs();
        self.doc.append(defs, cp);
        self.core.state.clip = Some(id);
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
        let s = &self.core.state;
        let p = self.core.pt(x, y);
        let (w, h) = (self.core.len(w), self.core.len(h));
        let mut transform = s.transform.clone();
        if flip_h || flip_v {
            let (sx, dx) = if flip_h { (-1, -w - 2.0 * p.x) } else { (1, 0.0) };
            let (sy, dy) = if flip_v { (-1, -h - 2.0 * p.y) } else { (1, 0.0) };
            transform.push_str(&format!(
                "scale({sx},{sy})translate({},{})",
                fmt_num(dx),
                fmt_num(dy)
            ));
        }
        let alpha = s.alpha;
        let clip = s.clip.clone();

        let n = self.doc.create("image");
        self.doc.set_attr(n, "x", fmt_num(p.x));
        self.doc.set_attr(n, "y", fmt_num(p.y));
        self.doc.set_attr(n, "width", fmt_num(w));
        self.doc.set_attr(n, "height", fmt_num(h));
        self.doc.set_attr(n, "xlink:href", src);
        if !aspect {
            self.doc.set_attr(n, "preserveAspectRatio", "none");
        }
        if alpha < 1.0 {
            self.doc.set_attr(n, "opacity", fmt_num(alpha));
        }
        if !transform.is_empty() {
            self.doc.set_attr(n, "transform", transform);
        }
        if let Some(clip) = clip {
            self.doc.set_attr(n, "clip-path", format!("url(#{clip})"));
        }
        self.doc.append(self.parent, n);
    }

    fn text(&mut self, x: f64, y: f64, w: f64, h: f64, text: &str, options: &TextOptions) {
        if text.is_empty() {
            return;
        }
        match options.format {
            TextFormat::Plain => self.plain_text(x, y, w, h, text, options),
            TextFormat::Html => self.html_text(x, y, w, h, text, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{ApproximateMeasurer, VAlign};
    use dg_core::{Color, Direction};
    use pretty_assertions::assert_eq;

    fn with_canvas(f: impl FnOnce(&mut SvgCanvas<'_>)) -> Document {
        let mut doc = Document::svg();
        let root = doc.root();
        let m = ApproximateMeasurer::default();
        {
            let mut c = SvgCanvas::new(&mut doc, root, &m, &ShapeDefaults::default());
            f(&mut c);
        }
        doc
    }

    #[test]
    fn rect_fill_and_stroke() {
        let doc = with_canvas(|c| {
            c.translate(10.0, 0.0);
            c.set_fill_color(Color::parse("#FF0000"));
            c.set_stroke_color(Some(Color::BLACK));
            c.set_stroke_width(2.0);
            c.rect(0.0, 0.0, 20.0, 10.0);
            c.fill_and_stroke();
        });
        assert_eq!(
            doc.to_markup(),
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\
             <rect x=\"10\" y=\"0\" width=\"20\" height=\"10\" shape-rendering=\"crispEdges\" \
             fill=\"#FF0000\" stroke=\"#000000\" stroke-width=\"2\"/></svg>"
        );
    }

    #[test]
    fn shadow_is_painted_beneath() {
        let doc = with_canvas(|c| {
            c.set_fill_color(Some(Color::WHITE));
            c.set_shadow(true);
            c.ellipse(0.0, 0.0, 10.0, 10.0);
            c.fill();
        });
        let ellipses = doc.find_all("ellipse");
        assert_eq!(ellipses.len(), 2);
        assert_eq!(doc.attr(ellipses[0], "transform"), Some("translate(2,3)"));
        assert_eq!(doc.attr(ellipses[0], "fill"), Some("#808080"));
        assert_eq!(doc.attr(ellipses[1], "fill"), Some("#FFFFFF"));
    }

    #[test]
    fn tolerance_outline_follows_stroked_path() {
        let doc = with_canvas(|c| {
            c.set_stroke_color(Some(Color::BLACK));
            c.set_stroke_tolerance(8.0);
            c.set_dashed(true);
            c.begin();
            c.move_to(0.0, 0.0);
            c.line_to(10.0, 10.0);
            c.stroke();
        });
        let paths = doc.find_all("path");
        assert_eq!(paths.len(), 2);
        assert_eq!(doc.attr(paths[0], "stroke-dasharray"), Some("3 3"));
        assert_eq!(doc.attr(paths[1], "stroke-dasharray"), None);
        assert_eq!(doc.attr(paths[1], "pointer-events"), Some("stroke"));
        assert_eq!(doc.attr(paths[1], "stroke-width"), Some("9"));
        assert_eq!(doc.attr(paths[1], "fill"), Some("none"));
    }

    #[test]
    fn gradient_fill_references_defs() {
        let mut ids = Vec::new();
        let doc = with_canvas(|c| {
            c.set_gradient(
                Color::WHITE,
                Color::BLACK,
                0.0,
                0.0,
                10.0,
                10.0,
                Direction::South,
                1.0,
                1.0,
            );
            c.rect(0.0, 0.0, 10.0, 10.0);
            c.fill();
            ids = c.take_gradients();
        });
        assert_eq!(ids.len(), 1);
        let rect = doc.find_all("rect")[0];
        assert_eq!(doc.attr(rect, "fill"), Some(format!("url(#{})", ids[0]).as_str()));
        assert_eq!(doc.gradient_refs(&ids[0]), 1);
    }

    #[test]
    fn flipped_image_gets_mirror_transform() {
        let doc = with_canvas(|c| {
            c.image(10.0, 20.0, 30.0, 40.0, "a.png", false, true, false);
        });
        let img = doc.find_all("image")[0];
        assert_eq!(doc.attr(img, "transform"), Some("scale(-1,1)translate(-50,0)"));
        assert_eq!(doc.attr(img, "preserveAspectRatio"), Some("none"));
    }

    #[test]
    fn plain_text_writes_one_element_per_line() {
        let doc = with_canvas(|c| {
            c.set_font_size(10.0);
            let opts = TextOptions {
                valign: VAlign::Middle,
                ..TextOptions::default()
            };
            c.text(0.0, 0.0, 100.0, 40.0, "a\nb", &opts);
        });
        let texts = doc.find_all("text");
        assert_eq!(texts.len(), 2);
        let g = doc.find_all("g")[0];
        assert_eq!(doc.attr(g, "font-size"), Some("10px"));
        assert_eq!(doc.attr(g, "text-anchor"), Some("middle"));
    }

    #[test]
    fn vertical_text_rotates_around_center() {
        let doc = with_canvas(|c| {
            let opts = TextOptions {
                horizontal: false,
                ..TextOptions::default()
            };
            c.text(0.0, 0.0, 100.0, 40.0, "v", &opts);
        });
        let g = doc.find_all("g")[0];
        assert_eq!(doc.attr(g, "transform"), Some("rotate(-90,50,20)"));
    }

    #[test]
    fn html_text_is_measured_into_foreign_object() {
        let doc = with_canvas(|c| {
            c.set_font_size(10.0);
            let opts = TextOptions {
                format: TextFormat::Html,
                ..TextOptions::default()
            };
            c.text(0.0, 0.0, 100.0, 40.0, "<b>abcd</b>", &opts);
        });
        let fo = doc.find_all("foreignObject")[0];
        // 4 glyphs × 6 = 24 wide, 12 tall, centered in 100 × 40
        assert_eq!(doc.attr(fo, "x"), Some("38"));
        assert_eq!(doc.attr(fo, "y"), Some("14"));
        assert_eq!(doc.attr(fo, "width"), Some("24"));
    }

    #[test]
    fn clip_defines_clip_path() {
        let doc = with_canvas(|c| {
            c.rect(0.0, 0.0, 5.0, 5.0);
            c.clip();
            c.set_fill_color(Some(Color::BLACK));
            c.rect(0.0, 0.0, 10.0, 10.0);
            c.fill();
        });
        let cp = doc.find_all("clipPath")[0];
        let id = doc.attr(cp, "id").unwrap_or_default().to_string();
        let rects = doc.find_all("rect");
        let painted = rects[rects.len() - 1];
        assert_eq!(doc.attr(painted, "clip-path"), Some(format!("url(#{id})").as_str()));
    }
}
