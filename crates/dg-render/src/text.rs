//! Text measurement and plain-text line layout.
//!
//! Rich (markup) labels cannot be sized by the surface itself: the
//! surface asks an injected [`TextMeasurer`] and blocks on the answer
//! before it can finish positioning and clipping. Plain text is laid out
//! line by line with a fixed line height derived from the font size.

use serde::{Deserialize, Serialize};

/// Bit flags of the `fontStyle` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontStyle(pub u8);

impl FontStyle {
    pub const BOLD: u8 = 1;
    pub const ITALIC: u8 = 2;
    pub const UNDERLINE: u8 = 4;

    pub fn bold(&self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn italic(&self) -> bool {
        self.0 & Self::ITALIC != 0
    }

    pub fn underline(&self) -> bool {
        self.0 & Self::UNDERLINE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub style: FontStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl HAlign {
    pub fn parse(s: &str) -> Self {
        match s {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl VAlign {
    pub fn parse(s: &str) -> Self {
        match s {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            _ => Self::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// Blocking layout probe for text.
pub trait TextMeasurer {
    /// Size of `text` rendered with `font`. Markup is measured as laid
    /// out when `format` is `Html`. `max_width` wraps when given.
    fn measure(&self, text: &str, format: TextFormat, font: &FontSpec, max_width: Option<f64>)
    -> Size;
}

/// Deterministic measurer: every glyph is `char_width × size` wide and
/// lines are `line_height × size` tall. Markup tags are skipped and
/// `<br>` / `<div>` boundaries break lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for ApproximateMeasurer {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for ApproximateMeasurer {
    fn measure(
        &self,
        text: &str,
        format: TextFormat,
        font: &FontSpec,
        max_width: Option<f64>,
    ) -> Size {
        let plain = match format {
            TextFormat::Plain => text.to_string(),
            TextFormat::Html => strip_markup(text),
        };
        let glyph = self.char_width * font.size;
        let mut lines = 0usize;
        let mut widest: f64 = 0.0;
        for line in plain.split('\n') {
            let w = line.chars().count() as f64 * glyph;
            match max_width {
                Some(max) if max > 0.0 && w > max => {
                    lines += (w / max).ceil() as usize;
                    widest = widest.max(max);
                }
                _ => {
                    lines += 1;
                    widest = widest.max(w);
                }
            }
        }
        Size::new(widest, lines as f64 * self.line_height * font.size)
    }
}

/// Text content of markup, with line breaks for `<br>` and block ends.
pub fn strip_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        let tag = rest[start + 1..start + end].trim().to_ascii_lowercase();
        if tag.starts_with("br") || tag == "/div" || tag == "/p" {
            out.push('\n');
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim_end_matches('\n')
        .to_string()
}

// ─── Plain-text layout ──────────────────────────────────────────────────

/// Placement of plain-text lines inside a box, in unscaled units.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    /// Anchor x of every line.
    pub x: f64,
    /// Baseline y of each line.
    pub baselines: Vec<f64>,
    /// Height of the text block.
    pub text_height: f64,
}

pub const LINE_HEIGHT_FACTOR: f64 = 1.25;
pub const LINE_ADVANCE_FACTOR: f64 = 1.3;

/// Lay out `line_count` lines of `size`-pt text in the box `x, y, w, h`.
/// `scale` is the surface scale, used for the small edge insets.
#[allow(clippy::too_many_arguments)]
pub fn layout_lines(
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    line_count: usize,
    size: f64,
    align: HAlign,
    valign: VAlign,
    scale: f64,
) -> LineLayout {
    let n = line_count.max(1) as f64;
    let line_height = size * LINE_HEIGHT_FACTOR;
    let text_height = if h > 0.0 {
        size + (n - 1.0) * line_height
    } else {
        n * line_height - 1.0
    };
    let dy = h - text_height;

    let x = match align {
        HAlign::Right => x + (w - 2.0).max(0.0),
        HAlign::Center => x + w / 2.0,
        HAlign::Left => x + if w > 0.0 { 2.0 } else { 0.0 },
    };
    let mut y = match valign {
        VAlign::Top => {
            let inset = if h > 0.0 { line_height / 2.0 - 8.0 } else { 0.0 };
            (y - 3.0 * scale).max(y + dy / 2.0 + inset)
        }
        VAlign::Middle => y + dy / 2.0,
        VAlign::Bottom => y.min(y + dy + 2.0 * scale),
    };
    y += size;

    let mut baselines = Vec::with_capacity(line_count);
    for _ in 0..line_count.max(1) {
        baselines.push(y);
        y += size * LINE_ADVANCE_FACTOR;
    }
    LineLayout {
        x,
        baselines,
        text_height,
    }
}

/// Offset of a `size` box aligned inside `w × h`.
pub fn align_offset(w: f64, h: f64, size: Size, align: HAlign, valign: VAlign) -> (f64, f64) {
    let dx = match align {
        HAlign::Left => 0.0,
        HAlign::Center => (w - size.width) / 2.0,
        HAlign::Right => w - size.width,
    };
    let dy = match valign {
        VAlign::Top => 0.0,
        VAlign::Middle => (h - size.height) / 2.0,
        VAlign::Bottom => h - size.height,
    };
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn font(size: f64) -> FontSpec {
        FontSpec {
            family: "Arial".into(),
            size,
            style: FontStyle::default(),
        }
    }

    #[test]
    fn approximate_measure_counts_glyphs_and_lines() {
        let m = ApproximateMeasurer::default();
        let s = m.measure("abcd\nab", TextFormat::Plain, &font(10.0), None);
        assert!((s.width - 24.0).abs() < 0.01);
        assert!((s.height - 24.0).abs() < 0.01);
    }

    #[test]
    fn markup_is_stripped_before_measuring() {
        assert_eq!(strip_markup("<b>Hi</b><br/>there&nbsp;you"), "Hi\nthere you");
        let m = ApproximateMeasurer::default();
        let s = m.measure("<div>ab</div><div>c</div>", TextFormat::Html, &font(10.0), None);
        assert!((s.height - 24.0).abs() < 0.01);
    }

    #[test]
    fn wrapping_adds_lines() {
        let m = ApproximateMeasurer::default();
        let s = m.measure("abcdefghij", TextFormat::Plain, &font(10.0), Some(30.0));
        assert!((s.width - 30.0).abs() < 0.01);
        assert!((s.height - 24.0).abs() < 0.01);
    }

    #[test]
    fn middle_alignment_centers_block() {
        let l = layout_lines(0.0, 0.0, 100.0, 40.0, 1, 10.0, HAlign::Center, VAlign::Middle, 1.0);
        assert_eq!(l.x, 50.0);
        // text height 10, dy 30 → top 15, baseline 25
        assert_eq!(l.baselines, vec![25.0]);
    }

    #[test]
    fn bottom_alignment_uses_inset() {
        let l = layout_lines(0.0, 0.0, 100.0, 40.0, 2, 10.0, HAlign::Left, VAlign::Bottom, 1.0);
        // text height 10 + 12.5 = 22.5, dy 17.5 → min(0, 19.5) = 0
        assert_eq!(l.x, 2.0);
        assert_eq!(l.baselines, vec![10.0, 23.0]);
    }
}
