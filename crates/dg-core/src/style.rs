//! Cell styles: an ordered key→value map with typed accessors.
//!
//! Styles are written as `name;key=value;key=value`. Bare segments
//! (no `=`) reference named styles in the [`Stylesheet`]; the rest are
//! inline overrides applied in order.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// Style attribute names.
pub mod keys {
    pub const SHAPE: &str = "shape";
    pub const FILL_COLOR: &str = "fillColor";
    pub const GRADIENT_COLOR: &str = "gradientColor";
    pub const GRADIENT_DIRECTION: &str = "gradientDirection";
    pub const OPACITY: &str = "opacity";
    pub const FILL_OPACITY: &str = "fillOpacity";
    pub const STROKE_OPACITY: &str = "strokeOpacity";
    pub const STROKE_COLOR: &str = "strokeColor";
    pub const STROKE_WIDTH: &str = "strokeWidth";
    pub const SHADOW: &str = "shadow";
    pub const DASHED: &str = "dashed";
    pub const DASH_PATTERN: &str = "dashPattern";
    pub const ROUNDED: &str = "rounded";
    pub const ARC_SIZE: &str = "arcSize";
    pub const CURVED: &str = "curved";
    pub const ROTATION: &str = "rotation";
    pub const DIRECTION: &str = "direction";
    pub const FLIP_H: &str = "flipH";
    pub const FLIP_V: &str = "flipV";
    pub const SPACING: &str = "spacing";
    pub const START_SIZE: &str = "startSize";
    pub const END_SIZE: &str = "endSize";
    pub const START_ARROW: &str = "startArrow";
    pub const END_ARROW: &str = "endArrow";
    pub const START_FILL: &str = "startFill";
    pub const END_FILL: &str = "endFill";
    pub const FONT_COLOR: &str = "fontColor";
    pub const FONT_SIZE: &str = "fontSize";
    pub const FONT_FAMILY: &str = "fontFamily";
    pub const FONT_STYLE: &str = "fontStyle";
    pub const ALIGN: &str = "align";
    pub const VERTICAL_ALIGN: &str = "verticalAlign";
    pub const HORIZONTAL: &str = "horizontal";
    pub const LABEL_BACKGROUND_COLOR: &str = "labelBackgroundColor";
    pub const LABEL_BORDER_COLOR: &str = "labelBorderColor";
    pub const LABEL_ROTATION: &str = "labelRotation";
    pub const NO_LABEL: &str = "noLabel";
    pub const HTML: &str = "html";
    pub const WHITE_SPACE: &str = "whiteSpace";
    pub const IMAGE: &str = "image";
    pub const IMAGE_WIDTH: &str = "imageWidth";
    pub const IMAGE_HEIGHT: &str = "imageHeight";
    pub const INDICATOR_COLOR: &str = "indicatorColor";
    pub const INDICATOR_SHAPE: &str = "indicatorShape";
    pub const SWIMLANE_FILL_COLOR: &str = "swimlaneFillColor";
    pub const FOLDABLE: &str = "foldable";
    pub const MOVABLE: &str = "movable";
    pub const RESIZABLE: &str = "resizable";
    pub const ROTATABLE: &str = "rotatable";
    pub const EDITABLE: &str = "editable";
    pub const DELETABLE: &str = "deletable";
    pub const ASPECT: &str = "aspect";
    pub const POINTER_EVENTS: &str = "pointerEvents";
    pub const CONTAINER: &str = "container";
    pub const COLLAPSIBLE: &str = "collapsible";
    pub const LOCKED: &str = "locked";
    pub const BENDABLE: &str = "bendable";
    pub const CONNECTABLE: &str = "connectable";
    pub const EXIT_X: &str = "exitX";
    pub const EXIT_Y: &str = "exitY";
    pub const ENTRY_X: &str = "entryX";
    pub const ENTRY_Y: &str = "entryY";
}

/// Symbolic color values resolved by the renderer, not by the shape.
pub mod color_keywords {
    pub const NONE: &str = "none";
    pub const INHERIT: &str = "inherit";
    pub const SWIMLANE: &str = "swimlane";
    pub const INDICATED: &str = "indicated";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("malformed style near `{0}`")]
    Malformed(String),
    #[error("unknown named style `{0}`")]
    UnknownName(String),
}

// ─── Direction ───────────────────────────────────────────────────────────

/// Cardinal orientation of a shape. East is the unrotated default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    #[default]
    East,
    West,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            "east" => Some(Self::East),
            "west" => Some(Self::West),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }

    /// Extra rotation implied by the direction, added to the style rotation.
    pub fn rotation_offset(&self) -> f64 {
        match self {
            Self::North => 270.0,
            Self::West => 180.0,
            Self::South => 90.0,
            Self::East => 0.0,
        }
    }

    /// North/south shapes paint with width and height exchanged.
    pub fn is_inverted(&self) -> bool {
        matches!(self, Self::North | Self::South)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Ordered style map. Later `set` calls overwrite in place, keeping the
/// original key position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Named styles referenced by bare segments, in order.
    pub names: SmallVec<[String; 2]>,
    entries: SmallVec<[(String, String); 8]>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `name;key=value` style string.
    pub fn parse(input: &str) -> Result<Self, StyleError> {
        let mut rest = input;
        let mut style = Style::new();
        loop {
            skip_separators(&mut rest);
            if rest.is_empty() {
                return Ok(style);
            }
            let (key, value) = parse_segment
                .parse_next(&mut rest)
                .map_err(|_| StyleError::Malformed(rest.chars().take(16).collect()))?;
            match value {
                Some(value) => style.set(key.trim(), value.trim()),
                None => style.names.push(key.trim().to_string()),
            }
        }
    }

    /// Builder-style `set`.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// `1`/`true` are true, `0`/`false` are false, anything else is `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            _ => default,
        }
    }

    /// Concrete color for `key`. `none`, symbolic keywords and
    /// unparseable values are all absent.
    pub fn get_color(&self, key: &str) -> Option<Color> {
        self.get(key).and_then(Color::parse)
    }

    pub fn direction(&self) -> Direction {
        self.get(keys::DIRECTION)
            .and_then(Direction::parse)
            .unwrap_or_default()
    }

    /// Style rotation in degrees, normalized into `[0, 360)`.
    pub fn rotation(&self) -> f64 {
        normalize_degrees(self.get_number(keys::ROTATION, 0.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` onto `self`, `other` winning on conflicts.
    pub fn merge(&mut self, other: &Style) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in &self.names {
            if !first {
                f.write_str(";")?;
            }
            f.write_str(name)?;
            first = false;
        }
        for (k, v) in &self.entries {
            if !first {
                f.write_str(";")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Wrap degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg % 360.0;
    if r < 0.0 { r + 360.0 } else { r }
}

// ─── Parser ──────────────────────────────────────────────────────────────

fn skip_separators(input: &mut &str) {
    let _: Result<&str, winnow::error::ErrMode<ContextError>> =
        take_while(0.., |c: char| c == ';' || c.is_whitespace()).parse_next(input);
}

fn parse_segment<'a>(input: &mut &'a str) -> ModalResult<(&'a str, Option<&'a str>)> {
    let key: &str = take_till(1.., ['=', ';']).parse_next(input)?;
    if input.starts_with('=') {
        let _ = '='.parse_next(input)?;
        let value: &str = take_till(0.., ';').parse_next(input)?;
        Ok((key, Some(value)))
    } else {
        Ok((key, None))
    }
}

// ─── Stylesheet ──────────────────────────────────────────────────────────

/// Immutable table of default and named styles, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stylesheet {
    pub default_vertex: Style,
    pub default_edge: Style,
    pub named: HashMap<String, Style>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        let default_vertex = Style::new()
            .with(keys::SHAPE, "rectangle")
            .with(keys::VERTICAL_ALIGN, "middle")
            .with(keys::ALIGN, "center")
            .with(keys::FILL_COLOR, "#C3D9FF")
            .with(keys::STROKE_COLOR, "#6482B9")
            .with(keys::FONT_COLOR, "#774400");
        let default_edge = Style::new()
            .with(keys::SHAPE, "connector")
            .with(keys::END_ARROW, "classic")
            .with(keys::VERTICAL_ALIGN, "middle")
            .with(keys::ALIGN, "center")
            .with(keys::STROKE_COLOR, "#6482B9")
            .with(keys::FONT_COLOR, "#446299");
        Self {
            default_vertex,
            default_edge,
            named: HashMap::new(),
        }
    }
}

impl Stylesheet {
    #[must_use]
    pub fn with_named(mut self, name: &str, style: Style) -> Self {
        self.named.insert(name.to_string(), style);
        self
    }

    /// Resolve a cell style: defaults, then named styles in order, then
    /// inline entries. A `none` value removes the key.
    pub fn resolve(&self, style: &Style, is_edge: bool) -> Result<Style, StyleError> {
        let mut out = if is_edge {
            self.default_edge.clone()
        } else {
            self.default_vertex.clone()
        };
        for name in &style.names {
            let named = self
                .named
                .get(name)
                .ok_or_else(|| StyleError::UnknownName(name.clone()))?;
            out.merge(named);
        }
        for (k, v) in style.iter() {
            if v == color_keywords::NONE && !k.ends_with("Color") {
                out.remove(k);
            } else {
                out.set(k, v);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_keeps_order_and_names() {
        let s = Style::parse("swimlane;fillColor=#fff;rotation=45;;").unwrap();
        assert_eq!(s.names.as_slice(), ["swimlane".to_string()]);
        assert_eq!(
            s.iter().collect::<Vec<_>>(),
            vec![("fillColor", "#fff"), ("rotation", "45")]
        );
        assert_eq!(s.to_string(), "swimlane;fillColor=#fff;rotation=45");
    }

    #[test]
    fn parse_rejects_missing_key() {
        assert!(matches!(Style::parse("=5"), Err(StyleError::Malformed(_))));
    }

    #[test]
    fn typed_getters_fall_back() {
        let s = Style::parse("strokeWidth=abc;dashed=1;fillColor=none").unwrap();
        assert_eq!(s.get_number(keys::STROKE_WIDTH, 1.0), 1.0);
        assert!(s.get_bool(keys::DASHED, false));
        assert_eq!(s.get_color(keys::FILL_COLOR), None);
    }

    #[test]
    fn rotation_wraps_negative_angles() {
        let s = Style::new().with(keys::ROTATION, -90);
        assert_eq!(s.rotation(), 270.0);
    }

    #[test]
    fn stylesheet_layers_named_then_inline() {
        let sheet = Stylesheet::default().with_named(
            "warn",
            Style::new().with(keys::FILL_COLOR, "#ff0000").with(keys::SHADOW, 1),
        );
        let resolved = sheet
            .resolve(&Style::parse("warn;shadow=0;shape=ellipse").unwrap(), false)
            .unwrap();
        assert_eq!(resolved.get(keys::FILL_COLOR), Some("#ff0000"));
        assert_eq!(resolved.get(keys::SHADOW), Some("0"));
        assert_eq!(resolved.get(keys::SHAPE), Some("ellipse"));
        assert!(sheet.resolve(&Style::parse("missing").unwrap(), false).is_err());
    }

    #[test]
    fn direction_offsets() {
        assert_eq!(Direction::North.rotation_offset(), 270.0);
        assert_eq!(Direction::West.rotation_offset(), 180.0);
        assert_eq!(Direction::South.rotation_offset(), 90.0);
        assert!(Direction::South.is_inverted());
    }
}
