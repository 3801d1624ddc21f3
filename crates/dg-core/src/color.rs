//! RGBA colors as they appear in cell styles.

use serde::{Deserialize, Serialize};

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
];

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA` (leading `#` optional) or a
    /// basic CSS color name. `none` and unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return None;
        }
        if let Some((_, rgb)) = NAMED.iter().find(|(name, _)| s.eq_ignore_ascii_case(name)) {
            return Some(Self::rgb8(rgb[0], rgb[1], rgb[2]));
        }
        Self::from_hex(s)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgb8(r * 17, g * 17, b * 17))
            }
            6 | 8 => {
                let r = hex_val(bytes[0])? << 4 | hex_val(bytes[1])?;
                let g = hex_val(bytes[2])? << 4 | hex_val(bytes[3])?;
                let b = hex_val(bytes[4])? << 4 | hex_val(bytes[5])?;
                let mut c = Self::rgb8(r, g, b);
                if bytes.len() == 8 {
                    let a = hex_val(bytes[6])? << 4 | hex_val(bytes[7])?;
                    c.a = a as f32 / 255.0;
                }
                Some(c)
            }
            _ => None,
        }
    }

    fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// `#RRGGBB`, alpha dropped. Markup carries opacity separately.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.channels();
        format!("#{r:02X}{g:02X}{b:02X}")
    }

    /// Lowercase hex digits without `#`, used to build definition IDs.
    pub fn id_fragment(&self) -> String {
        let [r, g, b] = self.channels();
        format!("{r:02x}{g:02x}{b:02x}")
    }
}
