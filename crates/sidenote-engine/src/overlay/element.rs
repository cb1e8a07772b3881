use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// 8-bit RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => {
                let short = |i: usize| {
                    u8::from_str_radix(hex.get(i..i + 1)?, 16)
                        .ok()
                        .map(|v| v * 17)
                };
                Some(Self::new(short(0)?, short(1)?, short(2)?, 0xff))
            }
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 0xff)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Colours used to paint highlight rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub fill: Rgba,
    /// Emphasis while the pointer is over any rectangle of the highlight
    pub hover_fill: Rgba,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: Rgba::new(0xfd, 0xe6, 0x8a, 0xb3),
            hover_fill: Rgba::new(0xfb, 0xbf, 0x24, 0xcc),
        }
    }
}

/// One painted rectangle: a single visual line of one highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    pub highlight_id: String,
    /// Index of the line within the highlight, top to bottom
    pub line: usize,
    /// Container-relative position
    pub rect: Rect,
}

/// An element together with how it should be painted right now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintedRect<'a> {
    pub element: &'a OverlayElement,
    pub fill: Rgba,
    pub hovered: bool,
}
