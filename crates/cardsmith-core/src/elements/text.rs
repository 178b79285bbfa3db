//! Text element properties.

use super::HexColor;
use serde::{Deserialize, Serialize};

/// Text shown by newly created text elements.
pub const DEFAULT_TEXT_CONTENT: &str = "Texto editável";
/// Default font size in canvas pixels.
pub const DEFAULT_FONT_SIZE: u32 = 24;
/// Default font family list (CSS-like, comma separated).
pub const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";

/// Styling of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextProps {
    /// The text itself; may span several lines.
    pub content: String,
    /// Font size in canvas pixels (always ≥ 1).
    pub font_size: u32,
    /// Font family list, e.g. `"Georgia, serif"`.
    pub font_family: String,
    /// Glyph color.
    pub color: HexColor,
    /// Optional box background; transparent when `None`.
    pub background_color: Option<HexColor>,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            content: DEFAULT_TEXT_CONTENT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            color: HexColor::black(),
            background_color: None,
        }
    }
}

impl TextProps {
    /// Text properties with the given content and default styling.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size.max(1);
        self
    }

    pub fn with_font_family(mut self, font_family: impl Into<String>) -> Self {
        self.font_family = font_family.into();
        self
    }

    pub fn with_color(mut self, color: HexColor) -> Self {
        self.color = color;
        self
    }
}
