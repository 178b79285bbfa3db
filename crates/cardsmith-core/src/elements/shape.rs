//! Shape element properties.

use super::HexColor;
use serde::{Deserialize, Serialize};

/// Fill used by newly created shapes.
pub const DEFAULT_SHAPE_COLOR: HexColor = HexColor::rgb(0x3b, 0x82, 0xf6);
/// Largest accepted shape border radius (percent of the box).
pub const MAX_SHAPE_BORDER_RADIUS: f64 = 50.0;

/// Which kind of shape was created; only affects the default corner preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
}

/// The two corner presets offered next to the radius slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeCorners {
    /// Sharp corners (`0`).
    Square,
    /// Fully rounded (`50`): a circle on a square box.
    Circle,
}

impl ShapeCorners {
    /// The border radius this preset stands for.
    pub fn border_radius(self) -> f64 {
        match self {
            ShapeCorners::Square => 0.0,
            ShapeCorners::Circle => MAX_SHAPE_BORDER_RADIUS,
        }
    }
}

/// Styling of a shape element.
///
/// When deserialized without a `borderRadius`, the radius comes from the
/// preset of its `kind`, so a `"circle"` descriptor stays round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ShapePropsDescriptor")]
pub struct ShapeProps {
    pub kind: ShapeKind,
    pub background_color: HexColor,
    /// Corner rounding in percent of the box, `0..=50`.
    pub border_radius: f64,
}

/// Wire form of [`ShapeProps`] with every field optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapePropsDescriptor {
    #[serde(default)]
    kind: ShapeKind,
    background_color: Option<HexColor>,
    border_radius: Option<f64>,
}

impl From<ShapePropsDescriptor> for ShapeProps {
    fn from(raw: ShapePropsDescriptor) -> Self {
        let preset = ShapeProps::new(raw.kind);
        Self {
            kind: raw.kind,
            background_color: raw.background_color.unwrap_or(preset.background_color),
            border_radius: raw.border_radius.unwrap_or(preset.border_radius),
        }
    }
}

impl Default for ShapeProps {
    fn default() -> Self {
        Self::new(ShapeKind::Rectangle)
    }
}

impl ShapeProps {
    /// Default styling for a shape of the given kind.
    pub fn new(kind: ShapeKind) -> Self {
        let corners = match kind {
            ShapeKind::Rectangle => ShapeCorners::Square,
            ShapeKind::Circle => ShapeCorners::Circle,
        };
        Self {
            kind,
            background_color: DEFAULT_SHAPE_COLOR,
            border_radius: corners.border_radius(),
        }
    }

    pub fn with_background(mut self, color: HexColor) -> Self {
        self.background_color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_selects_corner_preset() {
        assert_eq!(ShapeProps::new(ShapeKind::Rectangle).border_radius, 0.0);
        assert_eq!(ShapeProps::new(ShapeKind::Circle).border_radius, 50.0);
    }

    #[test]
    fn test_missing_radius_follows_kind() {
        let circle: ShapeProps = serde_json::from_str(r#"{"kind": "circle"}"#).unwrap();
        assert_eq!(circle.border_radius, 50.0);
        assert_eq!(circle.background_color, DEFAULT_SHAPE_COLOR);

        let rect: ShapeProps = serde_json::from_str("{}").unwrap();
        assert_eq!(rect.kind, ShapeKind::Rectangle);
        assert_eq!(rect.border_radius, 0.0);

        let squared: ShapeProps =
            serde_json::from_str(r#"{"kind": "circle", "borderRadius": 0}"#).unwrap();
        assert_eq!(squared.border_radius, 0.0);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ShapeCorners::Square.border_radius(), 0.0);
        assert_eq!(ShapeCorners::Circle.border_radius(), 50.0);
    }
}
