//! Element definitions for the card canvas.

mod color;
mod image;
mod shape;
mod text;

pub use color::HexColor;
pub use image::{
    DEFAULT_BLUR_RADIUS, ImageFilter, ImageProps, MAX_BLUR_RADIUS, MAX_IMAGE_BORDER_RADIUS,
    MAX_IMAGE_BORDER_WIDTH, PixelSource,
};
pub use shape::{
    DEFAULT_SHAPE_COLOR, MAX_SHAPE_BORDER_RADIUS, ShapeCorners, ShapeKind, ShapeProps,
};
pub use text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT_CONTENT, TextProps};

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque element identifier, unique within a canvas and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Variant-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text(TextProps),
    Image(ImageProps),
    Shape(ShapeProps),
}

impl ElementKind {
    /// Short lowercase name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Shape(_) => "shape",
        }
    }
}

/// What to create with [`CanvasState::add_element`](crate::CanvasState::add_element).
#[derive(Debug, Clone, PartialEq)]
pub enum NewElement {
    Text,
    /// An image showing an already-decoded source.
    Image(Option<PixelSource>),
    Rectangle,
    Circle,
}

impl NewElement {
    /// Default top-left position and size for this kind of element.
    pub fn default_bounds(&self) -> Rect {
        match self {
            NewElement::Text => Rect::new(50.0, 50.0, 250.0, 100.0),
            NewElement::Image(_) => Rect::new(100.0, 100.0, 300.0, 300.0),
            NewElement::Rectangle | NewElement::Circle => Rect::new(150.0, 150.0, 250.0, 250.0),
        }
    }

    /// Default variant payload for this kind of element.
    pub fn default_kind(self) -> ElementKind {
        match self {
            NewElement::Text => ElementKind::Text(TextProps::default()),
            NewElement::Image(source) => ElementKind::Image(ImageProps::new(source)),
            NewElement::Rectangle => ElementKind::Shape(ShapeProps::new(ShapeKind::Rectangle)),
            NewElement::Circle => ElementKind::Shape(ShapeProps::new(ShapeKind::Circle)),
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// One positioned, rotatable, stylable primitive on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub(crate) id: ElementId,
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Left edge in canvas pixels.
    pub x: f64,
    /// Top edge in canvas pixels.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Uniform alpha multiplier, `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Rotation about the box center, `-180..=180`.
    #[serde(default, rename = "rotation")]
    pub rotation_degrees: f64,
    /// Paint order; higher draws on top.
    pub z_index: u32,
}

impl Element {
    /// Create an element with an explicit id and box.
    pub fn new(id: impl Into<ElementId>, kind: ElementKind, bounds: Rect, z_index: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            x: bounds.x0,
            y: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            opacity: 1.0,
            rotation_degrees: 0.0,
            z_index,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Unrotated box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Geometric center of the box; rotation never moves it.
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Map from box-local coordinates (`0..width`, `0..height`) to canvas
    /// coordinates: translate to the center, rotate, translate back to the corner.
    pub fn transform(&self) -> Affine {
        let half = Vec2::new(self.width / 2.0, self.height / 2.0);
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.rotation_degrees.to_radians())
            * Affine::translate(-half)
    }

    /// Whether a canvas point falls inside the rotated box.
    pub fn contains(&self, point: Point) -> bool {
        if !self.is_renderable() {
            return false;
        }
        let local = self.transform().inverse() * point;
        local.x >= 0.0 && local.y >= 0.0 && local.x <= self.width && local.y <= self.height
    }

    /// Finite geometry with a positive size.
    pub fn is_renderable(&self) -> bool {
        [self.x, self.y, self.width, self.height, self.opacity, self.rotation_degrees]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn as_text(&self) -> Option<&TextProps> {
        match &self.kind {
            ElementKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageProps> {
        match &self.kind {
            ElementKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeProps> {
        match &self.kind {
            ElementKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}
