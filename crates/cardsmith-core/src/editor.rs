//! Property editor: typed mutations of the selected element.
//!
//! Every edit goes through [`CanvasState::update_selected`], so an edit can only
//! ever reach the currently selected element. Fields that do not exist on the
//! selected element's variant are ignored. Numeric form input is coerced the way
//! a browser's `parseInt`/`parseFloat` would read it, with unparsable text
//! becoming `0` before the field's own constraint is applied.

use crate::canvas::CanvasState;
use crate::elements::{
    Element, ElementKind, HexColor, ImageFilter, MAX_IMAGE_BORDER_RADIUS, MAX_IMAGE_BORDER_WIDTH,
    MAX_SHAPE_BORDER_RADIUS, PixelSource, ShapeCorners,
};
use std::str::FromStr;

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub opacity: Option<f64>,
    pub rotation_degrees: Option<f64>,
    // Text
    pub content: Option<String>,
    pub font_size: Option<u32>,
    pub font_family: Option<String>,
    pub color: Option<HexColor>,
    // Image and shape
    pub border_radius: Option<f64>,
    // Image
    pub source: Option<PixelSource>,
    pub filter: Option<ImageFilter>,
    pub border_width: Option<f64>,
    pub border_color: Option<HexColor>,
    // Text and shape
    pub background_color: Option<HexColor>,
}

fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl ElementPatch {
    /// Apply the patch, enforcing each field's type constraint.
    /// Returns whether the element changed.
    pub fn apply_to(&self, element: &mut Element) -> bool {
        let mut changed = false;

        if let Some(x) = self.x.and_then(finite) {
            changed |= set(&mut element.x, x.max(0.0));
        }
        if let Some(y) = self.y.and_then(finite) {
            changed |= set(&mut element.y, y.max(0.0));
        }
        if let Some(width) = self.width.and_then(finite) {
            changed |= set(&mut element.width, width.max(1.0));
        }
        if let Some(height) = self.height.and_then(finite) {
            changed |= set(&mut element.height, height.max(1.0));
        }
        if let Some(opacity) = self.opacity.and_then(finite) {
            changed |= set(&mut element.opacity, opacity.clamp(0.0, 1.0));
        }
        if let Some(rotation) = self.rotation_degrees.and_then(finite) {
            changed |= set(&mut element.rotation_degrees, rotation.clamp(-180.0, 180.0));
        }

        let ignored = match &mut element.kind {
            ElementKind::Text(text) => {
                if let Some(content) = &self.content {
                    changed |= set(&mut text.content, content.clone());
                }
                if let Some(font_size) = self.font_size {
                    changed |= set(&mut text.font_size, font_size.max(1));
                }
                if let Some(font_family) = &self.font_family {
                    changed |= set(&mut text.font_family, font_family.clone());
                }
                if let Some(color) = self.color {
                    changed |= set(&mut text.color, color);
                }
                if let Some(background) = self.background_color {
                    changed |= set(&mut text.background_color, Some(background));
                }
                self.border_radius.is_some()
                    || self.source.is_some()
                    || self.filter.is_some()
                    || self.border_width.is_some()
                    || self.border_color.is_some()
            }
            ElementKind::Image(image) => {
                if let Some(radius) = self.border_radius.and_then(finite) {
                    changed |= set(
                        &mut image.border_radius,
                        radius.clamp(0.0, MAX_IMAGE_BORDER_RADIUS),
                    );
                }
                if let Some(source) = &self.source {
                    changed |= set(&mut image.source, Some(source.clone()));
                }
                if let Some(filter) = self.filter {
                    changed |= set(&mut image.filter, filter.clamped());
                }
                if let Some(width) = self.border_width.and_then(finite) {
                    changed |= set(
                        &mut image.border_width,
                        width.clamp(0.0, MAX_IMAGE_BORDER_WIDTH),
                    );
                }
                if let Some(color) = self.border_color {
                    changed |= set(&mut image.border_color, color);
                }
                self.content.is_some()
                    || self.font_size.is_some()
                    || self.font_family.is_some()
                    || self.color.is_some()
                    || self.background_color.is_some()
            }
            ElementKind::Shape(shape) => {
                if let Some(color) = self.background_color {
                    changed |= set(&mut shape.background_color, color);
                }
                if let Some(radius) = self.border_radius.and_then(finite) {
                    changed |= set(
                        &mut shape.border_radius,
                        radius.clamp(0.0, MAX_SHAPE_BORDER_RADIUS),
                    );
                }
                self.content.is_some()
                    || self.font_size.is_some()
                    || self.font_family.is_some()
                    || self.color.is_some()
                    || self.source.is_some()
                    || self.filter.is_some()
                    || self.border_width.is_some()
                    || self.border_color.is_some()
            }
        };
        if ignored {
            log::debug!(
                "ignoring fields that {} elements do not have",
                element.kind.name()
            );
        }

        changed
    }
}

/// Editable fields, named as the property form names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Width,
    Height,
    Opacity,
    Rotation,
    Content,
    FontSize,
    FontFamily,
    Color,
    BorderRadius,
    Filter,
    BorderWidth,
    BorderColor,
    BackgroundColor,
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "x" => Field::X,
            "y" => Field::Y,
            "width" => Field::Width,
            "height" => Field::Height,
            "opacity" => Field::Opacity,
            "rotation" => Field::Rotation,
            "content" => Field::Content,
            "fontSize" => Field::FontSize,
            "fontFamily" => Field::FontFamily,
            "color" => Field::Color,
            "borderRadius" => Field::BorderRadius,
            "filter" => Field::Filter,
            "borderWidth" => Field::BorderWidth,
            "borderColor" => Field::BorderColor,
            "backgroundColor" => Field::BackgroundColor,
            other => return Err(other.to_string()),
        })
    }
}

/// Read a leading integer like `parseInt`: `"12px"` is 12, `"abc"` is 0.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().unwrap_or(0);
    if negative { -value } else { value }
}

/// Read a leading decimal number like `parseFloat`: `"0.5x"` is 0.5, `"x"` is 0.
pub fn coerce_float(raw: &str) -> f64 {
    let s = raw.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return 0.0;
    }
    s[..end].parse::<f64>().unwrap_or(0.0)
}

fn color_or_warn(field: Field, raw: &str) -> Option<HexColor> {
    match HexColor::parse(raw) {
        Ok(color) => Some(color),
        Err(err) => {
            log::warn!("{field:?}: {err}");
            None
        }
    }
}

/// Build the patch a form input produces. Returns `None` when the input is
/// rejected outright (an unparsable color or filter), leaving the field as is.
pub fn parse_field(field: Field, raw: &str) -> Option<ElementPatch> {
    let mut patch = ElementPatch::default();
    let int = || coerce_int(raw) as f64;
    match field {
        Field::X => patch.x = Some(int()),
        Field::Y => patch.y = Some(int()),
        Field::Width => patch.width = Some(int()),
        Field::Height => patch.height = Some(int()),
        Field::Opacity => patch.opacity = Some(coerce_float(raw)),
        Field::Rotation => patch.rotation_degrees = Some(coerce_float(raw)),
        Field::Content => patch.content = Some(raw.to_string()),
        Field::FontSize => {
            patch.font_size = Some(coerce_int(raw).clamp(0, i64::from(u32::MAX)) as u32)
        }
        Field::FontFamily => patch.font_family = Some(raw.to_string()),
        Field::Color => patch.color = Some(color_or_warn(field, raw)?),
        Field::BorderRadius => patch.border_radius = Some(coerce_float(raw)),
        Field::Filter => match raw.parse::<ImageFilter>() {
            Ok(filter) => patch.filter = Some(filter),
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        },
        Field::BorderWidth => patch.border_width = Some(coerce_float(raw)),
        Field::BorderColor => patch.border_color = Some(color_or_warn(field, raw)?),
        Field::BackgroundColor => patch.background_color = Some(color_or_warn(field, raw)?),
    }
    Some(patch)
}

/// Form-level entry points over [`CanvasState::update_selected`].
pub struct PropertyEditor;

impl PropertyEditor {
    /// Set one field of the selected element from raw form text.
    /// Unknown field names are ignored. Returns whether the element changed.
    pub fn set_field(canvas: &mut CanvasState, name: &str, raw: &str) -> bool {
        let field = match name.parse::<Field>() {
            Ok(field) => field,
            Err(unknown) => {
                log::debug!("ignoring unknown field {unknown:?}");
                return false;
            }
        };
        match parse_field(field, raw) {
            Some(patch) => canvas.update_selected(&patch),
            None => false,
        }
    }

    /// Apply the square/circle corner preset to the selected shape.
    pub fn set_shape_corners(canvas: &mut CanvasState, corners: ShapeCorners) -> bool {
        canvas.update_selected(&ElementPatch {
            border_radius: Some(corners.border_radius()),
            ..ElementPatch::default()
        })
    }

    /// Swap the pixels shown by the selected image.
    pub fn set_image_source(canvas: &mut CanvasState, source: PixelSource) -> bool {
        canvas.update_selected(&ElementPatch {
            source: Some(source),
            ..ElementPatch::default()
        })
    }
}
