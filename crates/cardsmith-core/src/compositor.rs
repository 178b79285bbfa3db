//! Render rules: how each element's on-screen geometry and paint derive from
//! its fields, independent of any rendering API.
//!
//! Both the live preview and the export rasterizer draw from the output of
//! [`compose`], so the two can only differ in the backend, never in the rules.
//! All geometry is expressed in box-local coordinates (`0..width`, `0..height`)
//! plus one [`Affine`] per element mapping the box onto the canvas.

use crate::canvas::CanvasState;
use crate::elements::{Element, ElementId, ElementKind, HexColor, ImageFilter, PixelSource};
use kurbo::{Affine, Arc, BezPath, Ellipse, Point, Rect, Shape as _, Size, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Flattening tolerance used when converting curves to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Outline of a box after applying a percentage corner radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerShape {
    Square,
    /// Elliptical corners with these horizontal and vertical radii in pixels.
    Rounded(Vec2),
    /// Fully rounded: the ellipse inscribed in the box.
    Ellipse,
}

impl CornerShape {
    /// Resolve a `0..=50` percentage radius against a box size.
    ///
    /// `50` gives the inscribed ellipse (a circle on a square box); values in
    /// between round each corner by that percentage of the box width
    /// horizontally and of the box height vertically.
    pub fn from_percent(percent: f64, size: Size) -> Self {
        if !percent.is_finite() || percent <= 0.0 {
            CornerShape::Square
        } else if percent >= 50.0 {
            CornerShape::Ellipse
        } else {
            CornerShape::Rounded(Vec2::new(
                size.width * percent / 100.0,
                size.height * percent / 100.0,
            ))
        }
    }

    /// The outline of `rect` with these corners.
    pub fn path(&self, rect: Rect) -> BezPath {
        match *self {
            CornerShape::Square => rect.to_path(PATH_TOLERANCE),
            CornerShape::Rounded(radii) => rounded_rect_path(rect, radii),
            CornerShape::Ellipse => Ellipse::from_rect(rect).to_path(PATH_TOLERANCE),
        }
    }

    /// The outline of `rect` shrunk by `inset` on every side, with the corner
    /// radius shrunk to match. Used to keep a stroke of width `2 * inset`
    /// inside the box.
    pub fn inset_path(&self, rect: Rect, inset: f64) -> BezPath {
        let inner = rect.inflate(-inset, -inset);
        let corners = match *self {
            CornerShape::Rounded(radii) => CornerShape::Rounded(Vec2::new(
                (radii.x - inset).max(0.0),
                (radii.y - inset).max(0.0),
            )),
            other => other,
        };
        corners.path(inner)
    }
}

/// `rect` with elliptical corners, clockwise from the top edge.
fn rounded_rect_path(rect: Rect, radii: Vec2) -> BezPath {
    let rx = radii.x.clamp(0.0, rect.width() / 2.0);
    let ry = radii.y.clamp(0.0, rect.height() / 2.0);
    if rx <= 0.0 || ry <= 0.0 {
        return rect.to_path(PATH_TOLERANCE);
    }

    let corners = [
        (Point::new(rect.x1 - rx, rect.y0 + ry), -FRAC_PI_2),
        (Point::new(rect.x1 - rx, rect.y1 - ry), 0.0),
        (Point::new(rect.x0 + rx, rect.y1 - ry), FRAC_PI_2),
        (Point::new(rect.x0 + rx, rect.y0 + ry), PI),
    ];
    let mut path = BezPath::new();
    path.move_to(Point::new(rect.x0 + rx, rect.y0));
    for (center, start_angle) in corners {
        let arc = Arc {
            center,
            radii: Vec2::new(rx, ry),
            start_angle,
            sweep_angle: FRAC_PI_2,
            x_rotation: 0.0,
        };
        path.line_to(center + Vec2::new(rx * start_angle.cos(), ry * start_angle.sin()));
        path.extend(arc.append_iter(PATH_TOLERANCE));
    }
    path.close_path();
    path
}

/// Paint for a text element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPaint {
    pub content: String,
    pub font_family: String,
    pub font_size: f64,
    pub color: HexColor,
    /// Box fill behind the text; transparent when `None`.
    pub background: Option<HexColor>,
}

impl TextPaint {
    /// Top-left of a laid-out text block inside its box: left-aligned and
    /// vertically centered. Text taller than the box overflows both edges.
    pub fn origin(box_size: Size, layout_height: f64) -> Point {
        Point::new(0.0, (box_size.height - layout_height) / 2.0)
    }
}

/// Stroke drawn along the inside of an image's outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f64,
    pub color: HexColor,
}

/// Paint for an image element.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePaint {
    /// `None` paints an empty box.
    pub source: Option<PixelSource>,
    /// Maps source pixels into box-local coordinates, covering the box.
    pub cover: Affine,
    pub corners: CornerShape,
    pub filter: ImageFilter,
    pub border: Option<Border>,
}

/// Paint for a shape element.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePaint {
    pub fill: HexColor,
    pub corners: CornerShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Text(TextPaint),
    Image(ImagePaint),
    Shape(ShapePaint),
}

/// One element ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositedElement {
    pub id: ElementId,
    /// Box-local to canvas coordinates (rotation about the box center).
    pub transform: Affine,
    pub size: Size,
    /// Uniform alpha over the whole element, `0.0..=1.0`.
    pub opacity: f64,
    pub paint: Paint,
}

impl CompositedElement {
    /// The box in local coordinates.
    pub fn local_rect(&self) -> Rect {
        self.size.to_rect()
    }

    /// The rotated box outline in canvas coordinates.
    pub fn outline(&self) -> BezPath {
        self.transform * self.local_rect().to_path(PATH_TOLERANCE)
    }
}

/// Scale and center `source` so it covers `target` entirely, cropping the
/// overflow on one axis while preserving aspect ratio.
pub fn cover_transform(source: Size, target: Size) -> Affine {
    if source.width <= 0.0 || source.height <= 0.0 {
        return Affine::IDENTITY;
    }
    let scale = (target.width / source.width).max(target.height / source.height);
    let offset = Vec2::new(
        (target.width - source.width * scale) / 2.0,
        (target.height - source.height * scale) / 2.0,
    );
    Affine::translate(offset) * Affine::scale(scale)
}

/// Derive the draw description of one element, or `None` if its geometry
/// cannot be drawn.
pub fn compose_element(element: &Element) -> Option<CompositedElement> {
    if !element.is_renderable() {
        return None;
    }
    let size = element.size();
    let paint = match &element.kind {
        ElementKind::Text(text) => Paint::Text(TextPaint {
            content: text.content.clone(),
            font_family: text.font_family.clone(),
            font_size: f64::from(text.font_size.max(1)),
            color: text.color,
            background: text.background_color,
        }),
        ElementKind::Image(image) => {
            let cover = image
                .source
                .as_ref()
                .map(|src| {
                    cover_transform(
                        Size::new(f64::from(src.width()), f64::from(src.height())),
                        size,
                    )
                })
                .unwrap_or(Affine::IDENTITY);
            let border = (image.border_width > 0.0).then_some(Border {
                width: image.border_width,
                color: image.border_color,
            });
            Paint::Image(ImagePaint {
                source: image.source.clone(),
                cover,
                corners: CornerShape::from_percent(image.border_radius, size),
                filter: image.filter.clamped(),
                border,
            })
        }
        ElementKind::Shape(shape) => Paint::Shape(ShapePaint {
            fill: shape.background_color,
            corners: CornerShape::from_percent(shape.border_radius, size),
        }),
    };

    Some(CompositedElement {
        id: element.id().clone(),
        transform: element.transform(),
        size,
        opacity: element.opacity.clamp(0.0, 1.0),
        paint,
    })
}

/// Compose every drawable element in paint order (ascending z-index).
/// Elements with degenerate geometry are skipped.
pub fn compose(canvas: &CanvasState) -> Vec<CompositedElement> {
    canvas
        .paint_order()
        .into_iter()
        .filter_map(|element| {
            let composed = compose_element(element);
            if composed.is_none() {
                log::warn!("skipping element {} with unrenderable geometry", element.id());
            }
            composed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ImageProps, NewElement, ShapeProps, TextProps};

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn test_corner_shape_from_percent() {
        let square = Size::new(100.0, 100.0);
        assert_eq!(CornerShape::from_percent(0.0, square), CornerShape::Square);
        assert_eq!(CornerShape::from_percent(50.0, square), CornerShape::Ellipse);
        assert_eq!(
            CornerShape::from_percent(10.0, Size::new(200.0, 80.0)),
            CornerShape::Rounded(Vec2::new(20.0, 8.0))
        );
        assert_eq!(CornerShape::from_percent(f64::NAN, square), CornerShape::Square);
    }

    #[test]
    fn test_full_radius_on_square_is_circle() {
        let path = CornerShape::Ellipse.path(Rect::new(0.0, 0.0, 100.0, 100.0));
        let bbox = path.bounding_box();
        assert!((bbox.width() - 100.0).abs() < 1e-6);
        assert!(path.contains(Point::new(50.0, 50.0)));
        assert!(!path.contains(Point::new(3.0, 3.0)));
    }

    #[test]
    fn test_intermediate_radius_is_per_axis() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let corners = CornerShape::from_percent(20.0, rect.size());
        assert_eq!(corners, CornerShape::Rounded(Vec2::new(40.0, 20.0)));

        let path = corners.path(rect);
        let bbox = path.bounding_box();
        assert!((bbox.width() - 200.0).abs() < 1e-6);
        assert!((bbox.height() - 100.0).abs() < 1e-6);
        assert!(path.contains(Point::new(100.0, 50.0)));
        assert!(path.contains(Point::new(100.0, 1.0)));
        // Inside a 20px circular corner, outside the 40x20 elliptical one.
        assert!(!path.contains(Point::new(15.0, 3.0)));
        assert!(path.contains(Point::new(10.0, 15.0)));
    }

    #[test]
    fn test_rounded_inset_shrinks_both_radii() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let corners = CornerShape::Rounded(Vec2::new(40.0, 20.0));
        let bbox = corners.inset_path(rect, 5.0).bounding_box();
        assert!((bbox.x0 - 5.0).abs() < 1e-6 && (bbox.y1 - 95.0).abs() < 1e-6);
        let huge = CornerShape::Rounded(Vec2::new(500.0, 500.0)).path(rect);
        assert!((huge.bounding_box().width() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_circle_descriptor_composes_as_ellipse() {
        let elements = crate::template::from_json(
            r#"[{"id":"c","type":"shape","kind":"circle","x":0,"y":0,"width":100,"height":100,"zIndex":1}]"#,
        )
        .unwrap();
        let Paint::Shape(paint) = compose_element(&elements[0]).unwrap().paint else {
            panic!("expected shape paint");
        };
        assert_eq!(paint.corners, CornerShape::Ellipse);
    }

    #[test]
    fn test_inset_path_shrinks() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let bbox = CornerShape::Square.inset_path(rect, 2.0).bounding_box();
        assert_eq!(bbox, Rect::new(2.0, 2.0, 98.0, 48.0));
    }

    #[test]
    fn test_cover_crops_longer_axis() {
        // Landscape source into a square box: height fills, width overflows.
        let t = cover_transform(Size::new(400.0, 200.0), Size::new(100.0, 100.0));
        assert!(close(t * Point::new(0.0, 0.0), Point::new(-50.0, 0.0)));
        assert!(close(t * Point::new(400.0, 200.0), Point::new(150.0, 100.0)));
        assert!(close(t * Point::new(200.0, 100.0), Point::new(50.0, 50.0)));
    }

    #[test]
    fn test_compose_follows_z_order() {
        let mut canvas = CanvasState::default();
        canvas.replace_all(vec![
            Element::new(
                "b",
                ElementKind::Shape(ShapeProps::default()),
                Rect::new(0.0, 0.0, 10.0, 10.0),
                5,
            ),
            Element::new(
                "a",
                ElementKind::Text(TextProps::default()),
                Rect::new(0.0, 0.0, 10.0, 10.0),
                2,
            ),
        ]);
        let composed = compose(&canvas);
        let ids: Vec<&str> = composed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_compose_skips_degenerate_elements() {
        let mut canvas = CanvasState::default();
        let mut broken = Element::new(
            "broken",
            ElementKind::Shape(ShapeProps::default()),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            1,
        );
        broken.width = f64::NAN;
        canvas.replace_all(vec![broken]);
        canvas.add_element(NewElement::Circle);
        assert_eq!(compose(&canvas).len(), 1);
    }

    #[test]
    fn test_rotation_keeps_center_in_transform() {
        for degrees in [-180.0, -90.0, -33.0, 0.0, 45.0, 179.0] {
            let el = Element::new(
                "r",
                ElementKind::Image(ImageProps::default()),
                Rect::new(40.0, 60.0, 240.0, 160.0),
                1,
            )
            .with_rotation(degrees);
            let composed = compose_element(&el).unwrap();
            let center = composed.transform * composed.local_rect().center();
            assert!(close(center, Point::new(140.0, 110.0)), "{degrees}");
        }
    }

    #[test]
    fn test_image_paint_fields() {
        let source = PixelSource::from_rgba8(2, 1, &[0; 8]).unwrap();
        let mut props = ImageProps::new(Some(source));
        props.border_width = 3.0;
        props.border_radius = 50.0;
        props.filter = ImageFilter::Sepia;
        let el = Element::new(
            "img",
            ElementKind::Image(props),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            1,
        );
        let Paint::Image(paint) = compose_element(&el).unwrap().paint else {
            panic!("expected image paint");
        };
        assert_eq!(paint.corners, CornerShape::Ellipse);
        assert_eq!(paint.filter, ImageFilter::Sepia);
        assert_eq!(paint.border.unwrap().width, 3.0);
        // 2x1 source scaled by 100 to cover the height.
        assert!(close(paint.cover * Point::new(2.0, 1.0), Point::new(150.0, 100.0)));
    }

    #[test]
    fn test_text_origin_centers_vertically() {
        assert_eq!(
            TextPaint::origin(Size::new(200.0, 50.0), 30.0),
            Point::new(0.0, 10.0)
        );
        assert_eq!(
            TextPaint::origin(Size::new(200.0, 20.0), 40.0),
            Point::new(0.0, -10.0)
        );
    }

    #[test]
    fn test_opacity_is_clamped() {
        let el = Element::new(
            "s",
            ElementKind::Shape(ShapeProps::default()),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            1,
        )
        .with_opacity(3.0);
        assert_eq!(compose_element(&el).unwrap().opacity, 1.0);
    }
}
