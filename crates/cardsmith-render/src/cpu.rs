//! CPU rendering backend built on `vello_cpu` with `parley` text layout.
//!
//! The same backend serves the live preview (at zoom scale, with selection
//! chrome) and export (scale 1, no chrome). It is single threaded and does no
//! time-dependent work, so identical input produces identical pixels.

use crate::filter::apply_filter;
use crate::renderer::{Frame, RenderContext, RenderResult, Renderer, RendererError};
use cardsmith_core::{
    CompositedElement, HexColor, ImagePaint, Paint, PixelSource, ShapePaint, TextPaint, compose,
    compose_element,
};
use kurbo::{Affine, BezPath, PathEl, Shape as _, Size};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Selection outline width in device pixels.
const SELECTION_STROKE_WIDTH: f64 = 2.0;

/// Brush carried through parley layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<HexColor> for TextBrush {
    fn from(c: HexColor) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Renderer that rasterizes on the CPU.
pub struct CpuRenderer {
    font_cx: parley::FontContext,
    layout_cx: parley::LayoutContext<TextBrush>,
    /// Fonts converted for `vello_cpu`, by (blob id, collection index).
    fonts: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
    /// Source pixmaps by pixel source id; pruned to the sources of the last frame.
    sources: HashMap<u64, Arc<vello_cpu::Pixmap>>,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuRenderer {
    pub fn new() -> Self {
        Self {
            font_cx: parley::FontContext::default(),
            layout_cx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Make a TTF/OTF font available to text elements by family name.
    /// Returns the registered family names.
    pub fn register_font(&mut self, font_bytes: Vec<u8>) -> RenderResult<Vec<String>> {
        let families = self
            .font_cx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        let mut names = Vec::with_capacity(families.len());
        for (id, _) in &families {
            if let Some(name) = self.font_cx.collection.family_name(*id) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(RendererError::RenderFailed(
                "no font families found in font data".into(),
            ));
        }
        log::debug!("registered font families {names:?}");
        Ok(names)
    }

    fn draw_element(
        &mut self,
        rcx: &mut vello_cpu::RenderContext,
        view: Affine,
        scale: f64,
        element: &CompositedElement,
        live_sources: &mut HashSet<u64>,
    ) {
        let transform = view * element.transform;
        rcx.set_transform(affine_to_cpu(transform));
        rcx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let opacity = element.opacity as f32;
        if opacity < 1.0 {
            rcx.push_opacity_layer(opacity);
        }
        match &element.paint {
            Paint::Text(text) => self.draw_text(rcx, transform, element, text),
            Paint::Image(image) => self.draw_image(rcx, scale, element, image, live_sources),
            Paint::Shape(shape) => draw_shape(rcx, element, shape),
        }
        if opacity < 1.0 {
            rcx.pop_layer();
        }
    }

    fn layout_text(&mut self, text: &TextPaint, max_width: f32) -> parley::Layout<TextBrush> {
        let mut builder = self
            .layout_cx
            .ranged_builder(&mut self.font_cx, &text.content, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Borrowed(text.font_family.as_str())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(text.font_size as f32));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush::from(
            text.color,
        )));

        let mut layout: parley::Layout<TextBrush> = builder.build(&text.content);
        layout.break_all_lines(Some(max_width));
        layout.align(
            Some(max_width),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        layout
    }

    fn draw_text(
        &mut self,
        rcx: &mut vello_cpu::RenderContext,
        transform: Affine,
        element: &CompositedElement,
        text: &TextPaint,
    ) {
        if let Some(background) = text.background {
            rcx.set_paint(cpu_color(background));
            rcx.fill_rect(&rect_to_cpu(element.local_rect()));
        }
        if text.content.is_empty() {
            return;
        }

        let layout = self.layout_text(text, element.size.width as f32);
        let origin = TextPaint::origin(element.size, f64::from(layout.height()));
        rcx.set_transform(affine_to_cpu(
            transform * Affine::translate(origin.to_vec2()),
        ));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                rcx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let font = run.run().font();
                let cpu_font = self
                    .fonts
                    .entry((font.data.id(), font.index))
                    .or_insert_with(|| {
                        vello_cpu::peniko::FontData::new(
                            vello_cpu::peniko::Blob::from(font.data.data().to_vec()),
                            font.index,
                        )
                    })
                    .clone();
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: u32::from(g.id),
                    x: g.x,
                    y: g.y,
                });
                rcx.glyph_run(&cpu_font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    fn draw_image(
        &mut self,
        rcx: &mut vello_cpu::RenderContext,
        scale: f64,
        element: &CompositedElement,
        image: &ImagePaint,
        live_sources: &mut HashSet<u64>,
    ) {
        let rect = element.local_rect();
        if let Some(source) = &image.source {
            live_sources.insert(source.id());
            match self.image_tile(source, image, element.size, scale) {
                Ok((tile, tile_size)) => {
                    // Tile pixels back to box-local units. The tile is already
                    // clipped to the corners, so the whole box is filled.
                    let to_local = Affine::scale_non_uniform(
                        element.size.width / tile_size.width,
                        element.size.height / tile_size.height,
                    );
                    rcx.set_paint(tile);
                    rcx.set_paint_transform(affine_to_cpu(to_local));
                    rcx.fill_rect(&rect_to_cpu(rect));
                    rcx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                }
                Err(err) => log::warn!("image {} rendered empty: {err}", element.id),
            }
        }

        if let Some(border) = image.border {
            rcx.set_paint(cpu_color(border.color));
            rcx.set_stroke(vello_cpu::kurbo::Stroke::new(border.width));
            rcx.stroke_path(&bezpath_to_cpu(
                &image.corners.inset_path(rect, border.width / 2.0),
            ));
        }
    }

    /// Render the cover-fitted source into a box-sized tile at device
    /// resolution, clipped to the corner outline, then run the filter over it.
    /// Filtering after the clip lets a blur soften the rounded edge.
    fn image_tile(
        &mut self,
        source: &PixelSource,
        image: &ImagePaint,
        box_size: Size,
        scale: f64,
    ) -> RenderResult<(vello_cpu::Image, Size)> {
        let tile_w = tile_edge(box_size.width * scale)?;
        let tile_h = tile_edge(box_size.height * scale)?;
        let source_pixmap = self.source_pixmap(source)?;

        let box_to_tile = Affine::scale_non_uniform(
            f64::from(tile_w) / box_size.width,
            f64::from(tile_h) / box_size.height,
        );
        let mut tile_cx = vello_cpu::RenderContext::new(tile_w, tile_h);
        tile_cx.set_transform(affine_to_cpu(box_to_tile));
        tile_cx.set_paint(cpu_image(source_pixmap));
        tile_cx.set_paint_transform(affine_to_cpu(image.cover));
        tile_cx.fill_path(&bezpath_to_cpu(&image.corners.path(box_size.to_rect())));
        tile_cx.flush();

        let mut tile = vello_cpu::Pixmap::new(tile_w, tile_h);
        tile_cx.render_to_pixmap(&mut tile);
        apply_filter(
            image.filter,
            tile.data_as_u8_slice_mut(),
            u32::from(tile_w),
            u32::from(tile_h),
            scale,
        );

        Ok((
            cpu_image(Arc::new(tile)),
            Size::new(f64::from(tile_w), f64::from(tile_h)),
        ))
    }

    fn source_pixmap(&mut self, source: &PixelSource) -> RenderResult<Arc<vello_cpu::Pixmap>> {
        if let Some(pixmap) = self.sources.get(&source.id()) {
            return Ok(pixmap.clone());
        }
        let pixmap = Arc::new(pixmap_from_premul_bytes(
            source.premul_bytes(),
            source.width(),
            source.height(),
        )?);
        self.sources.insert(source.id(), pixmap.clone());
        Ok(pixmap)
    }
}

impl Renderer for CpuRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Frame> {
        let (width, height) = ctx.surface_size()?;
        let view = Affine::scale(ctx.scale);
        let mut rcx = vello_cpu::RenderContext::new(width, height);

        let bg = self.background_color(ctx).to_rgba8();
        rcx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        rcx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        rcx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        let elements = compose(ctx.canvas);
        let mut live_sources = HashSet::new();
        for element in &elements {
            self.draw_element(&mut rcx, view, ctx.scale, element, &mut live_sources);
        }
        self.sources.retain(|id, _| live_sources.contains(id));

        if ctx.show_selection {
            if let Some(selected) = ctx.canvas.selected().and_then(compose_element) {
                let c = ctx.selection_color.to_rgba8();
                rcx.set_transform(affine_to_cpu(view * selected.transform));
                rcx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
                rcx.set_stroke(vello_cpu::kurbo::Stroke::new(
                    SELECTION_STROKE_WIDTH / ctx.scale,
                ));
                rcx.stroke_path(&bezpath_to_cpu(&selected.local_rect().to_path(0.1)));
            }
        }

        rcx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        rcx.render_to_pixmap(&mut pixmap);
        log::trace!("rendered {} elements at {width}x{height}", elements.len());

        Ok(Frame {
            width: u32::from(width),
            height: u32::from(height),
            data: pixmap.data_as_u8_slice().to_vec(),
        })
    }
}

fn draw_shape(rcx: &mut vello_cpu::RenderContext, element: &CompositedElement, shape: &ShapePaint) {
    rcx.set_paint(cpu_color(shape.fill));
    rcx.fill_path(&bezpath_to_cpu(&shape.corners.path(element.local_rect())));
}

fn tile_edge(pixels: f64) -> RenderResult<u16> {
    let edge = pixels.ceil().max(1.0);
    if !edge.is_finite() || edge > f64::from(u16::MAX) {
        return Err(RendererError::RenderFailed(format!(
            "image tile edge {pixels} out of range"
        )));
    }
    Ok(edge as u16)
}

fn cpu_color(c: HexColor) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn cpu_image(pixmap: Arc<vello_cpu::Pixmap>) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(pixmap),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: kurbo::Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let point = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point(p)),
            PathEl::LineTo(p) => out.line_to(point(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point(p1), point(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(point(p1), point(p2), point(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> RenderResult<vello_cpu::Pixmap> {
    let too_large = || RendererError::SurfaceTooLarge {
        width: f64::from(width),
        height: f64::from(height),
    };
    let w: u16 = width.try_into().map_err(|_| too_large())?;
    let h: u16 = height.try_into().map_err(|_| too_large())?;
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardsmith_core::{
        CanvasState, Element, ElementKind, ImageFilter, ImageProps, ShapeProps, TextProps,
    };
    use kurbo::Rect;

    fn render(canvas: &CanvasState) -> Frame {
        CpuRenderer::new()
            .render(&RenderContext::new(canvas))
            .unwrap()
    }

    fn shape(id: &str, bounds: Rect, color: HexColor, z: u32) -> Element {
        Element::new(
            id,
            ElementKind::Shape(ShapeProps::default().with_background(color)),
            bounds,
            z,
        )
    }

    fn near(actual: [u8; 4], expected: [u8; 4]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(&a, e)| (i16::from(a) - i16::from(e)).abs() <= 2)
    }

    /// 4x2 source: left half red, right half blue.
    fn split_source() -> PixelSource {
        let mut rgba = Vec::new();
        for _ in 0..2 {
            for x in 0..4 {
                rgba.extend_from_slice(if x < 2 {
                    &[255, 0, 0, 255]
                } else {
                    &[0, 0, 255, 255]
                });
            }
        }
        PixelSource::from_rgba8(4, 2, &rgba).unwrap()
    }

    fn image_element(props: ImageProps) -> Element {
        Element::new(
            "img",
            ElementKind::Image(props),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            1,
        )
    }

    #[test]
    fn test_empty_canvas_is_white() {
        let frame = render(&CanvasState::new(40.0, 30.0));
        assert_eq!((frame.width, frame.height), (40, 30));
        assert!(frame.data.iter().all(|&b| b == 255));
    }

    #[test]
    fn test_opacity_over_white() {
        let mut canvas = CanvasState::new(800.0, 600.0);
        canvas.replace_all(vec![
            shape(
                "s",
                Rect::new(100.0, 100.0, 300.0, 300.0),
                HexColor::rgb(0x3b, 0x82, 0xf6),
                1,
            )
            .with_opacity(0.5),
        ]);
        let px = render(&canvas).pixel(200, 200).unwrap();
        assert!(near(px, [157, 192, 250, 255]), "{px:?}");
    }

    #[test]
    fn test_z_order_decides_overlap() {
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![
            shape("top", Rect::new(0.0, 0.0, 100.0, 100.0), HexColor::rgb(255, 0, 0), 2),
            shape("under", Rect::new(0.0, 0.0, 100.0, 100.0), HexColor::rgb(0, 255, 0), 1),
        ]);
        assert_eq!(render(&canvas).pixel(50, 50), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_rotation_about_center() {
        let mut canvas = CanvasState::new(800.0, 600.0);
        canvas.replace_all(vec![
            shape(
                "bar",
                Rect::new(300.0, 290.0, 500.0, 310.0),
                HexColor::black(),
                1,
            )
            .with_rotation(90.0),
        ]);
        let frame = render(&canvas);
        assert_eq!(frame.pixel(400, 220), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(320, 300), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_circle_corners_stay_clear() {
        let mut canvas = CanvasState::new(100.0, 100.0);
        let mut circle = shape("c", Rect::new(0.0, 0.0, 100.0, 100.0), HexColor::black(), 1);
        if let ElementKind::Shape(props) = &mut circle.kind {
            props.border_radius = 50.0;
        }
        canvas.replace_all(vec![circle]);
        let frame = render(&canvas);
        assert_eq!(frame.pixel(3, 3), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(50, 50), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_image_cover_fit() {
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![image_element(ImageProps::new(Some(split_source())))]);
        let frame = render(&canvas);
        assert!(near(frame.pixel(10, 50).unwrap(), [255, 0, 0, 255]));
        assert!(near(frame.pixel(90, 50).unwrap(), [0, 0, 255, 255]));
    }

    #[test]
    fn test_image_styling_parity() {
        let mut props = ImageProps::new(Some(split_source()));
        props.filter = ImageFilter::Grayscale;
        props.border_radius = 50.0;
        props.border_width = 4.0;
        props.border_color = HexColor::rgb(0, 128, 0);
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![image_element(props)]);
        let frame = render(&canvas);

        // Clipped corner.
        assert_eq!(frame.pixel(2, 2), Some([255, 255, 255, 255]));
        // Gray interior.
        let [r, g, b, _] = frame.pixel(30, 50).unwrap();
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{r} {g} {b}");
        // Border ring at the left edge of the circle.
        assert!(near(frame.pixel(1, 50).unwrap(), [0, 128, 0, 255]));
    }

    #[test]
    fn test_blur_softens_rounded_edge() {
        let black = PixelSource::from_rgba8(2, 2, &[0, 0, 0, 255].repeat(4)).unwrap();
        let round = |filter| {
            let mut props = ImageProps::new(Some(black.clone()));
            props.border_radius = 50.0;
            props.filter = filter;
            let mut canvas = CanvasState::new(100.0, 100.0);
            canvas.replace_all(vec![image_element(props)]);
            render(&canvas)
        };

        // About 3px outside the circle on the diagonal.
        let sharp = round(ImageFilter::None);
        assert_eq!(sharp.pixel(12, 12), Some([255, 255, 255, 255]));
        let soft = round(ImageFilter::Blur(4.0));
        let [r, g, b, _] = soft.pixel(12, 12).unwrap();
        assert!(r < 240 && r == g && g == b, "{r} {g} {b}");
        // The center stays solid.
        assert!(near(soft.pixel(50, 50).unwrap(), [0, 0, 0, 255]));
    }

    #[test]
    fn test_image_without_source_renders_empty() {
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![image_element(ImageProps::default())]);
        assert!(render(&canvas).data.iter().all(|&b| b == 255));
    }

    #[test]
    fn test_text_background_fills_box() {
        let mut props = TextProps::new("");
        props.background_color = Some(HexColor::rgb(255, 255, 0));
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![Element::new(
            "t",
            ElementKind::Text(props),
            Rect::new(10.0, 10.0, 90.0, 40.0),
            1,
        )]);
        let frame = render(&canvas);
        assert_eq!(frame.pixel(50, 25), Some([255, 255, 0, 255]));
        assert_eq!(frame.pixel(50, 60), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut canvas = CanvasState::new(200.0, 150.0);
        let mut image = image_element(ImageProps::new(Some(split_source())));
        image.rotation_degrees = 30.0;
        if let ElementKind::Image(props) = &mut image.kind {
            props.filter = ImageFilter::Blur(2.0);
        }
        canvas.replace_all(vec![
            image,
            shape("s", Rect::new(50.0, 20.0, 150.0, 80.0), HexColor::rgb(10, 20, 30), 2)
                .with_opacity(0.3)
                .with_rotation(-45.0),
            Element::new(
                "t",
                ElementKind::Text(TextProps::new("Em memória")),
                Rect::new(0.0, 100.0, 200.0, 140.0),
                3,
            ),
        ]);

        let mut renderer = CpuRenderer::new();
        let first = renderer.render(&RenderContext::new(&canvas)).unwrap();
        let second = renderer.render(&RenderContext::new(&canvas)).unwrap();
        let fresh = render(&canvas);
        assert!(first == second);
        assert!(first == fresh);
    }

    #[test]
    fn test_selection_outline_only_when_requested() {
        let mut canvas = CanvasState::new(100.0, 100.0);
        canvas.replace_all(vec![shape(
            "s",
            Rect::new(20.0, 20.0, 80.0, 80.0),
            HexColor::white(),
            1,
        )]);
        canvas.select_element(&"s".into());

        let plain = render(&canvas);
        assert_eq!(plain.pixel(20, 50), Some([255, 255, 255, 255]));

        let chrome = CpuRenderer::new()
            .render(&RenderContext::new(&canvas).with_selection(true))
            .unwrap();
        assert_ne!(chrome.pixel(20, 50), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_register_font_rejects_garbage() {
        let mut renderer = CpuRenderer::new();
        assert!(renderer.register_font(b"not a font".to_vec()).is_err());
    }
}
