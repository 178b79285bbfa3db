//! Renderer trait abstraction.

use cardsmith_core::{CanvasError, CanvasState};
use peniko::Color;
use thiserror::Error;

/// Largest surface edge a backend accepts, in device pixels.
pub const MAX_SURFACE_EDGE: u32 = u16::MAX as u32;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Surface too large: {width}x{height} (max edge {MAX_SURFACE_EDGE})")]
    SurfaceTooLarge { width: f64, height: f64 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Export delivery failed: {0}")]
    Delivery(#[from] std::io::Error),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a CanvasState,
    /// Device pixels per canvas pixel (the display zoom for the live preview).
    pub scale: f64,
    /// Surface fill behind every element.
    pub background: Color,
    /// Whether to outline the selected element.
    pub show_selection: bool,
    /// Selection outline color.
    pub selection_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context: scale 1, white background, no selection chrome.
    pub fn new(canvas: &'a CanvasState) -> Self {
        Self {
            canvas,
            scale: 1.0,
            background: Color::WHITE,
            show_selection: false,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
        }
    }

    /// Set the device scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Toggle the selection outline.
    pub fn with_selection(mut self, show: bool) -> Self {
        self.show_selection = show;
        self
    }

    /// Set the selection outline color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Surface size in device pixels, or an error if it cannot be allocated.
    pub fn surface_size(&self) -> RenderResult<(u16, u16)> {
        let width = (self.canvas.width() * self.scale).ceil();
        let height = (self.canvas.height() * self.scale).ceil();
        let edge_ok = |v: f64| v.is_finite() && v >= 1.0 && v <= f64::from(MAX_SURFACE_EDGE);
        if !edge_ok(width) || !edge_ok(height) {
            return Err(RendererError::SurfaceTooLarge { width, height });
        }
        Ok((width as u16, height as u16))
    }
}

/// A rendered surface: premultiplied RGBA8, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Premultiplied `[r, g, b, a]` at a pixel, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) as usize) * 4;
        self.data
            .get(i..i + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// Straight (un-premultiplied) RGBA8 copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Rasterize the canvas described by `ctx` into a new frame.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Frame>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background
    }
}
