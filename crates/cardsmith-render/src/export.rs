//! Export: flatten the canvas into one PNG and hand it to an output port.

use crate::cpu::CpuRenderer;
use crate::renderer::{Frame, RenderContext, RenderResult, Renderer};
use cardsmith_core::CanvasState;
use peniko::Color;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Filename prefix of exported cards.
pub const EXPORT_FILE_PREFIX: &str = "cartao-condolencias";

/// Export settings.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Surface fill behind the elements.
    pub background: Color,
    /// Milliseconds since the Unix epoch used in the filename; the current
    /// time when `None`.
    pub timestamp_ms: Option<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            timestamp_ms: None,
        }
    }
}

impl ExportOptions {
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// Rasterize the canvas at 1:1 over white, without selection chrome.
///
/// A pure function of the canvas: unchanged state gives identical pixels.
pub fn rasterize(canvas: &CanvasState) -> RenderResult<Frame> {
    CpuRenderer::new().render(&RenderContext::new(canvas))
}

/// Encode a frame as an 8-bit RGBA PNG.
pub fn encode_png(frame: &Frame) -> RenderResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&frame.to_straight_rgba8())?;
        writer.finish()?;
    }
    Ok(png_data)
}

/// `cartao-condolencias-<timestamp_ms>.png`
pub fn export_filename(timestamp_ms: u64) -> String {
    format!("{EXPORT_FILE_PREFIX}-{timestamp_ms}.png")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Where encoded exports go. Delivery is the host's concern.
pub trait ExportSink {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> RenderResult<()>;
}

/// Keeps every export in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub exports: Vec<(String, Vec<u8>)>,
}

impl ExportSink for MemorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> RenderResult<()> {
        self.exports.push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Writes exports as files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path a delivered file lands at.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str) -> RenderResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(filename);
        std::fs::write(&path, bytes)?;
        log::info!("PNG export complete: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Rasterize, encode and deliver in one step.
#[derive(Default)]
pub struct Exporter {
    renderer: CpuRenderer,
    options: ExportOptions,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// The backend, e.g. to register fonts before exporting.
    pub fn renderer_mut(&mut self) -> &mut CpuRenderer {
        &mut self.renderer
    }

    /// Rasterize and encode without delivering.
    pub fn encode(&mut self, canvas: &CanvasState) -> RenderResult<Vec<u8>> {
        let ctx = RenderContext::new(canvas).with_background(self.options.background);
        let frame = self.renderer.render(&ctx)?;
        encode_png(&frame)
    }

    /// Export the canvas into `sink`, returning the filename used.
    pub fn export(&mut self, canvas: &CanvasState, sink: &mut dyn ExportSink) -> RenderResult<String> {
        let bytes = self.encode(canvas)?;
        let filename = export_filename(self.options.timestamp_ms.unwrap_or_else(now_ms));
        sink.deliver(&bytes, &filename)?;
        Ok(filename)
    }
}
