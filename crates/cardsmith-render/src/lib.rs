//! Cardsmith Render Library
//!
//! Renderer abstraction plus the CPU backend shared by the live preview and
//! the PNG export.

mod assets;
mod cpu;
mod export;
mod filter;
mod preview;
mod renderer;

pub use assets::{decode_or_empty, decode_pixel_source};
pub use cpu::CpuRenderer;
pub use export::{
    DirectorySink, EXPORT_FILE_PREFIX, ExportOptions, ExportSink, Exporter, MemorySink,
    encode_png, export_filename, rasterize,
};
pub use filter::apply_filter;
pub use preview::LivePreview;
pub use renderer::{Frame, MAX_SURFACE_EDGE, RenderContext, RenderResult, Renderer, RendererError};
