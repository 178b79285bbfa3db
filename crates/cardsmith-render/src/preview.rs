//! Live preview: re-renders the canvas at display zoom whenever it changes.

use crate::cpu::CpuRenderer;
use crate::renderer::{Frame, RenderContext, RenderResult, Renderer, RendererError};
use cardsmith_core::{CanvasState, SubscriptionId};
use peniko::Color;
use std::cell::Cell;
use std::rc::Rc;

/// Keeps an up-to-date preview frame for one canvas.
///
/// Attaching subscribes a listener that marks the preview dirty on every
/// canvas event; [`refresh`](Self::refresh) renders only when dirty.
pub struct LivePreview<R: Renderer = CpuRenderer> {
    renderer: R,
    dirty: Rc<Cell<bool>>,
    subscription: Option<SubscriptionId>,
    frame: Option<Frame>,
    selection_color: Color,
}

impl LivePreview<CpuRenderer> {
    /// Attach a CPU-backed preview to `canvas`.
    pub fn attach(canvas: &mut CanvasState) -> Self {
        Self::with_renderer(canvas, CpuRenderer::new())
    }
}

impl<R: Renderer> LivePreview<R> {
    /// Attach a preview drawing with `renderer`.
    pub fn with_renderer(canvas: &mut CanvasState, renderer: R) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = dirty.clone();
        let subscription = canvas.subscribe(move |_| flag.set(true));
        Self {
            renderer,
            dirty,
            subscription: Some(subscription),
            frame: None,
            selection_color: Color::from_rgba8(59, 130, 246, 255),
        }
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Stop following `canvas`. The last frame stays available.
    pub fn detach(&mut self, canvas: &mut CanvasState) {
        if let Some(id) = self.subscription.take() {
            canvas.unsubscribe(id);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Force the next refresh to render (e.g. after registering fonts).
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The most recent frame, if any.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Render at the canvas zoom with the selection outlined, if anything
    /// changed since the last refresh. Returns the current frame.
    pub fn refresh(&mut self, canvas: &CanvasState) -> RenderResult<&Frame> {
        if self.dirty.get() || self.frame.is_none() {
            let ctx = RenderContext::new(canvas)
                .with_scale(canvas.zoom())
                .with_selection(true)
                .with_selection_color(self.selection_color);
            self.frame = Some(self.renderer.render(&ctx)?);
            self.dirty.set(false);
            log::debug!("preview refreshed at zoom {}", canvas.zoom());
        }
        self.frame
            .as_ref()
            .ok_or_else(|| RendererError::RenderFailed("no preview frame".into()))
    }
}
