//! Cardsmith Core Library
//!
//! Scene graph, interaction and composition rules for the Cardsmith card designer.
//! Rendering backends live in `cardsmith-render`; everything here is pure data and logic.

pub mod canvas;
pub mod compositor;
pub mod editor;
pub mod elements;
pub mod error;
pub mod events;
pub mod input;
pub mod interaction;
pub mod template;

pub use canvas::{CanvasState, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, MAX_ZOOM, MIN_ZOOM};
pub use compositor::{
    Border, CompositedElement, CornerShape, ImagePaint, Paint, ShapePaint, TextPaint, compose,
    compose_element, cover_transform,
};
pub use editor::{ElementPatch, Field, PropertyEditor};
pub use elements::{
    Element, ElementId, ElementKind, HexColor, ImageFilter, ImageProps, NewElement, PixelSource,
    ShapeCorners, ShapeKind, ShapeProps, TextProps,
};
pub use error::{CanvasError, CanvasResult};
pub use events::{CanvasEvent, SubscriptionId};
pub use input::{KeyEvent, MouseButton, PointerEvent};
pub use interaction::{DragController, DragSession, DragState, clamp_position};
