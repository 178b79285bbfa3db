//! Drag interaction: turns pointer deltas into clamped position updates.

use crate::canvas::CanvasState;
use crate::elements::ElementId;
use crate::input::{KeyEvent, MouseButton, PointerEvent};
use kurbo::{Point, Vec2};

/// An in-progress drag of a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// The element being moved.
    pub element_id: ElementId,
    /// Pointer position at drag start, in canvas coordinates.
    pub pointer_start: Point,
    /// Element top-left at drag start.
    pub element_start: Point,
}

impl DragSession {
    /// Pointer travel since the drag started.
    pub fn delta(&self, pointer: Point) -> Vec2 {
        pointer - self.pointer_start
    }
}

/// Controller state: `Idle -> Dragging -> Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Clamp a top-left position so the box stays on the canvas.
///
/// When the box is larger than the canvas on an axis, that axis is pinned to 0.
pub fn clamp_position(position: Point, size: kurbo::Size, canvas: kurbo::Size) -> Point {
    let max_x = (canvas.width - size.width).max(0.0);
    let max_y = (canvas.height - size.height).max(0.0);
    Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
}

/// Pointer-driven drag state machine over a [`CanvasState`].
///
/// Pointer positions are given in screen coordinates and converted to canvas
/// coordinates with the canvas zoom. Each event does a constant amount of work.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn dragged_id(&self) -> Option<&ElementId> {
        match &self.state {
            DragState::Dragging(session) => Some(&session.element_id),
            DragState::Idle => None,
        }
    }

    /// Pointer pressed at a screen position: start dragging the topmost element
    /// under it, or clear the selection on a background click.
    /// Returns whether a drag started.
    pub fn pointer_down(&mut self, canvas: &mut CanvasState, screen: Point) -> bool {
        let point = canvas.screen_to_canvas(screen);
        match canvas.element_at(point).cloned() {
            Some(id) => self.begin(canvas, id, point),
            None => {
                self.state = DragState::Idle;
                canvas.clear_selection();
                false
            }
        }
    }

    /// Pointer pressed on a known element's hit region (the host did the hit test).
    pub fn pointer_down_on(&mut self, canvas: &mut CanvasState, id: &ElementId, screen: Point) -> bool {
        let point = canvas.screen_to_canvas(screen);
        self.begin(canvas, id.clone(), point)
    }

    fn begin(&mut self, canvas: &mut CanvasState, id: ElementId, pointer: Point) -> bool {
        let Some(element_start) = canvas.get(&id).map(|el| el.position()) else {
            log::debug!("pointer down on unknown element {id}");
            return false;
        };
        canvas.select_element(&id);
        log::trace!("drag start {id} at {pointer:?}");
        self.state = DragState::Dragging(DragSession {
            element_id: id,
            pointer_start: pointer,
            element_start,
        });
        true
    }

    /// Pointer moved: reposition the dragged element, clamped to the canvas.
    /// Returns whether an element moved.
    pub fn pointer_move(&mut self, canvas: &mut CanvasState, screen: Point) -> bool {
        let DragState::Dragging(session) = &self.state else {
            return false;
        };
        let pointer = canvas.screen_to_canvas(screen);
        let Some(size) = canvas.get(&session.element_id).map(|el| el.size()) else {
            log::debug!("dragged element {} is gone, ending drag", session.element_id);
            self.state = DragState::Idle;
            return false;
        };
        let target = session.element_start + session.delta(pointer);
        let clamped = clamp_position(target, size, canvas.size());
        canvas.set_position(&session.element_id, clamped)
    }

    /// Pointer released anywhere: the last clamped position stands.
    pub fn pointer_up(&mut self) {
        if let DragState::Dragging(session) = std::mem::take(&mut self.state) {
            log::trace!("drag end {}", session.element_id);
        }
    }

    /// Abort the drag and put the element back where it started.
    pub fn cancel(&mut self, canvas: &mut CanvasState) -> bool {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => {
                log::debug!("drag of {} cancelled", session.element_id);
                canvas.set_position(&session.element_id, session.element_start);
                true
            }
            DragState::Idle => false,
        }
    }

    /// Dispatch a raw pointer event. Only the left button drags.
    pub fn handle_pointer(&mut self, canvas: &mut CanvasState, event: &PointerEvent) {
        match *event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                self.pointer_down(canvas, position);
            }
            PointerEvent::Down { .. } => {}
            PointerEvent::Move { position } => {
                self.pointer_move(canvas, position);
            }
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => self.pointer_up(),
            PointerEvent::Up { .. } => {}
        }
    }

    /// Dispatch a key event: Escape cancels a drag, Delete removes the
    /// selected element while idle.
    pub fn handle_key(&mut self, canvas: &mut CanvasState, event: &KeyEvent) {
        if event.is_cancel() {
            self.cancel(canvas);
        } else if event.is_delete() && !self.is_dragging() {
            canvas.delete_selected();
        }
    }
}
