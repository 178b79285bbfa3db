//! Canvas state: the single source of truth for the card being edited.

use crate::editor::ElementPatch;
use crate::elements::{Element, ElementId, NewElement};
use crate::error::{CanvasError, CanvasResult};
use crate::events::{CanvasEvent, Listeners, SubscriptionId};
use kurbo::{Point, Size};
use std::collections::HashSet;

/// Default canvas width in pixels.
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
/// Default canvas height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;
/// Smallest display zoom.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest display zoom.
pub const MAX_ZOOM: f64 = 10.0;

/// Scene graph store for one editing session.
///
/// Owns the elements (in insertion order), the current selection, the fixed
/// canvas size and the display zoom. Every mutation is a synchronous, atomic
/// transition followed by [`CanvasEvent`] notifications.
#[derive(Debug)]
pub struct CanvasState {
    elements: Vec<Element>,
    selected: Option<ElementId>,
    width: f64,
    height: f64,
    zoom: f64,
    listeners: Listeners,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl CanvasState {
    /// Create an empty canvas of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            elements: Vec::new(),
            selected: None,
            width,
            height,
            zoom: 1.0,
            listeners: Listeners::default(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Display zoom; never affects stored geometry.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the display zoom, clamped to `MIN_ZOOM..=MAX_ZOOM`.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            log::debug!("ignoring non-finite zoom {zoom}");
            return;
        }
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        self.zoom = zoom;
        self.listeners.emit(CanvasEvent::ZoomChanged(zoom));
    }

    /// Convert a point on the zoomed display into canvas pixels.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(screen.x / self.zoom, screen.y / self.zoom)
    }

    /// Register a listener called after every state transition.
    pub fn subscribe(&mut self, listener: impl FnMut(&CanvasEvent) + 'static) -> SubscriptionId {
        self.listeners.add(Box::new(listener))
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Elements in insertion order (not paint order).
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Elements in paint order: ascending `z_index`, insertion order on ties.
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by_key(|el| el.z_index);
        ordered
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|el| &el.id == id)
    }

    /// Like [`get`](Self::get) but reports a missing element as an error.
    pub fn try_get(&self, id: &ElementId) -> CanvasResult<&Element> {
        self.get(id)
            .ok_or_else(|| CanvasError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|el| &el.id == id)
    }

    pub fn selected_id(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Element> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// The z-index the next created element receives.
    pub fn next_z_index(&self) -> u32 {
        self.elements
            .iter()
            .map(|el| el.z_index)
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// Append a new element with its variant defaults and select it.
    pub fn add_element(&mut self, new: NewElement) -> ElementId {
        let id = ElementId::generate();
        let bounds = new.default_bounds();
        let element = Element::new(id.clone(), new.default_kind(), bounds, self.next_z_index());
        log::debug!(
            "adding {} element {id} at z {}",
            element.kind.name(),
            element.z_index
        );

        self.elements.push(element);
        self.selected = Some(id.clone());
        self.listeners.emit(CanvasEvent::ElementAdded(id.clone()));
        self.listeners
            .emit(CanvasEvent::SelectionChanged(Some(id.clone())));
        id
    }

    /// Select an element. Unknown ids are ignored; returns whether the id exists.
    pub fn select_element(&mut self, id: &ElementId) -> bool {
        if self.get(id).is_none() {
            log::debug!("ignoring selection of unknown element {id}");
            return false;
        }
        if self.selected.as_ref() != Some(id) {
            self.selected = Some(id.clone());
            self.listeners
                .emit(CanvasEvent::SelectionChanged(Some(id.clone())));
        }
        true
    }

    /// Clear the selection (background click).
    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.listeners.emit(CanvasEvent::SelectionChanged(None));
        }
    }

    /// Apply a partial patch to the selected element; the editor never
    /// addresses any other element. Returns whether anything changed.
    pub fn update_selected(&mut self, patch: &ElementPatch) -> bool {
        let Some(id) = self.selected.clone() else {
            log::debug!("update ignored: nothing selected");
            return false;
        };
        let Some(element) = self.get_mut(&id) else {
            return false;
        };
        let changed = patch.apply_to(element);
        if changed {
            self.listeners.emit(CanvasEvent::ElementUpdated(id));
        }
        changed
    }

    /// Move an element's top-left corner. Used by the drag controller.
    pub(crate) fn set_position(&mut self, id: &ElementId, position: Point) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        if element.x == position.x && element.y == position.y {
            return true;
        }
        element.x = position.x;
        element.y = position.y;
        self.listeners.emit(CanvasEvent::ElementUpdated(id.clone()));
        true
    }

    /// Remove the selected element and clear the selection in one step.
    pub fn delete_selected(&mut self) -> Option<Element> {
        let id = self.selected.take()?;
        let index = self.elements.iter().position(|el| el.id == id)?;
        let removed = self.elements.remove(index);
        log::debug!("deleted element {id}");
        self.listeners.emit(CanvasEvent::ElementRemoved(id));
        self.listeners.emit(CanvasEvent::SelectionChanged(None));
        Some(removed)
    }

    /// Atomically swap the whole collection and clear the selection.
    ///
    /// Later elements reusing an id already present in `elements` are dropped.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(elements.len());
        for element in elements {
            if seen.insert(element.id.clone()) {
                unique.push(element);
            } else {
                log::warn!("dropping element with duplicate id {}", element.id);
            }
        }

        log::debug!("replacing scene with {} elements", unique.len());
        self.elements = unique;
        let had_selection = self.selected.take().is_some();
        self.listeners.emit(CanvasEvent::SceneReplaced);
        if had_selection {
            self.listeners.emit(CanvasEvent::SelectionChanged(None));
        }
    }

    /// Replace the scene with a template's elements.
    pub fn load_template(&mut self, template: Vec<Element>) {
        self.replace_all(template);
    }

    /// Empty the canvas (reset).
    pub fn clear_all(&mut self) {
        self.elements.clear();
        let had_selection = self.selected.take().is_some();
        self.listeners.emit(CanvasEvent::SceneCleared);
        if had_selection {
            self.listeners.emit(CanvasEvent::SelectionChanged(None));
        }
    }

    /// Topmost element whose rotated box contains a canvas point.
    pub fn element_at(&self, point: Point) -> Option<&ElementId> {
        self.paint_order()
            .into_iter()
            .rev()
            .find(|el| el.contains(point))
            .map(|el| &el.id)
    }
}
