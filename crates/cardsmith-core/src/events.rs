//! Change notifications emitted by the canvas store.

use crate::elements::ElementId;
use std::fmt;

/// A completed state transition on a [`CanvasState`](crate::CanvasState).
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    ElementAdded(ElementId),
    ElementUpdated(ElementId),
    ElementRemoved(ElementId),
    SelectionChanged(Option<ElementId>),
    /// The whole collection was swapped (template load).
    SceneReplaced,
    /// The collection was emptied (reset).
    SceneCleared,
    ZoomChanged(f64),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&CanvasEvent)>;

/// Registered listeners, invoked synchronously in subscription order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: CanvasEvent) {
        log::trace!("canvas event: {event:?}");
        for (_, listener) in &mut self.entries {
            listener(&event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
