//! Pointer and keyboard events delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event in screen (zoomed display) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => *position,
        }
    }
}

/// Keyboard event carrying the key name as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

impl KeyEvent {
    /// Escape press: aborts an in-progress drag.
    pub fn is_cancel(&self) -> bool {
        matches!(self, KeyEvent::Pressed(key) if key == "Escape")
    }

    /// Delete or Backspace press: removes the selected element.
    pub fn is_delete(&self) -> bool {
        matches!(self, KeyEvent::Pressed(key) if key == "Delete" || key == "Backspace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_classification() {
        assert!(KeyEvent::Pressed("Escape".into()).is_cancel());
        assert!(!KeyEvent::Released("Escape".into()).is_cancel());
        assert!(KeyEvent::Pressed("Delete".into()).is_delete());
        assert!(KeyEvent::Pressed("Backspace".into()).is_delete());
        assert!(!KeyEvent::Pressed("a".into()).is_delete());
    }

    #[test]
    fn test_pointer_position() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(PointerEvent::Move { position: p }.position(), p);
        assert_eq!(
            PointerEvent::Down {
                position: p,
                button: MouseButton::Left
            }
            .position(),
            p
        );
    }
}
