//! Host input events for the canvas surface.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in client coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        pressure: f64,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
        pressure: f64,
        /// Whether the primary button is held.
        primary_down: bool,
    },
    /// The pointer left the canvas.
    Leave,
    Scroll {
        delta: Vec2,
    },
}

/// Keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key name as reported by the host, e.g. `"Backspace"` or `"z"`.
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Keyboard shortcuts the canvas reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shortcut {
    DeleteSelection,
    Undo,
    Redo,
}

impl Shortcut {
    /// Map a key press to a shortcut.
    pub fn from_key(event: &KeyEvent) -> Option<Self> {
        match event.key.as_str() {
            "Backspace" | "Delete" => Some(Shortcut::DeleteSelection),
            "z" | "Z" if event.modifiers.command() => {
                if event.modifiers.shift {
                    Some(Shortcut::Redo)
                } else {
                    Some(Shortcut::Undo)
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: &str, ctrl: bool, meta: bool, shift: bool) -> KeyEvent {
        KeyEvent::new(
            key,
            Modifiers {
                shift,
                ctrl,
                alt: false,
                meta,
            },
        )
    }

    #[test]
    fn test_delete_shortcut() {
        assert_eq!(
            Shortcut::from_key(&key("Backspace", false, false, false)),
            Some(Shortcut::DeleteSelection)
        );
        assert_eq!(
            Shortcut::from_key(&key("Delete", false, false, false)),
            Some(Shortcut::DeleteSelection)
        );
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        assert_eq!(Shortcut::from_key(&key("z", true, false, false)), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key(&key("z", false, true, false)), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key(&key("Z", true, false, true)), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key(&key("z", false, false, false)), None);
    }

    #[test]
    fn test_unrelated_keys() {
        assert_eq!(Shortcut::from_key(&key("a", true, false, false)), None);
        assert_eq!(Shortcut::from_key(&key("Escape", false, false, false)), None);
    }
}
