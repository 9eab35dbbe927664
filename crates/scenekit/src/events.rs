//! Input events, abstracted from the host window layer.

use glam::Vec2;

/// A pointer (mouse) button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// A pointer event: position in window pixels (origin top-left), pressed
/// button (if any), and active modifiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: Vec2,
    pub button: Option<PointerButton>,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// A buttonless move event at `pos`.
    #[must_use]
    pub fn moved(pos: Vec2) -> Self {
        Self {
            pos,
            button: None,
            modifiers: Modifiers::default(),
        }
    }

    /// A press or release of `button` at `pos`.
    #[must_use]
    pub fn button(pos: Vec2, button: PointerButton) -> Self {
        Self {
            pos,
            button: Some(button),
            modifiers: Modifiers::default(),
        }
    }

    /// Same event with modifiers attached.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Keys the camera controllers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            pressed: true,
            modifiers: Modifiers::default(),
        }
    }

    #[must_use]
    pub fn released(key: Key) -> Self {
        Self {
            key,
            pressed: false,
            modifiers: Modifiers::default(),
        }
    }
}
