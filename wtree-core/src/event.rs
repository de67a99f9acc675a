//! Immutable input/game events and their kind hierarchy.
//!
//! Every [`Event`] has exactly one concrete [`EventKind`].  Kinds form a
//! static fallback table (`KeyPress -> Key -> Input -> Event`) that processor
//! lookup walks when no handler is registered for the exact kind.
//!
//! Events travel through the tree as [`EventRef`] (`Arc<Event>`).  Two
//! events are "the same" only when they are the same allocation, which is
//! how a processor signals "not handled, keep propagating".

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared handle to an immutable event.
pub type EventRef = Arc<Event>;

bitflags::bitflags! {
    /// Keyboard modifier state at the time of a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CTRL  = 0b0000_0010;
        const ALT   = 0b0000_0100;
        const META  = 0b0000_1000;
    }
}

/// Key codes used by the stock widgets.
pub mod keys {
    pub const BACKSPACE: u32 = 8;
    pub const TAB: u32 = 9;
    pub const ENTER: u32 = 13;
    pub const ESCAPE: u32 = 27;
    pub const END: u32 = 35;
    pub const HOME: u32 = 36;
    pub const LEFT: u32 = 37;
    pub const RIGHT: u32 = 39;
    pub const DELETE: u32 = 46;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// One input or game occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    KeyPress {
        key: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyRelease {
        key: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Char {
        ch: char,
    },
    MouseMove {
        x: f32,
        y: f32,
    },
    MouseButton {
        x: f32,
        y: f32,
        button: MouseButton,
        pressed: bool,
    },
    MouseScroll {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
    },
    GamepadButton {
        pad: u32,
        button: u32,
        pressed: bool,
    },
    GamepadAxis {
        pad: u32,
        axis: u32,
        value: f32,
    },
    Resize {
        width: f32,
        height: f32,
    },
    Focus {
        focused: bool,
    },
    ResourceLoaded {
        name: String,
    },
    ResourceFailed {
        name: String,
        reason: String,
    },
    AudioFinished {
        clip: String,
    },
    /// Application-defined event, dispatched under [`EventKind::Custom`].
    Custom {
        tag: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl Event {
    /// Custom event with a null payload.
    pub fn custom(tag: impl Into<String>) -> Self {
        Event::Custom {
            tag: tag.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Wrap into a shared [`EventRef`].
    pub fn shared(self) -> EventRef {
        Arc::new(self)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::KeyPress { .. } => EventKind::KeyPress,
            Event::KeyRelease { .. } => EventKind::KeyRelease,
            Event::Char { .. } => EventKind::Char,
            Event::MouseMove { .. } => EventKind::MouseMove,
            Event::MouseButton { .. } => EventKind::MouseButton,
            Event::MouseScroll { .. } => EventKind::MouseScroll,
            Event::GamepadButton { .. } => EventKind::GamepadButton,
            Event::GamepadAxis { .. } => EventKind::GamepadAxis,
            Event::Resize { .. } => EventKind::Resize,
            Event::Focus { .. } => EventKind::Focus,
            Event::ResourceLoaded { .. } => EventKind::ResourceLoaded,
            Event::ResourceFailed { .. } => EventKind::ResourceFailed,
            Event::AudioFinished { .. } => EventKind::AudioFinished,
            Event::Custom { tag, .. } => EventKind::Custom(tag.clone()),
        }
    }

    /// Pointer position carried by mouse events.
    pub fn pointer(&self) -> Option<(f32, f32)> {
        match *self {
            Event::MouseMove { x, y }
            | Event::MouseButton { x, y, .. }
            | Event::MouseScroll { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }
}

/// Processor lookup key.
///
/// Abstract kinds (`Event`, `Input`, `Key`, ...) never appear on a concrete
/// event; they exist so a handler can cover a whole family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Event,
    Input,
    Key,
    KeyPress,
    KeyRelease,
    Char,
    Mouse,
    MouseMove,
    MouseButton,
    MouseScroll,
    Gamepad,
    GamepadButton,
    GamepadAxis,
    Window,
    Resize,
    Focus,
    Resource,
    ResourceLoaded,
    ResourceFailed,
    AudioFinished,
    Custom(String),
}

impl EventKind {
    pub fn custom(tag: impl Into<String>) -> Self {
        EventKind::Custom(tag.into())
    }

    /// The kind this one falls back to, `None` only for the [`EventKind::Event`] base.
    pub fn parent(&self) -> Option<EventKind> {
        let parent = match self {
            Self::Event => return None,
            Self::Input | Self::Window | Self::Resource | Self::AudioFinished | Self::Custom(_) => {
                Self::Event
            }
            Self::Key | Self::Char | Self::Mouse | Self::Gamepad => Self::Input,
            Self::KeyPress | Self::KeyRelease => Self::Key,
            Self::MouseMove | Self::MouseButton | Self::MouseScroll => Self::Mouse,
            Self::GamepadButton | Self::GamepadAxis => Self::Gamepad,
            Self::Resize | Self::Focus => Self::Window,
            Self::ResourceLoaded | Self::ResourceFailed => Self::Resource,
        };
        Some(parent)
    }

    /// This kind followed by every ancestor, ending with [`EventKind::Event`].
    pub fn ancestry(&self) -> Ancestry {
        Ancestry {
            next: Some(self.clone()),
        }
    }
}

/// Iterator returned by [`EventKind::ancestry`].
#[derive(Debug, Clone)]
pub struct Ancestry {
    next: Option<EventKind>,
}

impl Iterator for Ancestry {
    type Item = EventKind;

    fn next(&mut self) -> Option<EventKind> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_ends_at_base() {
        let chain: Vec<_> = EventKind::KeyPress.ancestry().collect();
        assert_eq!(
            chain,
            vec![
                EventKind::KeyPress,
                EventKind::Key,
                EventKind::Input,
                EventKind::Event
            ]
        );
        assert_eq!(EventKind::Event.ancestry().count(), 1);
    }

    #[test]
    fn test_custom_kind_falls_back_to_base() {
        let chain: Vec<_> = EventKind::custom("ping").ancestry().collect();
        assert_eq!(chain, vec![EventKind::custom("ping"), EventKind::Event]);
    }

    #[test]
    fn test_event_kind_matches_variant() {
        assert_eq!(Event::Char { ch: 'a' }.kind(), EventKind::Char);
        assert_eq!(Event::custom("pong").kind(), EventKind::custom("pong"));
    }

    #[test]
    fn test_event_json_shape() {
        let ev: Event =
            serde_json::from_str(r#"{"type":"mouse_button","x":4,"y":2,"button":"left","pressed":true}"#)
                .unwrap();
        assert_eq!(ev.pointer(), Some((4.0, 2.0)));
        let json = serde_json::to_string(&Event::custom("ping")).unwrap();
        assert!(json.contains("\"type\":\"custom\""));
        assert!(json.contains("\"tag\":\"ping\""));
    }

    #[test]
    fn test_identity_is_allocation() {
        let a = Event::custom("ping").shared();
        let b = Event::custom("ping").shared();
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &a.clone()));
    }
}
