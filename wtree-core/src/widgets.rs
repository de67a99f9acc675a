//! Stock components: panel, label, button, text box.
//!
//! These are ordinary [`Component`] implementations; applications are free
//! to ignore them and register their own kinds with the factory.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::canvas::{Canvas, Color};
use crate::component::{Component, ComponentBase};
use crate::errors::Result;
use crate::event::{keys, Event, EventKind, EventRef, MouseButton};
use crate::factory::{parse_params, ComponentFactory, FromParams};
use crate::geometry::Geometry;
use crate::processor::ProcessorRegistry;

/// Approximate advance used to place the text caret.
const GLYPH_WIDTH: f32 = 8.0;

pub fn register_builtin(factory: &mut ComponentFactory) {
    factory.register_component::<Panel>("panel");
    factory.register_component::<Label>("label");
    factory.register_component::<Button>("button");
    factory.register_component::<TextBox>("text_box");
}

fn same(event: &EventRef) -> Option<EventRef> {
    Some(Arc::clone(event))
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Panel {
    pub background: Color,
    pub border: Option<Color>,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            background: Color::rgb(32, 32, 40),
            border: None,
        }
    }
}

impl FromParams for Panel {
    fn from_params(params: &Value) -> Result<Self> {
        parse_params(params)
    }
}

impl Component for Panel {
    fn kind(&self) -> &str {
        "panel"
    }

    fn draw(&mut self, base: &ComponentBase, canvas: &mut dyn Canvas) -> bool {
        let rect = base.geometry();
        if !rect.is_initialized() {
            return false;
        }
        canvas.fill_rect(rect, self.background);
        if let Some(border) = self.border {
            canvas.stroke_rect(rect, border, 1.0);
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Label {
    pub text: String,
    pub color: Color,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: Color::WHITE,
        }
    }
}

impl FromParams for Label {
    fn from_params(params: &Value) -> Result<Self> {
        parse_params(params)
    }
}

impl Component for Label {
    fn kind(&self) -> &str {
        "label"
    }

    fn draw(&mut self, base: &ComponentBase, canvas: &mut dyn Canvas) -> bool {
        let rect = base.geometry();
        if !rect.is_initialized() {
            return false;
        }
        canvas.draw_text(rect.x, rect.y, &self.text, self.color);
        true
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ButtonParams {
    label: String,
    tag: String,
    color: Color,
}

impl Default for ButtonParams {
    fn default() -> Self {
        Self {
            label: String::new(),
            tag: "button.clicked".into(),
            color: Color::rgb(60, 90, 160),
        }
    }
}

/// Press inside, release inside: emits `Custom { tag }` with the click count.
#[derive(Debug, Clone)]
pub struct Button {
    label: String,
    tag: String,
    color: Color,
    pressed: bool,
    clicks: u64,
}

impl Button {
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
            color: ButtonParams::default().color,
            pressed: false,
            clicks: 0,
        }
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn on_mouse_button(&mut self, base: &ComponentBase, event: &EventRef) -> Option<EventRef> {
        let Event::MouseButton {
            x,
            y,
            button: MouseButton::Left,
            pressed,
        } = **event
        else {
            return same(event);
        };
        if !base.geometry().contains(x, y) {
            if !pressed {
                self.pressed = false;
            }
            return same(event);
        }
        if pressed {
            self.pressed = true;
            return None;
        }
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        self.clicks += 1;
        Some(
            Event::Custom {
                tag: self.tag.clone(),
                payload: json!({ "label": self.label, "clicks": self.clicks }),
            }
            .shared(),
        )
    }
}

impl FromParams for Button {
    fn from_params(params: &Value) -> Result<Self> {
        let p: ButtonParams = parse_params(params)?;
        Ok(Self {
            color: p.color,
            ..Self::new(p.label, p.tag)
        })
    }
}

impl Component for Button {
    fn kind(&self) -> &str {
        "button"
    }

    fn register_processors(registry: &mut ProcessorRegistry<Self>) {
        registry.register(EventKind::MouseButton, Button::on_mouse_button);
    }

    fn draw(&mut self, base: &ComponentBase, canvas: &mut dyn Canvas) -> bool {
        let rect = base.geometry();
        if !rect.is_initialized() {
            return false;
        }
        let fill = if self.pressed {
            Color::rgb(self.color.r / 2, self.color.g / 2, self.color.b / 2)
        } else {
            self.color
        };
        canvas.fill_rect(rect, fill);
        canvas.draw_text(rect.x + 4.0, rect.y + 4.0, &self.label, Color::WHITE);
        true
    }
}

// ---------------------------------------------------------------------------
// TextBox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TextBoxParams {
    text: String,
    placeholder: String,
    max_len: Option<usize>,
}

/// Single-line text input.
///
/// A left click inside focuses it, a click elsewhere blurs it.  While
/// focused it consumes characters and editing keys; Enter is replaced by
/// `Custom { tag: "textbox.submit" }` carrying the text.
#[derive(Debug, Clone, Default)]
pub struct TextBox {
    text: String,
    placeholder: String,
    max_len: Option<usize>,
    cursor: usize,
    focused: bool,
}

impl TextBox {
    pub const SUBMIT_TAG: &'static str = "textbox.submit";

    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            cursor: text.chars().count(),
            text,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caret position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn on_mouse_button(&mut self, base: &ComponentBase, event: &EventRef) -> Option<EventRef> {
        let Event::MouseButton {
            x,
            y,
            button: MouseButton::Left,
            pressed: true,
        } = **event
        else {
            return same(event);
        };
        self.focused = base.geometry().contains(x, y);
        if self.focused {
            None
        } else {
            same(event)
        }
    }

    fn on_char(&mut self, _base: &ComponentBase, event: &EventRef) -> Option<EventRef> {
        let Event::Char { ch } = **event else {
            return same(event);
        };
        if !self.focused || ch.is_control() {
            return same(event);
        }
        if self.max_len.is_some_and(|max| self.char_len() >= max) {
            return None;
        }
        let at = self.byte_offset(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
        None
    }

    fn on_key_press(&mut self, _base: &ComponentBase, event: &EventRef) -> Option<EventRef> {
        let Event::KeyPress { key, .. } = **event else {
            return same(event);
        };
        if !self.focused {
            return same(event);
        }
        match key {
            keys::BACKSPACE => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.text.remove(at);
                }
            }
            keys::DELETE => {
                if self.cursor < self.char_len() {
                    let at = self.byte_offset(self.cursor);
                    self.text.remove(at);
                }
            }
            keys::LEFT => self.cursor = self.cursor.saturating_sub(1),
            keys::RIGHT => self.cursor = (self.cursor + 1).min(self.char_len()),
            keys::HOME => self.cursor = 0,
            keys::END => self.cursor = self.char_len(),
            keys::ESCAPE => self.focused = false,
            keys::ENTER => {
                return Some(
                    Event::Custom {
                        tag: Self::SUBMIT_TAG.into(),
                        payload: json!({ "text": self.text }),
                    }
                    .shared(),
                );
            }
            _ => return same(event),
        }
        None
    }

    fn caret(&self, rect: &Geometry) -> Option<Geometry> {
        let x = (rect.x + 4.0 + self.cursor as f32 * GLYPH_WIDTH).min(rect.right() - 1.0);
        Geometry::new(x, rect.y + 2.0, 1.0, (rect.height - 4.0).max(0.0)).ok()
    }
}

impl FromParams for TextBox {
    fn from_params(params: &Value) -> Result<Self> {
        let p: TextBoxParams = parse_params(params)?;
        Ok(Self {
            placeholder: p.placeholder,
            max_len: p.max_len,
            ..Self::new(p.text)
        })
    }
}

impl Component for TextBox {
    fn kind(&self) -> &str {
        "text_box"
    }

    fn register_processors(registry: &mut ProcessorRegistry<Self>) {
        registry.register(EventKind::MouseButton, TextBox::on_mouse_button);
        registry.register(EventKind::Char, TextBox::on_char);
        registry.register(EventKind::KeyPress, TextBox::on_key_press);
    }

    fn draw(&mut self, base: &ComponentBase, canvas: &mut dyn Canvas) -> bool {
        let rect = base.geometry();
        if !rect.is_initialized() {
            return false;
        }
        canvas.fill_rect(rect, Color::rgb(240, 240, 240));
        let border = if self.focused {
            Color::rgb(60, 90, 160)
        } else {
            Color::GRAY
        };
        canvas.stroke_rect(rect, border, 1.0);
        if self.text.is_empty() {
            canvas.draw_text(rect.x + 4.0, rect.y + 4.0, &self.placeholder, Color::GRAY);
        } else {
            canvas.draw_text(rect.x + 4.0, rect.y + 4.0, &self.text, Color::BLACK);
        }
        if self.focused {
            if let Some(caret) = self.caret(&rect) {
                canvas.fill_rect(caret, Color::BLACK);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCommand, RecordingCanvas};
    use crate::component::{ComponentHost, DynComponent};
    use crate::event::Modifiers;
    use crate::window::Window;

    fn click(x: f32, y: f32, pressed: bool) -> EventRef {
        Event::MouseButton {
            x,
            y,
            button: MouseButton::Left,
            pressed,
        }
        .shared()
    }

    fn key(key: u32) -> EventRef {
        Event::KeyPress {
            key,
            modifiers: Modifiers::empty(),
        }
        .shared()
    }

    #[test]
    fn test_button_click_emits_tagged_event() {
        let host = ComponentHost::new(Window::headless(100.0, 100.0), Button::new("OK", "ok"));
        host.init(10.0, 10.0, 40.0, 20.0).unwrap();

        assert!(host.process(&click(15.0, 15.0, true)).is_none());
        assert!(host.with(|b| b.is_pressed()));
        let out = host.process(&click(15.0, 15.0, false)).unwrap();
        match &*out {
            Event::Custom { tag, payload } => {
                assert_eq!(tag, "ok");
                assert_eq!(payload["clicks"], 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(host.with(|b| b.clicks()), 1);
    }

    #[test]
    fn test_button_ignores_outside_clicks() {
        let host = ComponentHost::new(Window::headless(100.0, 100.0), Button::new("OK", "ok"));
        host.init(10.0, 10.0, 40.0, 20.0).unwrap();
        let ev = click(90.0, 90.0, true);
        assert!(Arc::ptr_eq(&host.process(&ev).unwrap(), &ev));
        assert!(!host.with(|b| b.is_pressed()));
    }

    #[test]
    fn test_text_box_editing() {
        let host = ComponentHost::new(Window::headless(100.0, 100.0), TextBox::new("ac"));
        host.init(0.0, 0.0, 100.0, 20.0).unwrap();

        let typed = Event::Char { ch: 'x' }.shared();
        assert!(Arc::ptr_eq(&host.process(&typed).unwrap(), &typed), "unfocused box ignores input");

        assert!(host.process(&click(5.0, 5.0, true)).is_none());
        assert!(host.process(&key(keys::LEFT)).is_none());
        assert!(host.process(&Event::Char { ch: 'b' }.shared()).is_none());
        assert_eq!(host.with(|t| t.text().to_owned()), "abc");
        assert_eq!(host.with(|t| t.cursor()), 2);

        assert!(host.process(&key(keys::BACKSPACE)).is_none());
        assert!(host.process(&key(keys::END)).is_none());
        assert!(host.process(&Event::Char { ch: 'é' }.shared()).is_none());
        assert_eq!(host.with(|t| t.text().to_owned()), "acé");

        let submitted = host.process(&key(keys::ENTER)).unwrap();
        assert!(matches!(&*submitted, Event::Custom { tag, .. } if tag == TextBox::SUBMIT_TAG));

        let unknown = key(1000);
        assert!(Arc::ptr_eq(&host.process(&unknown).unwrap(), &unknown));
    }

    #[test]
    fn test_text_box_blurs_on_outside_click() {
        let host = ComponentHost::new(Window::headless(100.0, 100.0), TextBox::new(""));
        host.init(0.0, 0.0, 50.0, 20.0).unwrap();
        host.process(&click(5.0, 5.0, true));
        assert!(host.with(|t| t.is_focused()));
        let outside = click(80.0, 80.0, true);
        assert!(Arc::ptr_eq(&host.process(&outside).unwrap(), &outside));
        assert!(!host.with(|t| t.is_focused()));
    }

    #[test]
    fn test_text_box_max_len() {
        let params = json!({ "text": "ab", "max_len": 2 });
        let host = ComponentHost::new(
            Window::headless(100.0, 100.0),
            TextBox::from_params(&params).unwrap(),
        );
        host.with(|t| t.set_focused(true));
        assert!(host.process(&Event::Char { ch: 'c' }.shared()).is_none());
        assert_eq!(host.with(|t| t.text().to_owned()), "ab");
    }

    #[test]
    fn test_widgets_skip_drawing_without_geometry() {
        let host = ComponentHost::new(Window::headless(100.0, 100.0), Panel::default());
        let mut canvas = RecordingCanvas::new();
        assert!(!host.draw(&mut canvas));
        host.init(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(host.draw(&mut canvas));
        assert!(matches!(canvas.commands()[0], DrawCommand::FillRect { .. }));
    }

    #[test]
    fn test_label_from_params() {
        let label = Label::from_params(&json!({ "text": "hello" })).unwrap();
        assert_eq!(label.text, "hello");
        assert_eq!(label.color, Color::WHITE);
    }
}
