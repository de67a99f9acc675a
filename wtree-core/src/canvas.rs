//! Draw context handed to `Component::draw`.
//!
//! Rendering primitives live outside this crate; a [`Canvas`] is the narrow
//! interface the tree draws through.  [`RecordingCanvas`] keeps every call as
//! a [`DrawCommand`], which is what the CLI prints and what tests assert on.

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

pub trait Canvas {
    fn fill_rect(&mut self, rect: Geometry, color: Color);
    fn stroke_rect(&mut self, rect: Geometry, color: Color, width: f32);
    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color);
}

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    FillRect {
        rect: Geometry,
        color: Color,
    },
    StrokeRect {
        rect: Geometry,
        color: Color,
        width: f32,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Color,
    },
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Geometry, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Geometry, color: Color, width: f32) {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_owned(),
            color,
        });
    }
}
