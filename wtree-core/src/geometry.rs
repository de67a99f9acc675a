//! Component rectangles.
//!
//! A [`Geometry`] is either fully unset (every field NaN) or a valid
//! rectangle with finite origin and non-negative size.

use serde::{Deserialize, Serialize};

use crate::errors::TreeError;

/// Left-top origin plus size, in logical window units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub const UNSET: Geometry = Geometry {
        x: f32::NAN,
        y: f32::NAN,
        width: f32::NAN,
        height: f32::NAN,
    };

    /// Build a validated rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self, TreeError> {
        if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
            return Err(TreeError::InvalidGeometry(format!(
                "non-finite rectangle ({x}, {y}, {width}, {height})"
            )));
        }
        if width < 0.0 || height < 0.0 {
            return Err(TreeError::InvalidGeometry(format!(
                "negative size {width}x{height}"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn is_initialized(&self) -> bool {
        !self.x.is_nan()
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment test; always `false` while unset.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        self.is_initialized() && px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::UNSET
    }
}
