//! Camera module for the pan transform.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view offset of the canvas.
///
/// The canvas is never scaled. A canvas point `p` is drawn at `p + offset`
/// in client space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
}

impl Camera {
    /// Create a new camera at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts canvas coordinates to client coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset)
    }

    /// Convert a client point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        screen_point - self.offset
    }

    /// Convert a canvas point to client coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        canvas_point + self.offset
    }

    /// Pan the camera by a delta in client coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Apply a wheel scroll. Scrolling moves the view, so the offset shrinks.
    pub fn scroll(&mut self, delta: Vec2) {
        self.offset -= delta;
    }

    /// Put the canvas origin at the center of the viewport.
    pub fn center_on(&mut self, viewport: Size) {
        self.offset = Vec2::new(viewport.width / 2.0, viewport.height / 2.0);
    }

    /// Reset camera to the origin.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
    }
}
