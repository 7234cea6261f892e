//! Camera module for pan/zoom transforms.
//!
//! The core only needs the zoom level to turn pixel thresholds into plan units,
//! but the full view transform lives here so collaborators share one definition.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform of the plan view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Screen pixels per centimeter.
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.05,
            max_zoom: 20.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Convert a screen point to plan coordinates.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.offset) / self.zoom).to_point()
    }

    /// Convert a plan point to screen coordinates.
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.transform() * world
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `screen_point` fixed on screen.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        let anchor = screen_point.to_vec2();
        self.offset = anchor - (anchor - self.offset) * (zoom / self.zoom);
        self.zoom = zoom;
    }

    /// Back to the unpanned, unzoomed view.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// A distance in screen pixels expressed in plan units at the current zoom.
    ///
    /// A zoom below `min_zoom` (or NaN) is treated as `min_zoom`.
    pub fn world_threshold(&self, pixels: f64) -> f64 {
        pixels / self.zoom.max(self.min_zoom)
    }
}
