//! Rooms and their axis-aligned bounds.

use super::{FurnitureId, RoomId};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest allowed room width or height, in centimeters.
pub const MIN_ROOM_SIZE: f64 = 50.0;

/// Axis-aligned rectangle in plan coordinates (centimeters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create bounds from a top-left corner and a size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Convert from a kurbo rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    /// Convert to a kurbo rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// X coordinate of the left edge.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Y coordinate of the top edge.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Grow width and height up to `min`, keeping the origin.
    pub fn clamped(self, min: f64) -> Self {
        Self::new(self.x, self.y, self.width.max(min), self.height.max(min))
    }

    /// The same bounds moved by `delta`.
    pub fn translated(self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// The same size with its top-left corner at `origin`.
    pub fn with_origin(self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }
}

/// Functional category of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    LivingRoom,
    Bedroom,
    Kitchen,
    Bathroom,
    DiningRoom,
    Office,
    Hallway,
    Storage,
    #[default]
    Other,
}

/// A rectangular room. Area and perimeter are derived from the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub(crate) id: RoomId,
    pub name: String,
    #[serde(default)]
    pub room_type: RoomType,
    bounds: Bounds,
    /// Floor area in square meters.
    #[serde(default)]
    area: f64,
    /// Perimeter in meters.
    #[serde(default)]
    perimeter: f64,
    #[serde(default)]
    pub contained_furniture_ids: Vec<FurnitureId>,
    #[serde(default)]
    pub contained_room_ids: Vec<RoomId>,
    #[serde(default)]
    pub parent_room_id: Option<RoomId>,
    #[serde(default)]
    pub z_index: i32,
}

impl Room {
    /// Create a room; bounds are clamped to the room minimum.
    pub fn new(name: impl Into<String>, room_type: RoomType, bounds: Bounds) -> Self {
        let mut room = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            room_type,
            bounds,
            area: 0.0,
            perimeter: 0.0,
            contained_furniture_ids: Vec::new(),
            contained_room_ids: Vec::new(),
            parent_room_id: None,
            z_index: 0,
        };
        room.set_bounds(bounds);
        room
    }

    /// Unique identifier of this room.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Current bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Floor area in square centimeters.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Perimeter in centimeters.
    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Replace the bounds, clamping to [`MIN_ROOM_SIZE`] and refreshing metrics.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds.clamped(MIN_ROOM_SIZE);
        self.refresh_metrics();
    }

    pub(crate) fn refresh_metrics(&mut self) {
        self.area = self.bounds.width * self.bounds.height / 10_000.0;
        self.perimeter = 2.0 * (self.bounds.width + self.bounds.height) / 100.0;
    }
}
