//! Walls and the doors/windows placed along them.

use super::{OpeningId, RoomId, WallId};
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Construction material, used by the renderers for texturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallMaterial {
    #[default]
    Drywall,
    Brick,
    Concrete,
    Wood,
    Glass,
}

/// Door or window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningKind {
    Door,
    Window,
}

/// An opening placed along a wall, measured from the wall's start point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallOpening {
    pub(crate) id: OpeningId,
    pub kind: OpeningKind,
    /// Distance from the wall start to the near side of the opening.
    pub offset: f64,
    pub width: f64,
    pub height: f64,
}

impl WallOpening {
    /// Unique identifier of this opening.
    pub fn id(&self) -> OpeningId {
        self.id
    }
}

/// One of the two endpoints of a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallEnd {
    Start,
    End,
}

/// A straight wall segment. `start` and `end` never coincide once stored in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub(crate) id: WallId,
    pub start: Point,
    pub end: Point,
    pub thickness: f64,
    pub height: f64,
    #[serde(default)]
    pub material: WallMaterial,
    #[serde(default)]
    pub openings: Vec<WallOpening>,
    #[serde(default)]
    pub owner_room_id: Option<RoomId>,
}

impl Wall {
    pub const DEFAULT_THICKNESS: f64 = 15.0;
    pub const DEFAULT_HEIGHT: f64 = 250.0;

    /// Create a wall between two points with default thickness and height.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            thickness: Self::DEFAULT_THICKNESS,
            height: Self::DEFAULT_HEIGHT,
            material: WallMaterial::default(),
            openings: Vec::new(),
            owner_room_id: None,
        }
    }

    /// Unique identifier of this wall.
    pub fn id(&self) -> WallId {
        self.id
    }

    /// Centerline length in centimeters.
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Whether both endpoints coincide.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// The centerline as a kurbo line.
    pub fn segment(&self) -> Line {
        Line::new(self.start, self.end)
    }

    /// Position of the given end.
    pub fn endpoint(&self, end: WallEnd) -> Point {
        match end {
            WallEnd::Start => self.start,
            WallEnd::End => self.end,
        }
    }

    pub(crate) fn set_endpoint(&mut self, end: WallEnd, point: Point) {
        match end {
            WallEnd::Start => self.start = point,
            WallEnd::End => self.end = point,
        }
        self.clamp_openings();
    }

    /// Place an opening, clamped so it lies entirely on the wall.
    ///
    /// Returns `None` if any dimension is not finite.
    pub fn add_opening(&mut self, kind: OpeningKind, offset: f64, width: f64, height: f64) -> Option<OpeningId> {
        if ![offset, width, height].iter().all(|v| v.is_finite()) {
            log::warn!("Rejected opening on wall {} with non-finite dimensions", self.id);
            return None;
        }
        let length = self.length();
        let width = width.clamp(0.0, length);
        let opening = WallOpening {
            id: Uuid::new_v4(),
            kind,
            offset: offset.clamp(0.0, length - width),
            width,
            height: height.max(0.0),
        };
        let id = opening.id;
        self.openings.push(opening);
        Some(id)
    }

    /// Remove an opening by id.
    pub fn remove_opening(&mut self, id: OpeningId) -> Option<WallOpening> {
        let index = self.openings.iter().position(|o| o.id == id)?;
        Some(self.openings.remove(index))
    }

    /// Keep openings on the wall after its length changed.
    fn clamp_openings(&mut self) {
        let length = self.length();
        for opening in &mut self.openings {
            opening.width = opening.width.min(length);
            opening.offset = opening.offset.clamp(0.0, length - opening.width);
        }
    }
}
