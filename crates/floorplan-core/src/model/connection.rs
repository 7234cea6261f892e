//! Room-to-room connections and the openings cut into them.

use super::{ConnectionId, OpeningId, RoomId};
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

/// Orientation of a line in the plan: a vertical line has constant x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Edge of an axis-aligned room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// The side facing this one across a shared edge.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    /// Orientation of the edge itself.
    pub fn axis(self) -> Axis {
        match self {
            Side::Left | Side::Right => Axis::Vertical,
            Side::Top | Side::Bottom => Axis::Horizontal,
        }
    }
}

/// Whether two adjacent rooms are separated by a wall or open to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wall,
    Direct,
}

/// Segment along which two rooms touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSegment {
    pub start: Point,
    pub end: Point,
}

impl EdgeSegment {
    /// Create an edge between two points.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Length of the edge in centimeters.
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// The edge as a kurbo line.
    pub fn line(&self) -> Line {
        Line::new(self.start, self.end)
    }

    /// Point at fraction `t` (0..=1) along the segment.
    pub fn point_at(&self, t: f64) -> Point {
        self.start.lerp(self.end, t)
    }
}

/// Opening in a wall-type connection, expressed as fractions of the shared edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOpening {
    pub(crate) id: OpeningId,
    pub position: f64,
    pub width: f64,
}

impl ConnectionOpening {
    /// Unique identifier of this opening.
    pub fn id(&self) -> OpeningId {
        self.id
    }

    /// Fraction of the edge where this opening ends.
    pub fn end(&self) -> f64 {
        self.position + self.width
    }

    pub(crate) fn overlaps(&self, position: f64, width: f64) -> bool {
        position < self.end() && self.position < position + width
    }
}

/// Connection variant. Only wall connections carry openings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionKind {
    Wall {
        #[serde(default)]
        openings: Vec<ConnectionOpening>,
    },
    Direct,
}

impl ConnectionKind {
    /// Empty kind for the given connection type.
    pub fn from_type(connection_type: ConnectionType) -> Self {
        match connection_type {
            ConnectionType::Wall => ConnectionKind::Wall { openings: Vec::new() },
            ConnectionType::Direct => ConnectionKind::Direct,
        }
    }

    /// Plain type tag, without openings.
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            ConnectionKind::Wall { .. } => ConnectionType::Wall,
            ConnectionKind::Direct => ConnectionType::Direct,
        }
    }

    /// Openings along the edge; always empty for direct connections.
    pub fn openings(&self) -> &[ConnectionOpening] {
        match self {
            ConnectionKind::Wall { openings } => openings,
            ConnectionKind::Direct => &[],
        }
    }
}

/// Persisted adjacency record between two rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConnection {
    pub(crate) id: ConnectionId,
    /// Unordered pair; index order matches `room_sides`.
    pub room_ids: [RoomId; 2],
    pub kind: ConnectionKind,
    pub axis: Axis,
    pub room_sides: [Side; 2],
    pub shared_edge: EdgeSegment,
}

impl RoomConnection {
    /// Unique identifier of this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.kind.connection_type()
    }

    pub fn openings(&self) -> &[ConnectionOpening] {
        self.kind.openings()
    }

    /// Whether `room` is one of the two connected rooms.
    pub fn involves(&self, room: RoomId) -> bool {
        self.room_ids.contains(&room)
    }

    /// True when this connection joins `a` and `b`, in either order.
    pub fn connects(&self, a: RoomId, b: RoomId) -> bool {
        (self.room_ids[0] == a && self.room_ids[1] == b) || (self.room_ids[0] == b && self.room_ids[1] == a)
    }

    /// The room on the other side of `room`, if `room` is connected.
    pub fn other_room(&self, room: RoomId) -> Option<RoomId> {
        match self.room_ids {
            [a, b] if a == room => Some(b),
            [a, b] if b == room => Some(a),
            _ => None,
        }
    }

    /// The edge of `room` that touches the other room.
    pub fn side_of(&self, room: RoomId) -> Option<Side> {
        self.room_ids
            .iter()
            .position(|&id| id == room)
            .map(|index| self.room_sides[index])
    }

    /// Switch the connection type. Openings survive only a wall-to-wall change.
    pub fn set_type(&mut self, connection_type: ConnectionType) {
        if self.connection_type() != connection_type {
            self.kind = ConnectionKind::from_type(connection_type);
        }
    }
}
