//! Edge adjacency between rooms and connection-type classification.

use crate::model::{Axis, Bounds, ConnectionType, EdgeSegment, Room, RoomId, Side, Wall};
use kurbo::Point;

/// Default tolerance within which two room edges count as touching, in centimeters.
pub const ADJACENCY_TOLERANCE: f64 = 1.0;

/// Default minimum length two touching edges must share.
pub const MIN_ADJACENCY_OVERLAP: f64 = 10.0;

/// Gap or overlap shortfall below which two edges are considered exactly coincident.
const EXACT_EPSILON: f64 = 1e-6;

/// How a room touches one of its neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjacency {
    pub room_id: RoomId,
    /// Orientation of the shared edge.
    pub axis: Axis,
    /// Side of the queried room that touches.
    pub side: Side,
    /// Side of the neighbour that touches.
    pub other_side: Side,
    pub shared_edge: EdgeSegment,
    /// Length of the shared edge.
    pub overlap: f64,
    /// Distance between the two edges (0 when they coincide exactly).
    pub gap: f64,
}

/// Touching-edge relation between two bounds. The returned `room_id` is nil;
/// [`find_adjacent_rooms`] fills it in.
pub fn edge_contact(a: &Bounds, b: &Bounds, tolerance: f64, min_overlap: f64) -> Option<Adjacency> {
    let vertical_overlap = a.bottom().min(b.bottom()) - a.top().max(b.top());
    let horizontal_overlap = a.right().min(b.right()) - a.left().max(b.left());

    let vertical_contact = |side: Side, a_edge: f64, b_edge: f64| {
        let gap = (a_edge - b_edge).abs();
        (gap <= tolerance && vertical_overlap > min_overlap).then(|| {
            let top = a.top().max(b.top());
            Adjacency {
                room_id: RoomId::nil(),
                axis: Axis::Vertical,
                side,
                other_side: side.opposite(),
                shared_edge: EdgeSegment::new(Point::new(b_edge, top), Point::new(b_edge, top + vertical_overlap)),
                overlap: vertical_overlap,
                gap,
            }
        })
    };
    let horizontal_contact = |side: Side, a_edge: f64, b_edge: f64| {
        let gap = (a_edge - b_edge).abs();
        (gap <= tolerance && horizontal_overlap > min_overlap).then(|| {
            let left = a.left().max(b.left());
            Adjacency {
                room_id: RoomId::nil(),
                axis: Axis::Horizontal,
                side,
                other_side: side.opposite(),
                shared_edge: EdgeSegment::new(Point::new(left, b_edge), Point::new(left + horizontal_overlap, b_edge)),
                overlap: horizontal_overlap,
                gap,
            }
        })
    };

    vertical_contact(Side::Right, a.right(), b.left())
        .or_else(|| vertical_contact(Side::Left, a.left(), b.right()))
        .or_else(|| horizontal_contact(Side::Bottom, a.bottom(), b.top()))
        .or_else(|| horizontal_contact(Side::Top, a.top(), b.bottom()))
}

/// Every room whose edge touches `bounds`, skipping `exclude`.
///
/// Edges touch when they coincide within `tolerance` and their projections on the
/// perpendicular axis overlap by more than `min_overlap`.
pub fn find_adjacent_rooms(
    bounds: &Bounds,
    rooms: &[Room],
    exclude: RoomId,
    tolerance: f64,
    min_overlap: f64,
) -> Vec<Adjacency> {
    rooms
        .iter()
        .filter(|room| room.id() != exclude)
        .filter_map(|room| {
            edge_contact(bounds, &room.bounds(), tolerance, min_overlap)
                .map(|contact| Adjacency { room_id: room.id(), ..contact })
        })
        .collect()
}

/// Whether any wall runs along the shared edge of an adjacency.
pub fn wall_along_edge(walls: &[Wall], edge: &EdgeSegment, axis: Axis, tolerance: f64) -> bool {
    walls.iter().any(|wall| match axis {
        Axis::Vertical => {
            let x = edge.start.x;
            (wall.start.x - x).abs() <= tolerance
                && (wall.end.x - x).abs() <= tolerance
                && wall.start.y.min(wall.end.y) < edge.end.y.max(edge.start.y)
                && wall.start.y.max(wall.end.y) > edge.start.y.min(edge.end.y)
        }
        Axis::Horizontal => {
            let y = edge.start.y;
            (wall.start.y - y).abs() <= tolerance
                && (wall.end.y - y).abs() <= tolerance
                && wall.start.x.min(wall.end.x) < edge.end.x.max(edge.start.x)
                && wall.start.x.max(wall.end.x) > edge.start.x.min(edge.end.x)
        }
    })
}

/// Classify how two adjacent rooms should be connected.
///
/// `Direct` when the edges coincide with no gap, the shorter edge is fully shared,
/// and no wall runs along the shared edge; `Wall` otherwise.
pub fn classify_connection(
    room: &Room,
    other: &Room,
    adjacency: &Adjacency,
    walls: &[Wall],
    tolerance: f64,
) -> ConnectionType {
    let (a, b) = (room.bounds(), other.bounds());
    let shorter = match adjacency.axis {
        Axis::Vertical => a.height.min(b.height),
        Axis::Horizontal => a.width.min(b.width),
    };
    let full_overlap = adjacency.overlap >= shorter - EXACT_EPSILON;
    let flush = adjacency.gap <= EXACT_EPSILON;
    if flush && full_overlap && !wall_along_edge(walls, &adjacency.shared_edge, adjacency.axis, tolerance) {
        ConnectionType::Direct
    } else {
        ConnectionType::Wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoomType;

    fn room(x: f64, y: f64, w: f64, h: f64) -> Room {
        Room::new("Room", RoomType::Other, Bounds::new(x, y, w, h))
    }

    #[test]
    fn test_side_by_side_rooms_are_adjacent() {
        let a = room(0.0, 0.0, 300.0, 300.0);
        let b = room(300.0, 0.0, 300.0, 300.0);
        let rooms = vec![a.clone(), b.clone()];

        let found = find_adjacent_rooms(&a.bounds(), &rooms, a.id(), ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP);
        assert_eq!(found.len(), 1);
        let adj = found[0];
        assert_eq!(adj.room_id, b.id());
        assert_eq!(adj.axis, Axis::Vertical);
        assert_eq!(adj.side, Side::Right);
        assert_eq!(adj.other_side, Side::Left);
        assert_eq!(adj.shared_edge, EdgeSegment::new(Point::new(300.0, 0.0), Point::new(300.0, 300.0)));
        assert_eq!(adj.overlap, 300.0);
    }

    #[test]
    fn test_stacked_rooms_are_adjacent() {
        let a = room(0.0, 0.0, 300.0, 200.0);
        let b = room(100.0, 200.0, 300.0, 200.0);
        let contact = edge_contact(&b.bounds(), &a.bounds(), 1.0, 10.0).unwrap();
        assert_eq!(contact.axis, Axis::Horizontal);
        assert_eq!(contact.side, Side::Top);
        assert_eq!(contact.other_side, Side::Bottom);
        assert_eq!(contact.overlap, 200.0);
        assert_eq!(contact.shared_edge.start, Point::new(100.0, 200.0));
    }

    #[test]
    fn test_corner_touch_is_not_adjacent() {
        let a = room(0.0, 0.0, 300.0, 300.0);
        let b = room(300.0, 295.0, 300.0, 300.0);
        assert!(edge_contact(&a.bounds(), &b.bounds(), 1.0, 10.0).is_none());
    }

    #[test]
    fn test_gap_beyond_tolerance_is_not_adjacent() {
        let a = room(0.0, 0.0, 300.0, 300.0);
        let b = room(302.0, 0.0, 300.0, 300.0);
        assert!(edge_contact(&a.bounds(), &b.bounds(), 1.0, 10.0).is_none());
        assert!(edge_contact(&a.bounds(), &b.bounds(), 5.0, 10.0).is_some());
    }

    #[test]
    fn test_classify_direct_and_wall() {
        let a = room(0.0, 0.0, 300.0, 300.0);
        let b = room(300.0, 0.0, 300.0, 300.0);
        let adj = edge_contact(&a.bounds(), &b.bounds(), 1.0, 10.0).unwrap();
        assert_eq!(classify_connection(&a, &b, &adj, &[], 1.0), ConnectionType::Direct);

        let wall = Wall::new(Point::new(300.0, 0.0), Point::new(300.0, 300.0));
        assert_eq!(classify_connection(&a, &b, &adj, &[wall], 1.0), ConnectionType::Wall);
    }

    #[test]
    fn test_classify_partial_overlap_is_wall() {
        let a = room(0.0, 0.0, 300.0, 300.0);
        let b = room(300.0, 150.0, 300.0, 300.0);
        let adj = edge_contact(&a.bounds(), &b.bounds(), 1.0, 10.0).unwrap();
        assert_eq!(classify_connection(&a, &b, &adj, &[], 1.0), ConnectionType::Wall);
    }
}
