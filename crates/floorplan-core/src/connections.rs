//! Connection manager: keeps `RoomConnection` records in step with room adjacency.

use crate::adjacency::{Adjacency, find_adjacent_rooms};
use crate::model::{
    Axis, ConnectionId, ConnectionKind, ConnectionOpening, ConnectionType, EdgeSegment, OpeningId,
    RoomConnection, RoomId, Side,
};
use crate::plan::FloorPlan;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Connection type to use per neighbouring room when a sync creates a connection.
/// Rooms without a hint get a wall connection.
pub type ConnectionHints = HashMap<RoomId, ConnectionType>;

/// Everything needed to create a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConnection {
    pub room_ids: [RoomId; 2],
    pub connection_type: ConnectionType,
    pub axis: Axis,
    pub room_sides: [Side; 2],
    pub shared_edge: EdgeSegment,
}

impl NewConnection {
    /// Build a connection request from `room`'s view of one neighbour.
    pub fn from_adjacency(room: RoomId, adjacency: &Adjacency, connection_type: ConnectionType) -> Self {
        Self {
            room_ids: [room, adjacency.room_id],
            connection_type,
            axis: adjacency.axis,
            room_sides: [adjacency.side, adjacency.other_side],
            shared_edge: adjacency.shared_edge,
        }
    }
}

/// Partial update of a connection. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionUpdate {
    pub connection_type: Option<ConnectionType>,
    pub axis: Option<Axis>,
    pub room_sides: Option<[Side; 2]>,
    pub shared_edge: Option<EdgeSegment>,
}

/// Outcome of re-deriving connections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSync {
    pub added: Vec<ConnectionId>,
    pub removed: Vec<ConnectionId>,
    /// Surviving connections whose geometry was refreshed.
    pub updated: Vec<ConnectionId>,
}

impl ConnectionSync {
    /// Check if the sync changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    fn merge(&mut self, other: ConnectionSync) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.updated.extend(other.updated);
    }
}

impl FloorPlan {
    /// Insert a connection unless one already exists for the pair.
    ///
    /// Returns the id of the new or already-existing connection, or `None` when
    /// either room is missing or both ids name the same room.
    pub fn add_room_connection(&mut self, request: NewConnection) -> Option<ConnectionId> {
        let [a, b] = request.room_ids;
        if a == b || self.get_room_by_id(a).is_none() || self.get_room_by_id(b).is_none() {
            log::warn!("Refusing connection between {} and {}", a, b);
            return None;
        }
        if let Some(existing) = self.get_connection_between_rooms(a, b) {
            return Some(existing.id());
        }
        let connection = RoomConnection {
            id: Uuid::new_v4(),
            room_ids: request.room_ids,
            kind: ConnectionKind::from_type(request.connection_type),
            axis: request.axis,
            room_sides: request.room_sides,
            shared_edge: request.shared_edge,
        };
        let id = connection.id;
        self.connections.push(connection);
        Some(id)
    }

    /// Remove a connection together with its openings.
    pub fn remove_room_connection(&mut self, id: ConnectionId) -> Option<RoomConnection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }

    /// Apply a partial update. A type change resets the opening list.
    pub fn update_room_connection(&mut self, id: ConnectionId, update: ConnectionUpdate) -> bool {
        let Some(connection) = self.connection_mut(id) else {
            return false;
        };
        if let Some(connection_type) = update.connection_type {
            connection.set_type(connection_type);
        }
        if let Some(axis) = update.axis {
            connection.axis = axis;
        }
        if let Some(sides) = update.room_sides {
            connection.room_sides = sides;
        }
        if let Some(edge) = update.shared_edge {
            connection.shared_edge = edge;
        }
        true
    }

    /// Add an opening to a wall connection.
    ///
    /// `position` and `width` are fractions of the shared edge and are clamped so the
    /// opening fits on it. Openings on direct connections, zero-width openings and
    /// openings overlapping an existing one are rejected.
    pub fn add_connection_opening(
        &mut self,
        connection_id: ConnectionId,
        position: f64,
        width: f64,
    ) -> Option<OpeningId> {
        let connection = self.connection_mut(connection_id)?;
        let ConnectionKind::Wall { openings } = &mut connection.kind else {
            log::warn!("Connection {} is direct and cannot hold openings", connection_id);
            return None;
        };
        if !position.is_finite() || !width.is_finite() {
            log::warn!("Rejected opening on {} with non-finite position or width", connection_id);
            return None;
        }
        let width = width.clamp(0.0, 1.0);
        if width <= 0.0 {
            return None;
        }
        let position = position.clamp(0.0, 1.0 - width);
        if openings.iter().any(|o| o.overlaps(position, width)) {
            log::warn!(
                "Opening at {:.3}+{:.3} overlaps an existing opening on {}",
                position,
                width,
                connection_id
            );
            return None;
        }
        let opening = ConnectionOpening { id: Uuid::new_v4(), position, width };
        let id = opening.id;
        openings.push(opening);
        openings.sort_by(|a, b| a.position.total_cmp(&b.position));
        Some(id)
    }

    /// Remove an opening from a wall-type connection.
    pub fn remove_connection_opening(&mut self, connection_id: ConnectionId, opening_id: OpeningId) -> bool {
        let Some(connection) = self.connection_mut(connection_id) else {
            return false;
        };
        match &mut connection.kind {
            ConnectionKind::Wall { openings } => {
                let before = openings.len();
                openings.retain(|o| o.id != opening_id);
                openings.len() != before
            }
            ConnectionKind::Direct => false,
        }
    }

    /// Every connection touching `room`.
    pub fn get_connections_for_room(&self, room: RoomId) -> Vec<&RoomConnection> {
        self.connections.iter().filter(|c| c.involves(room)).collect()
    }

    /// The connection between two rooms, in either order.
    pub fn get_connection_between_rooms(&self, a: RoomId, b: RoomId) -> Option<&RoomConnection> {
        self.connections.iter().find(|c| c.connects(a, b))
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut RoomConnection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    /// Re-derive the connections of one room from its current adjacency.
    ///
    /// Connections to rooms that no longer touch are removed. Surviving ones keep
    /// their id, type and openings but get fresh axis, sides and shared edge.
    /// New neighbours get a connection typed from `hints`, defaulting to wall.
    pub fn sync_room_connections(
        &mut self,
        room_id: RoomId,
        hints: &ConnectionHints,
        tolerance: f64,
        min_overlap: f64,
    ) -> ConnectionSync {
        let mut sync = ConnectionSync::default();
        let Some(room) = self.get_room_by_id(room_id) else {
            return sync;
        };
        let adjacent = find_adjacent_rooms(&room.bounds(), &self.rooms, room_id, tolerance, min_overlap);
        let by_room: HashMap<RoomId, &Adjacency> = adjacent.iter().map(|a| (a.room_id, a)).collect();

        let mut connected = HashSet::new();
        self.connections.retain(|connection| {
            let Some(other) = connection.other_room(room_id) else {
                return true;
            };
            if by_room.contains_key(&other) {
                connected.insert(other);
                true
            } else {
                sync.removed.push(connection.id);
                false
            }
        });

        for connection in self.connections.iter_mut() {
            let Some(adjacency) = connection.other_room(room_id).and_then(|other| by_room.get(&other)) else {
                continue;
            };
            let sides = if connection.room_ids[0] == room_id {
                [adjacency.side, adjacency.other_side]
            } else {
                [adjacency.other_side, adjacency.side]
            };
            if connection.axis != adjacency.axis
                || connection.room_sides != sides
                || connection.shared_edge != adjacency.shared_edge
            {
                connection.axis = adjacency.axis;
                connection.room_sides = sides;
                connection.shared_edge = adjacency.shared_edge;
                sync.updated.push(connection.id);
            }
        }

        for adjacency in adjacent.iter().filter(|a| !connected.contains(&a.room_id)) {
            let connection_type = hints.get(&adjacency.room_id).copied().unwrap_or(ConnectionType::Wall);
            let request = NewConnection::from_adjacency(room_id, adjacency, connection_type);
            if let Some(id) = self.add_room_connection(request) {
                sync.added.push(id);
            }
        }

        if !sync.is_empty() {
            log::debug!(
                "Room {} connections: +{} -{} ~{}",
                room_id,
                sync.added.len(),
                sync.removed.len(),
                sync.updated.len()
            );
        }
        sync
    }

    /// Settle connections after a room move or resize. Nested rooms moved with the
    /// room are re-synced too.
    pub fn finish_room_move(
        &mut self,
        room_id: RoomId,
        hints: &ConnectionHints,
        tolerance: f64,
        min_overlap: f64,
    ) -> ConnectionSync {
        let mut sync = self.sync_room_connections(room_id, hints, tolerance, min_overlap);
        for child in self.room_descendants(room_id) {
            sync.merge(self.sync_room_connections(child, &ConnectionHints::new(), tolerance, min_overlap));
        }
        sync
    }

    /// Re-derive every connection in the plan, e.g. after loading a document.
    pub fn sync_all_connections(&mut self, tolerance: f64, min_overlap: f64) -> ConnectionSync {
        let room_ids: Vec<RoomId> = self.rooms.iter().map(|r| r.id).collect();
        let known: HashSet<RoomId> = room_ids.iter().copied().collect();
        let mut sync = ConnectionSync::default();
        self.connections.retain(|c| {
            let keep = c.room_ids.iter().all(|r| known.contains(r)) && c.room_ids[0] != c.room_ids[1];
            if !keep {
                sync.removed.push(c.id);
            }
            keep
        });
        for id in room_ids {
            sync.merge(self.sync_room_connections(id, &ConnectionHints::new(), tolerance, min_overlap));
        }
        sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP};
    use crate::model::{Bounds, Room, RoomType};
    use kurbo::Point;

    fn plan_with_rooms(bounds: &[Bounds]) -> (FloorPlan, Vec<RoomId>) {
        let mut plan = FloorPlan::new();
        let ids = bounds
            .iter()
            .map(|&b| plan.add_room(Room::new("Room", RoomType::Other, b)))
            .collect();
        (plan, ids)
    }

    fn sync(plan: &mut FloorPlan, room: RoomId) -> ConnectionSync {
        plan.sync_room_connections(room, &ConnectionHints::new(), ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP)
    }

    #[test]
    fn test_sync_creates_wall_connection() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        let result = sync(&mut plan, ids[1]);
        assert_eq!(result.added.len(), 1);

        let connection = plan.get_connection_between_rooms(ids[0], ids[1]).unwrap();
        assert_eq!(connection.connection_type(), ConnectionType::Wall);
        assert_eq!(connection.axis, Axis::Vertical);
        assert_eq!(connection.side_of(ids[1]), Some(Side::Left));
        assert_eq!(connection.side_of(ids[0]), Some(Side::Right));
        assert_eq!(connection.shared_edge.start, Point::new(300.0, 0.0));
    }

    #[test]
    fn test_hint_sets_connection_type() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        let hints = ConnectionHints::from([(ids[0], ConnectionType::Direct)]);
        plan.sync_room_connections(ids[1], &hints, ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP);
        let connection = plan.get_connection_between_rooms(ids[0], ids[1]).unwrap();
        assert_eq!(connection.connection_type(), ConnectionType::Direct);
    }

    #[test]
    fn test_sync_removes_stale_connection() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[1]);
        plan.move_room_to(ids[1], Point::new(500.0, 0.0));
        let result = sync(&mut plan, ids[1]);
        assert_eq!(result.removed.len(), 1);
        assert!(plan.connections().is_empty());
    }

    #[test]
    fn test_openings_survive_geometry_refresh() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[1]);
        let connection_id = plan.get_connection_between_rooms(ids[0], ids[1]).unwrap().id();
        plan.add_connection_opening(connection_id, 0.2, 0.3).unwrap();

        plan.move_room_to(ids[1], Point::new(300.0, 100.0));
        let result = sync(&mut plan, ids[1]);
        assert_eq!(result.updated, vec![connection_id]);

        let connection = plan.get_connection_by_id(connection_id).unwrap();
        assert_eq!(connection.openings().len(), 1);
        assert_eq!(connection.shared_edge.length(), 200.0);
    }

    #[test]
    fn test_add_connection_is_unique_per_pair() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        let request = NewConnection {
            room_ids: [ids[0], ids[1]],
            connection_type: ConnectionType::Wall,
            axis: Axis::Vertical,
            room_sides: [Side::Right, Side::Left],
            shared_edge: EdgeSegment::new(Point::new(300.0, 0.0), Point::new(300.0, 300.0)),
        };
        let first = plan.add_room_connection(request.clone()).unwrap();
        let reversed = NewConnection { room_ids: [ids[1], ids[0]], ..request };
        assert_eq!(plan.add_room_connection(reversed), Some(first));
        assert_eq!(plan.connections().len(), 1);

        let self_loop = NewConnection { room_ids: [ids[0], ids[0]], ..request };
        assert!(plan.add_room_connection(self_loop).is_none());
    }

    #[test]
    fn test_non_finite_opening_rejected() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[1]);
        let id = plan.connections()[0].id();
        assert!(plan.add_connection_opening(id, 0.1, f64::NAN).is_none());
        assert!(plan.add_connection_opening(id, f64::NAN, 0.2).is_none());
        assert!(plan.get_connection_by_id(id).unwrap().openings().is_empty());
    }

    #[test]
    fn test_type_change_resets_openings() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[1]);
        let id = plan.connections()[0].id();
        plan.add_connection_opening(id, 0.1, 0.2).unwrap();

        let to_direct = ConnectionUpdate { connection_type: Some(ConnectionType::Direct), ..Default::default() };
        assert!(plan.update_room_connection(id, to_direct));
        assert!(plan.add_connection_opening(id, 0.1, 0.2).is_none());

        let to_wall = ConnectionUpdate { connection_type: Some(ConnectionType::Wall), ..Default::default() };
        plan.update_room_connection(id, to_wall);
        let connection = plan.get_connection_by_id(id).unwrap();
        assert_eq!(connection.connection_type(), ConnectionType::Wall);
        assert!(connection.openings().is_empty());
    }

    #[test]
    fn test_openings_clamped_and_overlap_rejected() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[1]);
        let id = plan.connections()[0].id();

        let clamped = plan.add_connection_opening(id, 0.9, 0.25).unwrap();
        let opening = plan.get_connection_by_id(id).unwrap().openings()[0].clone();
        assert_eq!(opening.id(), clamped);
        assert!((opening.position - 0.75).abs() < 1e-12);

        assert!(plan.add_connection_opening(id, 0.7, 0.1).is_none());
        assert!(plan.add_connection_opening(id, 0.0, 0.0).is_none());
        let other = plan.add_connection_opening(id, 0.1, 0.2).unwrap();
        assert_eq!(plan.get_connection_by_id(id).unwrap().openings()[0].id(), other);

        assert!(plan.remove_connection_opening(id, clamped));
        assert!(!plan.remove_connection_opening(id, clamped));
    }

    #[test]
    fn test_sync_all_matches_adjacency() {
        let (mut plan, ids) = plan_with_rooms(&[
            Bounds::new(0.0, 0.0, 300.0, 300.0),
            Bounds::new(300.0, 0.0, 300.0, 300.0),
            Bounds::new(0.0, 300.0, 600.0, 200.0),
            Bounds::new(1000.0, 0.0, 100.0, 100.0),
        ]);
        plan.sync_all_connections(ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP);

        for &a in &ids {
            let bounds = plan.get_room_by_id(a).unwrap().bounds();
            let adjacent =
                find_adjacent_rooms(&bounds, plan.rooms(), a, ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP);
            for &b in ids.iter().filter(|&&b| b != a) {
                let is_adjacent = adjacent.iter().any(|adj| adj.room_id == b);
                assert_eq!(plan.get_connection_between_rooms(a, b).is_some(), is_adjacent);
            }
        }
        assert_eq!(plan.connections().len(), 3);
        assert!(plan.get_connections_for_room(ids[3]).is_empty());
        plan.validate().unwrap();
    }

    #[test]
    fn test_remove_room_drops_connections() {
        let (mut plan, ids) =
            plan_with_rooms(&[Bounds::new(0.0, 0.0, 300.0, 300.0), Bounds::new(300.0, 0.0, 300.0, 300.0)]);
        sync(&mut plan, ids[0]);
        assert_eq!(plan.get_connections_for_room(ids[0]).len(), 1);
        plan.remove_room(ids[1]);
        assert!(plan.connections().is_empty());
    }
}
