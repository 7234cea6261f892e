//! The floor-plan document and its entity-level mutation API.

use crate::model::{
    Bounds, Dimensions, EntityId, EntityKind, FurnitureGroup, FurnitureId, FurnitureInstance, GroupId,
    OpeningId, OpeningKind, Room, RoomConnection, RoomId, Wall, WallId,
};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading or validating a document.
#[derive(Debug, Error)]
pub enum FloorPlanError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Entity {owner} references missing entity {missing}")]
    DanglingReference { owner: EntityId, missing: EntityId },
    #[error("Wall {0} has identical start and end points")]
    DegenerateWall(WallId),
    #[error("Rooms {0} and {1} have more than one connection")]
    DuplicateConnection(RoomId, RoomId),
}

/// Aggregate root: every wall, room, furniture item, group and connection of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub(crate) walls: Vec<Wall>,
    #[serde(default)]
    pub(crate) rooms: Vec<Room>,
    #[serde(default)]
    pub(crate) furniture: Vec<FurnitureInstance>,
    #[serde(default)]
    pub(crate) groups: Vec<FurnitureGroup>,
    #[serde(default)]
    pub(crate) connections: Vec<RoomConnection>,
}

impl Default for FloorPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl FloorPlan {
    /// Create a new empty plan.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            walls: Vec::new(),
            rooms: Vec::new(),
            furniture: Vec::new(),
            groups: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// All walls in insertion order.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// All rooms in insertion order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// All furniture items in insertion order.
    pub fn furniture(&self) -> &[FurnitureInstance] {
        &self.furniture
    }

    /// All furniture groups.
    pub fn groups(&self) -> &[FurnitureGroup] {
        &self.groups
    }

    /// All room connections.
    pub fn connections(&self) -> &[RoomConnection] {
        &self.connections
    }

    /// Check if the plan has no walls, rooms or furniture.
    pub fn is_empty(&self) -> bool {
        self.walls.is_empty() && self.rooms.is_empty() && self.furniture.is_empty()
    }

    /// Get a wall by ID.
    pub fn get_wall_by_id(&self, id: WallId) -> Option<&Wall> {
        self.walls.iter().find(|w| w.id == id)
    }

    /// Get a room by ID.
    pub fn get_room_by_id(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Get a furniture item by ID.
    pub fn get_furniture_by_id(&self, id: FurnitureId) -> Option<&FurnitureInstance> {
        self.furniture.iter().find(|f| f.id == id)
    }

    /// Get a furniture group by ID.
    pub fn get_group_by_id(&self, id: GroupId) -> Option<&FurnitureGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Get a room connection by ID.
    pub fn get_connection_by_id(&self, id: Uuid) -> Option<&RoomConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub(crate) fn wall_mut(&mut self, id: WallId) -> Option<&mut Wall> {
        self.walls.iter_mut().find(|w| w.id == id)
    }

    pub(crate) fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == id)
    }

    pub(crate) fn furniture_mut(&mut self, id: FurnitureId) -> Option<&mut FurnitureInstance> {
        self.furniture.iter_mut().find(|f| f.id == id)
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Option<&mut FurnitureGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Which collection `id` lives in, if any.
    pub fn entity_kind(&self, id: EntityId) -> Option<EntityKind> {
        if self.get_wall_by_id(id).is_some() {
            Some(EntityKind::Wall)
        } else if self.get_room_by_id(id).is_some() {
            Some(EntityKind::Room)
        } else if self.get_furniture_by_id(id).is_some() {
            Some(EntityKind::Furniture)
        } else if self.get_group_by_id(id).is_some() {
            Some(EntityKind::Group)
        } else if self.get_connection_by_id(id).is_some() {
            Some(EntityKind::Connection)
        } else {
            None
        }
    }

    /// Check if any entity has this ID.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entity_kind(id).is_some()
    }

    // --- walls ---

    /// Add a wall. Zero-length walls are refused.
    pub fn add_wall(&mut self, mut wall: Wall) -> Option<WallId> {
        if wall.is_degenerate() {
            log::warn!("Refusing zero-length wall at {:?}", wall.start);
            return None;
        }
        if wall.owner_room_id.is_some_and(|room| self.get_room_by_id(room).is_none()) {
            wall.owner_room_id = None;
        }
        let id = wall.id;
        self.walls.push(wall);
        Some(id)
    }

    /// Remove a wall together with its openings. Joint membership is derived and goes with it.
    pub fn remove_wall(&mut self, id: WallId) -> Option<Wall> {
        let index = self.walls.iter().position(|w| w.id == id)?;
        Some(self.walls.remove(index))
    }

    /// Place a door or window on a wall. Returns `None` for a missing wall or bad dimensions.
    pub fn add_wall_opening(
        &mut self,
        wall_id: WallId,
        kind: OpeningKind,
        offset: f64,
        width: f64,
        height: f64,
    ) -> Option<OpeningId> {
        self.wall_mut(wall_id)?.add_opening(kind, offset, width, height)
    }

    /// Remove a door or window from a wall.
    pub fn remove_wall_opening(&mut self, wall_id: WallId, opening_id: OpeningId) -> bool {
        self.wall_mut(wall_id)
            .and_then(|wall| wall.remove_opening(opening_id))
            .is_some()
    }

    // --- rooms ---

    /// Add a room on top of the existing ones.
    pub fn add_room(&mut self, mut room: Room) -> RoomId {
        room.z_index = self.rooms.iter().map(|r| r.z_index + 1).max().unwrap_or(0);
        room.contained_room_ids.clear();
        room.contained_furniture_ids.clear();
        let parent = room.parent_room_id.take();
        let id = room.id;
        self.rooms.push(room);
        if let Some(parent) = parent {
            self.reparent_room(id, Some(parent));
        }
        id
    }

    /// Remove a room, dropping its connections and un-parenting everything it contained.
    pub fn remove_room(&mut self, id: RoomId) -> Option<Room> {
        let index = self.rooms.iter().position(|r| r.id == id)?;
        let room = self.rooms.remove(index);

        let before = self.connections.len();
        self.connections.retain(|c| !c.involves(id));
        for item in self.furniture.iter_mut().filter(|f| f.parent_room_id == Some(id)) {
            item.parent_room_id = None;
        }
        for child in self.rooms.iter_mut() {
            if child.parent_room_id == Some(id) {
                child.parent_room_id = None;
            }
            child.contained_room_ids.retain(|&r| r != id);
        }
        for wall in self.walls.iter_mut().filter(|w| w.owner_room_id == Some(id)) {
            wall.owner_room_id = None;
        }
        log::debug!(
            "Removed room {} ({} connections dropped)",
            id,
            before - self.connections.len()
        );
        Some(room)
    }

    /// Move a room so its top-left corner sits at `origin`.
    /// Contained furniture and nested rooms travel with it.
    pub fn move_room_to(&mut self, id: RoomId, origin: Point) -> bool {
        let Some(room) = self.get_room_by_id(id) else {
            return false;
        };
        let delta = origin - room.bounds().origin();
        if delta == Vec2::ZERO {
            return true;
        }

        let mut moved_rooms = vec![id];
        moved_rooms.extend(self.room_descendants(id));
        let moved: HashSet<RoomId> = moved_rooms.iter().copied().collect();
        for room in self.rooms.iter_mut().filter(|r| moved.contains(&r.id)) {
            let bounds = room.bounds().translated(delta);
            room.set_bounds(bounds);
        }
        for item in self
            .furniture
            .iter_mut()
            .filter(|f| f.parent_room_id.is_some_and(|r| moved.contains(&r)))
        {
            item.position += delta;
        }
        true
    }

    /// Replace a room's bounds; sizes below the minimum are clamped up.
    pub fn resize_room(&mut self, id: RoomId, bounds: Bounds) -> bool {
        match self.room_mut(id) {
            Some(room) => {
                room.set_bounds(bounds);
                true
            }
            None => false,
        }
    }

    // --- furniture ---

    /// Add a furniture item on top of the existing ones, linking it to its room.
    pub fn add_furniture(&mut self, mut item: FurnitureInstance) -> FurnitureId {
        item.z_index = self.furniture.iter().map(|f| f.z_index + 1).max().unwrap_or(0);
        item.dimensions = item.dimensions.clamped();
        item.group_id = None;
        let parent = item.parent_room_id.take();
        let id = item.id;
        self.furniture.push(item);
        if parent.is_some() {
            self.reparent_furniture(id, parent);
        }
        id
    }

    /// Remove a furniture item from the plan, its group and its room.
    pub fn remove_furniture(&mut self, id: FurnitureId) -> Option<FurnitureInstance> {
        let index = self.furniture.iter().position(|f| f.id == id)?;
        let item = self.furniture.remove(index);
        if let Some(group_id) = item.group_id {
            self.detach_from_group(id, group_id);
        }
        if let Some(room) = item.parent_room_id.and_then(|r| self.room_mut(r)) {
            room.contained_furniture_ids.retain(|&f| f != id);
        }
        Some(item)
    }

    /// Move an unlocked item so its center sits at `position`.
    pub fn move_furniture(&mut self, id: FurnitureId, position: Point) -> bool {
        match self.furniture_mut(id) {
            Some(item) if !item.locked => {
                item.position = position;
                true
            }
            _ => false,
        }
    }

    /// Resize an unlocked item; width and depth below the minimum are clamped up.
    pub fn resize_furniture(&mut self, id: FurnitureId, dimensions: Dimensions) -> bool {
        match self.furniture_mut(id) {
            Some(item) if !item.locked => {
                item.dimensions = dimensions.clamped();
                true
            }
            _ => false,
        }
    }

    /// Rotate an unlocked item about its center by `delta_degrees`.
    pub fn rotate_furniture(&mut self, id: FurnitureId, delta_degrees: f64) -> bool {
        match self.furniture_mut(id) {
            Some(item) if !item.locked => {
                let rotation = item.rotation + delta_degrees;
                item.set_rotation(rotation);
                true
            }
            _ => false,
        }
    }

    /// Translate several items at once. Locked or missing items are skipped.
    /// Returns how many moved.
    pub fn move_multiple_furniture(&mut self, ids: &[FurnitureId], delta: Vec2) -> usize {
        let mut moved = 0;
        for item in self.furniture.iter_mut().filter(|f| ids.contains(&f.id) && !f.locked) {
            item.position += delta;
            moved += 1;
        }
        moved
    }

    /// Duplicate items with fresh ids, shifted by `offset`.
    /// A group whose members are all duplicated is duplicated as a group as well.
    pub fn duplicate_multiple(&mut self, ids: &[FurnitureId], offset: Vec2) -> Vec<FurnitureId> {
        let mut mapping: HashMap<FurnitureId, FurnitureId> = HashMap::new();
        let mut created = Vec::new();
        for &id in ids {
            if mapping.contains_key(&id) {
                continue;
            }
            let Some(original) = self.get_furniture_by_id(id) else {
                continue;
            };
            let copy = original.duplicate(offset);
            let new_id = self.add_furniture(copy);
            mapping.insert(id, new_id);
            created.push(new_id);
        }

        let whole_groups: Vec<(String, Vec<FurnitureId>)> = self
            .groups
            .iter()
            .filter(|g| g.member_ids.len() >= 2 && g.member_ids.iter().all(|m| mapping.contains_key(m)))
            .map(|g| {
                let members = g.member_ids.iter().map(|m| mapping[m]).collect();
                (format!("{} copy", g.name), members)
            })
            .collect();
        for (name, members) in whole_groups {
            self.create_group(&members, Some(name));
        }
        created
    }

    /// Remove any mix of entities, cascading per kind. Returns how many were removed.
    pub fn remove_entities(&mut self, ids: &[EntityId]) -> usize {
        let mut removed = 0;
        for &id in ids {
            let done = match self.entity_kind(id) {
                Some(EntityKind::Wall) => self.remove_wall(id).is_some(),
                Some(EntityKind::Room) => self.remove_room(id).is_some(),
                Some(EntityKind::Furniture) => self.remove_furniture(id).is_some(),
                Some(EntityKind::Group) => self.dissolve_group(id),
                Some(EntityKind::Connection) => self.remove_room_connection(id).is_some(),
                None => false,
            };
            if done {
                removed += 1;
            }
        }
        removed
    }

    /// Bounding box of all walls, rooms and furniture.
    pub fn bounds(&self) -> Option<Rect> {
        let walls = self.walls.iter().map(|w| Rect::from_points(w.start, w.end));
        let rooms = self.rooms.iter().map(|r| r.bounds().to_rect());
        let furniture = self.furniture.iter().map(|f| f.footprint());
        walls.chain(rooms).chain(furniture).reduce(|acc, rect| acc.union(rect))
    }

    /// Serialize the plan to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate a plan from JSON.
    pub fn from_json(json: &str) -> Result<Self, FloorPlanError> {
        let mut plan: Self = serde_json::from_str(json)?;
        for room in &mut plan.rooms {
            room.refresh_metrics();
        }
        plan.validate()?;
        Ok(plan)
    }

    /// Check referential integrity: no dangling ids, no degenerate walls,
    /// at most one connection per room pair.
    pub fn validate(&self) -> Result<(), FloorPlanError> {
        let rooms: HashSet<RoomId> = self.rooms.iter().map(|r| r.id).collect();
        let furniture: HashSet<FurnitureId> = self.furniture.iter().map(|f| f.id).collect();
        let groups: HashSet<GroupId> = self.groups.iter().map(|g| g.id).collect();
        let check = |owner: EntityId, missing: EntityId, set: &HashSet<Uuid>| {
            if set.contains(&missing) {
                Ok(())
            } else {
                Err(FloorPlanError::DanglingReference { owner, missing })
            }
        };

        for wall in &self.walls {
            if wall.is_degenerate() {
                return Err(FloorPlanError::DegenerateWall(wall.id));
            }
            if let Some(room) = wall.owner_room_id {
                check(wall.id, room, &rooms)?;
            }
        }
        for room in &self.rooms {
            if let Some(parent) = room.parent_room_id {
                check(room.id, parent, &rooms)?;
            }
            for &child in &room.contained_room_ids {
                check(room.id, child, &rooms)?;
            }
            for &item in &room.contained_furniture_ids {
                check(room.id, item, &furniture)?;
            }
        }
        for item in &self.furniture {
            if let Some(group) = item.group_id {
                check(item.id, group, &groups)?;
            }
            if let Some(room) = item.parent_room_id {
                check(item.id, room, &rooms)?;
            }
        }
        for group in &self.groups {
            for &member in &group.member_ids {
                check(group.id, member, &furniture)?;
            }
            if let Some(parent) = group.parent_group_id {
                check(group.id, parent, &groups)?;
            }
        }
        for (index, conn) in self.connections.iter().enumerate() {
            for &room in &conn.room_ids {
                check(conn.id, room, &rooms)?;
            }
            let [a, b] = conn.room_ids;
            if self.connections[index + 1..].iter().any(|other| other.connects(a, b)) {
                return Err(FloorPlanError::DuplicateConnection(a, b));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectionType, OpeningKind, RoomType};

    fn room_at(x: f64, y: f64) -> Room {
        Room::new("Room", RoomType::Other, Bounds::new(x, y, 300.0, 300.0))
    }

    fn chair(x: f64, y: f64) -> FurnitureInstance {
        FurnitureInstance::new("chair", Point::new(x, y), Dimensions::new(50.0, 50.0, 90.0))
    }

    #[test]
    fn test_plan_creation() {
        let plan = FloorPlan::new();
        assert!(plan.is_empty());
        assert!(plan.bounds().is_none());
    }

    #[test]
    fn test_degenerate_wall_refused() {
        let mut plan = FloorPlan::new();
        let p = Point::new(10.0, 10.0);
        assert!(plan.add_wall(Wall::new(p, p)).is_none());
        assert!(plan.walls().is_empty());
    }

    #[test]
    fn test_missing_ids_return_none() {
        let plan = FloorPlan::new();
        assert!(plan.get_wall_by_id(Uuid::new_v4()).is_none());
        assert!(plan.get_room_by_id(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_remove_room_cascades() {
        let mut plan = FloorPlan::new();
        let a = plan.add_room(room_at(0.0, 0.0));
        let b = plan.add_room(room_at(300.0, 0.0));
        plan.sync_all_connections(1.0, 10.0);
        assert_eq!(plan.connections().len(), 1);

        let item = plan.add_furniture(chair(100.0, 100.0));
        plan.reparent_furniture(item, Some(a));
        let mut wall = Wall::new(Point::new(0.0, 0.0), Point::new(300.0, 0.0));
        wall.owner_room_id = Some(a);
        let wall = plan.add_wall(wall).unwrap();

        plan.remove_room(a);
        assert!(plan.connections().is_empty());
        assert_eq!(plan.get_furniture_by_id(item).unwrap().parent_room_id, None);
        assert_eq!(plan.get_wall_by_id(wall).unwrap().owner_room_id, None);
        assert!(plan.get_room_by_id(b).is_some());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_move_room_carries_contents() {
        let mut plan = FloorPlan::new();
        let room = plan.add_room(room_at(0.0, 0.0));
        let item = plan.add_furniture(chair(100.0, 100.0));
        plan.reparent_furniture(item, Some(room));

        assert!(plan.move_room_to(room, Point::new(50.0, 20.0)));
        assert_eq!(plan.get_room_by_id(room).unwrap().bounds().origin(), Point::new(50.0, 20.0));
        assert_eq!(plan.get_furniture_by_id(item).unwrap().position, Point::new(150.0, 120.0));
    }

    #[test]
    fn test_locked_furniture_does_not_move() {
        let mut plan = FloorPlan::new();
        let mut item = chair(0.0, 0.0);
        item.locked = true;
        let id = plan.add_furniture(item);
        assert!(!plan.move_furniture(id, Point::new(10.0, 10.0)));
        assert!(!plan.rotate_furniture(id, 45.0));
        assert_eq!(plan.move_multiple_furniture(&[id], Vec2::new(5.0, 5.0)), 0);
    }

    #[test]
    fn test_resize_clamps() {
        let mut plan = FloorPlan::new();
        let room = plan.add_room(room_at(0.0, 0.0));
        let item = plan.add_furniture(chair(0.0, 0.0));
        plan.resize_room(room, Bounds::new(0.0, 0.0, 10.0, 10.0));
        plan.resize_furniture(item, Dimensions::new(1.0, 1.0, 40.0));
        assert_eq!(plan.get_room_by_id(room).unwrap().bounds().width, 50.0);
        assert_eq!(plan.get_furniture_by_id(item).unwrap().dimensions.width, 10.0);
    }

    #[test]
    fn test_duplicate_multiple_keeps_whole_groups() {
        let mut plan = FloorPlan::new();
        let a = plan.add_furniture(chair(0.0, 0.0));
        let b = plan.add_furniture(chair(100.0, 0.0));
        plan.create_group(&[a, b], Some("Dining".to_string()));

        let copies = plan.duplicate_multiple(&[a, b], Vec2::new(0.0, 200.0));
        assert_eq!(copies.len(), 2);
        assert_eq!(plan.groups().len(), 2);
        let copy = plan.get_furniture_by_id(copies[0]).unwrap();
        assert_eq!(copy.position, Point::new(0.0, 200.0));
        let group = plan.get_group_for_item(copies[0]).unwrap();
        assert_eq!(group.name, "Dining copy");
        assert_ne!(copies[0], a);
    }

    #[test]
    fn test_remove_entities_mixed() {
        let mut plan = FloorPlan::new();
        let wall = plan
            .add_wall(Wall::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0)))
            .unwrap();
        let room = plan.add_room(room_at(0.0, 0.0));
        let item = plan.add_furniture(chair(0.0, 0.0));
        assert_eq!(plan.remove_entities(&[wall, room, item, Uuid::new_v4()]), 3);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut plan = FloorPlan::new();
        let a = plan.add_room(room_at(0.0, 0.0));
        plan.add_room(room_at(300.0, 0.0));
        plan.sync_all_connections(1.0, 10.0);
        let conn = plan.connections()[0].id();
        plan.add_connection_opening(conn, 0.25, 0.3);
        let wall = plan
            .add_wall(Wall::new(Point::new(0.0, 0.0), Point::new(300.0, 0.0)))
            .unwrap();
        plan.add_wall_opening(wall, OpeningKind::Door, 50.0, 90.0, 210.0);
        let x = plan.add_furniture(chair(10.0, 10.0));
        let y = plan.add_furniture(chair(80.0, 10.0));
        plan.create_group(&[x, y], None);
        plan.reparent_furniture(x, Some(a));

        let json = plan.to_json().unwrap();
        let loaded = FloorPlan::from_json(&json).unwrap();
        assert_eq!(loaded, plan);
        assert_eq!(loaded.connections()[0].connection_type(), ConnectionType::Wall);
        assert_eq!(loaded.connections()[0].openings().len(), 1);
    }

    #[test]
    fn test_from_json_rejects_dangling() {
        let mut plan = FloorPlan::new();
        let mut item = chair(0.0, 0.0);
        item.group_id = Some(Uuid::new_v4());
        plan.furniture.push(item);
        let json = plan.to_json().unwrap();
        assert!(matches!(
            FloorPlan::from_json(&json),
            Err(FloorPlanError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            FloorPlan::from_json("{ not json"),
            Err(FloorPlanError::Serialization(_))
        ));
    }
}
