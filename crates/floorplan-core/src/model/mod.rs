//! Spatial model: the plain-data entities a floor plan is made of.

mod connection;
mod furniture;
mod room;
mod wall;

pub use connection::{
    Axis, ConnectionKind, ConnectionOpening, ConnectionType, EdgeSegment, RoomConnection, Side,
};
pub use furniture::{Dimensions, FurnitureGroup, FurnitureInstance, MIN_FURNITURE_SIZE};
pub use room::{Bounds, MIN_ROOM_SIZE, Room, RoomType};
pub use wall::{OpeningKind, Wall, WallEnd, WallMaterial, WallOpening};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier shared by every entity in a plan.
pub type EntityId = Uuid;
pub type WallId = Uuid;
pub type RoomId = Uuid;
pub type FurnitureId = Uuid;
pub type GroupId = Uuid;
pub type ConnectionId = Uuid;
/// Identifier of a wall opening or a connection opening.
pub type OpeningId = Uuid;

/// Which collection of the plan an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Wall,
    Room,
    Furniture,
    Group,
    Connection,
}

/// Ordered set of selected entity ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<EntityId>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection, dropping duplicates while keeping first-seen order.
    pub fn from_ids(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut selection = Self::new();
        for id in ids {
            selection.add(id);
        }
        selection
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Check if an entity is selected.
    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of selected entities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Replace the selection with a single id.
    pub fn select(&mut self, id: EntityId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Add to the selection, keeping existing entries.
    pub fn add(&mut self, id: EntityId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Deselect one entity.
    pub fn remove(&mut self, id: EntityId) {
        self.ids.retain(|&selected| selected != id);
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Keep only the ids matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&EntityId) -> bool) {
        self.ids.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_dedupes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let selection = Selection::from_ids([a, b, a]);
        assert_eq!(selection.ids(), &[a, b]);
    }

    #[test]
    fn test_selection_select_replaces() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut selection = Selection::from_ids([a]);
        selection.select(b);
        assert!(!selection.contains(a));
        assert!(selection.contains(b));
        assert_eq!(selection.len(), 1);
    }
}
