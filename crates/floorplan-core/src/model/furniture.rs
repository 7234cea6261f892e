//! Furniture instances and furniture groups.

use super::{FurnitureId, GroupId, RoomId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest allowed furniture width or depth, in centimeters.
pub const MIN_FURNITURE_SIZE: f64 = 10.0;

/// Physical size of a furniture item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Dimensions {
    /// Create dimensions in centimeters.
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self { width, depth, height }
    }

    /// Raise every dimension to the furniture minimum.
    pub fn clamped(self) -> Self {
        Self::new(
            self.width.max(MIN_FURNITURE_SIZE),
            self.depth.max(MIN_FURNITURE_SIZE),
            self.height.max(0.0),
        )
    }
}

/// A placed piece of furniture. `position` is the center of the footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureInstance {
    pub(crate) id: FurnitureId,
    /// Key into the external catalog.
    pub catalog_item_id: String,
    pub position: Point,
    /// Rotation in degrees, normalized to `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub parent_room_id: Option<RoomId>,
    #[serde(default)]
    pub z_index: i32,
}

impl FurnitureInstance {
    /// Place a catalog item with its center at `position`.
    pub fn new(catalog_item_id: impl Into<String>, position: Point, dimensions: Dimensions) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog_item_id: catalog_item_id.into(),
            position,
            rotation: 0.0,
            dimensions: dimensions.clamped(),
            locked: false,
            group_id: None,
            parent_room_id: None,
            z_index: 0,
        }
    }

    /// Unique identifier of this item.
    pub fn id(&self) -> FurnitureId {
        self.id
    }

    /// Axis-aligned bounding box of the rotated footprint.
    pub fn footprint(&self) -> Rect {
        self.footprint_at(self.position)
    }

    /// Footprint as if the item were centered on `center`.
    pub fn footprint_at(&self, center: Point) -> Rect {
        let half_w = self.dimensions.width / 2.0;
        let half_d = self.dimensions.depth / 2.0;
        let unrotated = Rect::new(center.x - half_w, center.y - half_d, center.x + half_w, center.y + half_d);
        if self.rotation.abs() < 0.001 {
            return unrotated;
        }

        let rot = Affine::rotate_about(self.rotation.to_radians(), center);
        let corners = [
            Point::new(unrotated.x0, unrotated.y0),
            Point::new(unrotated.x1, unrotated.y0),
            Point::new(unrotated.x1, unrotated.y1),
            Point::new(unrotated.x0, unrotated.y1),
        ];
        let mut rect = Rect::from_points(rot * corners[0], rot * corners[1]);
        for &corner in &corners[2..] {
            rect = rect.union_pt(rot * corner);
        }
        rect
    }

    /// Set the rotation in degrees, normalized to [0, 360).
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    /// Copy with a fresh id, shifted by `offset`, detached from any group.
    pub fn duplicate(&self, offset: Vec2) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: self.position + offset,
            group_id: None,
            ..self.clone()
        }
    }
}

/// Named set of furniture items manipulated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureGroup {
    pub(crate) id: GroupId,
    pub name: String,
    pub member_ids: Vec<FurnitureId>,
    #[serde(default)]
    pub locked: bool,
    /// Enclosing group when groups are nested.
    #[serde(default)]
    pub parent_group_id: Option<GroupId>,
    #[serde(default)]
    pub z_index: i32,
}

impl FurnitureGroup {
    /// Create a group from member ids.
    pub fn new(name: impl Into<String>, member_ids: Vec<FurnitureId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            member_ids,
            locked: false,
            parent_group_id: None,
            z_index: 0,
        }
    }

    /// Unique identifier of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_clamped() {
        let item = FurnitureInstance::new("lamp", Point::ZERO, Dimensions::new(4.0, 30.0, 150.0));
        assert_eq!(item.dimensions.width, MIN_FURNITURE_SIZE);
        assert_eq!(item.dimensions.depth, 30.0);
    }

    #[test]
    fn test_footprint_centered() {
        let item = FurnitureInstance::new("sofa", Point::new(100.0, 100.0), Dimensions::new(200.0, 80.0, 90.0));
        assert_eq!(item.footprint(), Rect::new(0.0, 60.0, 200.0, 140.0));
    }

    #[test]
    fn test_footprint_rotated_quarter_turn() {
        let mut item = FurnitureInstance::new("sofa", Point::new(100.0, 100.0), Dimensions::new(200.0, 80.0, 90.0));
        item.set_rotation(90.0);
        let rect = item.footprint();
        assert!((rect.width() - 80.0).abs() < 1e-9);
        assert!((rect.height() - 200.0).abs() < 1e-9);
        assert!((rect.center().x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_normalized() {
        let mut item = FurnitureInstance::new("chair", Point::ZERO, Dimensions::new(50.0, 50.0, 90.0));
        item.set_rotation(-90.0);
        assert_eq!(item.rotation, 270.0);
        item.set_rotation(450.0);
        assert_eq!(item.rotation, 90.0);
    }
}
