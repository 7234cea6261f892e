//! Hierarchy manager: furniture groups, room containment, z-order and the layer tree.

use crate::model::{FurnitureGroup, FurnitureId, FurnitureInstance, GroupId, RoomId};
use crate::plan::FloorPlan;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A node of the layer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LayerNode {
    Room(RoomId),
    Group(GroupId),
    Furniture(FurnitureId),
    /// Bucket for furniture and groups that belong to no room.
    Unassigned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerTreeNode {
    pub node: LayerNode,
    pub children: Vec<LayerTreeNode>,
}

/// Parent links of every layer node, built once per query.
///
/// Furniture hangs under its group, otherwise its room, otherwise `Unassigned`.
/// Groups hang under their parent group, otherwise the room shared by all their
/// furniture, otherwise `Unassigned`. Rooms hang under their parent room or are roots.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<LayerNode, LayerNode>,
    children: HashMap<LayerNode, Vec<LayerNode>>,
}

impl ParentIndex {
    pub fn build(plan: &FloorPlan) -> Self {
        let mut index = Self::default();

        let mut rooms: Vec<_> = plan.rooms().iter().collect();
        rooms.sort_by_key(|r| std::cmp::Reverse(r.z_index));
        for room in rooms {
            if let Some(parent) = room.parent_room_id {
                index.link(LayerNode::Room(room.id()), LayerNode::Room(parent));
            }
        }

        let mut groups: Vec<_> = plan.groups().iter().collect();
        groups.sort_by_key(|g| std::cmp::Reverse(g.z_index));
        for group in groups {
            let parent = match group.parent_group_id {
                Some(parent) => LayerNode::Group(parent),
                None => shared_room(plan, group).map_or(LayerNode::Unassigned, LayerNode::Room),
            };
            index.link(LayerNode::Group(group.id()), parent);
        }

        let mut furniture: Vec<_> = plan.furniture().iter().collect();
        furniture.sort_by_key(|f| std::cmp::Reverse(f.z_index));
        for item in furniture {
            let parent = match (item.group_id, item.parent_room_id) {
                (Some(group), _) => LayerNode::Group(group),
                (None, Some(room)) => LayerNode::Room(room),
                (None, None) => LayerNode::Unassigned,
            };
            index.link(LayerNode::Furniture(item.id()), parent);
        }
        index
    }

    fn link(&mut self, child: LayerNode, parent: LayerNode) {
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
    }

    /// Parent of a node, or `None` at the top level.
    pub fn parent_of(&self, node: LayerNode) -> Option<LayerNode> {
        self.parents.get(&node).copied()
    }

    /// Children of a node, front to back.
    pub fn children_of(&self, node: LayerNode) -> &[LayerNode] {
        self.children.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Parent, grandparent and so on up to a root. Stops at a repeated node.
    pub fn ancestors(&self, node: LayerNode) -> Vec<LayerNode> {
        let mut visited = HashSet::from([node]);
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent) {
                log::warn!("Cycle in layer hierarchy at {:?}", parent);
                break;
            }
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Every node below `node`, depth first.
    pub fn descendants(&self, node: LayerNode) -> Vec<LayerNode> {
        let mut visited = HashSet::from([node]);
        let mut out = Vec::new();
        let mut stack: Vec<LayerNode> = self.children_of(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }

    fn subtree(&self, node: LayerNode, visited: &mut HashSet<LayerNode>) -> LayerTreeNode {
        let mut children = Vec::new();
        for &child in self.children_of(node) {
            if visited.insert(child) {
                children.push(self.subtree(child, visited));
            }
        }
        LayerTreeNode { node, children }
    }
}

/// The room every member of `group` sits in, if they agree on one.
fn shared_room(plan: &FloorPlan, group: &FurnitureGroup) -> Option<RoomId> {
    let mut rooms = group
        .member_ids
        .iter()
        .filter_map(|&id| plan.get_furniture_by_id(id))
        .map(|f| f.parent_room_id);
    let first = rooms.next()??;
    rooms.all(|r| r == Some(first)).then_some(first)
}

impl FloorPlan {
    /// Group at least two distinct existing items.
    ///
    /// Items already in another group leave it first; a group left empty is removed.
    pub fn create_group(&mut self, ids: &[FurnitureId], name: Option<String>) -> Option<GroupId> {
        let mut members: Vec<FurnitureId> = Vec::new();
        for &id in ids {
            if !members.contains(&id) && self.get_furniture_by_id(id).is_some() {
                members.push(id);
            }
        }
        if members.len() < 2 {
            return None;
        }

        for &id in &members {
            if let Some(old) = self.get_furniture_by_id(id).and_then(|f| f.group_id) {
                self.detach_from_group(id, old);
            }
        }

        let name = name.unwrap_or_else(|| format!("Group {}", self.groups.len() + 1));
        let mut group = FurnitureGroup::new(name, members.clone());
        group.z_index = self.groups.iter().map(|g| g.z_index + 1).max().unwrap_or(0);
        let group_id = group.id;
        self.groups.push(group);
        for item in self.furniture.iter_mut().filter(|f| members.contains(&f.id)) {
            item.group_id = Some(group_id);
        }
        log::debug!("Created group {} with {} items", group_id, members.len());
        Some(group_id)
    }

    /// Remove a group without deleting its furniture.
    ///
    /// Members become ungrouped; nested groups move up to the dissolved group's parent.
    pub fn dissolve_group(&mut self, group_id: GroupId) -> bool {
        let Some(index) = self.groups.iter().position(|g| g.id == group_id) else {
            return false;
        };
        let group = self.groups.remove(index);
        for item in self.furniture.iter_mut().filter(|f| f.group_id == Some(group_id)) {
            item.group_id = None;
        }
        for child in self.groups.iter_mut().filter(|g| g.parent_group_id == Some(group_id)) {
            child.parent_group_id = group.parent_group_id;
        }
        true
    }

    /// Drop `item` from `group_id`, removing the group once nothing is left in it.
    pub(crate) fn detach_from_group(&mut self, item: FurnitureId, group_id: GroupId) {
        if let Some(furniture) = self.furniture_mut(item) {
            if furniture.group_id == Some(group_id) {
                furniture.group_id = None;
            }
        }
        let Some(group) = self.group_mut(group_id) else {
            return;
        };
        group.member_ids.retain(|&m| m != item);
        let emptied = group.member_ids.is_empty();
        let has_children = self.groups.iter().any(|g| g.parent_group_id == Some(group_id));
        if emptied && !has_children {
            self.dissolve_group(group_id);
        }
    }

    /// The group an item belongs to.
    pub fn get_group_for_item(&self, item: FurnitureId) -> Option<&FurnitureGroup> {
        self.get_furniture_by_id(item)
            .and_then(|f| f.group_id)
            .and_then(|g| self.get_group_by_id(g))
    }

    /// Direct members of a group, in member order.
    pub fn get_group_members(&self, group_id: GroupId) -> Vec<&FurnitureInstance> {
        self.get_group_by_id(group_id)
            .map(|group| {
                group
                    .member_ids
                    .iter()
                    .filter_map(|&id| self.get_furniture_by_id(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nested groups followed by direct members.
    pub fn get_children_of_group(&self, group_id: GroupId) -> Vec<LayerNode> {
        let Some(group) = self.get_group_by_id(group_id) else {
            return Vec::new();
        };
        self.groups
            .iter()
            .filter(|g| g.parent_group_id == Some(group_id))
            .map(|g| LayerNode::Group(g.id))
            .chain(group.member_ids.iter().map(|&id| LayerNode::Furniture(id)))
            .collect()
    }

    /// All furniture in a group and its nested groups.
    pub fn collect_group_furniture(&self, group_id: GroupId) -> Vec<FurnitureId> {
        let mut visited = HashSet::new();
        let mut stack = vec![group_id];
        let mut out = Vec::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(group) = self.get_group_by_id(current) else {
                continue;
            };
            out.extend(group.member_ids.iter().copied());
            stack.extend(
                self.groups
                    .iter()
                    .filter(|g| g.parent_group_id == Some(current))
                    .map(|g| g.id),
            );
        }
        out
    }

    /// Move a furniture item or a group into `target`, or out of any group with `None`.
    ///
    /// A group cannot be moved into itself or one of its nested groups.
    pub fn reparent_to_group(&mut self, node: LayerNode, target: Option<GroupId>) -> bool {
        if let Some(target) = target {
            if self.get_group_by_id(target).is_none() {
                return false;
            }
        }
        match node {
            LayerNode::Furniture(id) => {
                let Some(current) = self.get_furniture_by_id(id).map(|f| f.group_id) else {
                    return false;
                };
                if current == target {
                    return true;
                }
                if let Some(old) = current {
                    self.detach_from_group(id, old);
                }
                if let Some(target) = target {
                    if let Some(group) = self.group_mut(target) {
                        group.member_ids.push(id);
                    }
                    if let Some(item) = self.furniture_mut(id) {
                        item.group_id = Some(target);
                    }
                }
                true
            }
            LayerNode::Group(id) => {
                if self.get_group_by_id(id).is_none() {
                    return false;
                }
                if let Some(target) = target {
                    if target == id || self.group_ancestors(target).contains(&id) {
                        log::warn!("Refusing to nest group {} inside itself", id);
                        return false;
                    }
                }
                if let Some(group) = self.group_mut(id) {
                    group.parent_group_id = target;
                }
                true
            }
            LayerNode::Room(_) | LayerNode::Unassigned => false,
        }
    }

    fn group_ancestors(&self, group_id: GroupId) -> Vec<GroupId> {
        let mut visited = HashSet::from([group_id]);
        let mut out = Vec::new();
        let mut current = self.get_group_by_id(group_id).and_then(|g| g.parent_group_id);
        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            out.push(parent);
            current = self.get_group_by_id(parent).and_then(|g| g.parent_group_id);
        }
        out
    }

    /// Place a furniture item in `room`, or take it out of any room with `None`.
    pub fn reparent_furniture(&mut self, id: FurnitureId, room: Option<RoomId>) -> bool {
        if room.is_some_and(|r| self.get_room_by_id(r).is_none()) {
            return false;
        }
        let Some(item) = self.furniture_mut(id) else {
            return false;
        };
        let old = std::mem::replace(&mut item.parent_room_id, room);
        if let Some(old_room) = old.and_then(|r| self.room_mut(r)) {
            old_room.contained_furniture_ids.retain(|&f| f != id);
        }
        if let Some(new_room) = room.and_then(|r| self.room_mut(r)) {
            if !new_room.contained_furniture_ids.contains(&id) {
                new_room.contained_furniture_ids.push(id);
            }
        }
        true
    }

    /// Nest a room inside `parent`, or make it top-level with `None`.
    ///
    /// Rejected when `parent` is the room itself or one of its descendants.
    pub fn reparent_room(&mut self, id: RoomId, parent: Option<RoomId>) -> bool {
        if self.get_room_by_id(id).is_none() {
            return false;
        }
        if let Some(parent) = parent {
            if self.get_room_by_id(parent).is_none() {
                return false;
            }
            if parent == id || self.room_descendants(id).contains(&parent) {
                log::warn!("Refusing to nest room {} inside {}: containment cycle", id, parent);
                return false;
            }
        }
        let Some(room) = self.room_mut(id) else {
            return false;
        };
        let old = std::mem::replace(&mut room.parent_room_id, parent);
        if let Some(old_parent) = old.and_then(|r| self.room_mut(r)) {
            old_parent.contained_room_ids.retain(|&r| r != id);
        }
        if let Some(new_parent) = parent.and_then(|r| self.room_mut(r)) {
            if !new_parent.contained_room_ids.contains(&id) {
                new_parent.contained_room_ids.push(id);
            }
        }
        true
    }

    /// Rooms nested below `id` at any depth.
    pub fn room_descendants(&self, id: RoomId) -> Vec<RoomId> {
        let mut visited = HashSet::from([id]);
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.rooms.iter().filter(|r| r.parent_room_id == Some(current)) {
                if visited.insert(child.id) {
                    out.push(child.id);
                    stack.push(child.id);
                }
            }
        }
        out
    }

    /// Swap the z-index of `id` with that of `target`.
    pub fn reorder_furniture(&mut self, id: FurnitureId, target: FurnitureId) -> bool {
        let (Some(a), Some(b)) = (
            self.furniture.iter().position(|f| f.id == id),
            self.furniture.iter().position(|f| f.id == target),
        ) else {
            return false;
        };
        let z = self.furniture[a].z_index;
        self.furniture[a].z_index = self.furniture[b].z_index;
        self.furniture[b].z_index = z;
        true
    }

    /// Swap the z-index of `id` with that of `target`.
    pub fn reorder_room(&mut self, id: RoomId, target: RoomId) -> bool {
        let (Some(a), Some(b)) = (
            self.rooms.iter().position(|r| r.id == id),
            self.rooms.iter().position(|r| r.id == target),
        ) else {
            return false;
        };
        let z = self.rooms[a].z_index;
        self.rooms[a].z_index = self.rooms[b].z_index;
        self.rooms[b].z_index = z;
        true
    }

    /// Swap the z-index of `id` with that of `target`.
    pub fn reorder_group(&mut self, id: GroupId, target: GroupId) -> bool {
        let (Some(a), Some(b)) = (
            self.groups.iter().position(|g| g.id == id),
            self.groups.iter().position(|g| g.id == target),
        ) else {
            return false;
        };
        let z = self.groups[a].z_index;
        self.groups[a].z_index = self.groups[b].z_index;
        self.groups[b].z_index = z;
        true
    }

    /// Layer tree for display: top-level rooms by descending z-index, then the
    /// `Unassigned` bucket when anything sits outside every room.
    pub fn layer_tree(&self) -> Vec<LayerTreeNode> {
        let index = ParentIndex::build(self);
        let mut roots: Vec<_> = self.rooms.iter().filter(|r| r.parent_room_id.is_none()).collect();
        roots.sort_by_key(|r| std::cmp::Reverse(r.z_index));

        let mut visited = HashSet::new();
        let mut tree = Vec::new();
        for room in roots {
            let node = LayerNode::Room(room.id);
            if visited.insert(node) {
                tree.push(index.subtree(node, &mut visited));
            }
        }
        if !index.children_of(LayerNode::Unassigned).is_empty() {
            visited.insert(LayerNode::Unassigned);
            tree.push(index.subtree(LayerNode::Unassigned, &mut visited));
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, Dimensions, Room, RoomType};
    use kurbo::Point;

    fn chair(plan: &mut FloorPlan) -> FurnitureId {
        plan.add_furniture(FurnitureInstance::new("chair", Point::new(50.0, 50.0), Dimensions::new(40.0, 40.0, 90.0)))
    }

    fn room(plan: &mut FloorPlan) -> RoomId {
        plan.add_room(Room::new("Room", RoomType::Other, Bounds::new(0.0, 0.0, 400.0, 400.0)))
    }

    #[test]
    fn test_create_group_requires_two_items() {
        let mut plan = FloorPlan::new();
        let a = chair(&mut plan);
        assert!(plan.create_group(&[a], None).is_none());
        assert!(plan.create_group(&[a, a], None).is_none());
        assert!(plan.create_group(&[a, uuid::Uuid::new_v4()], None).is_none());
        assert!(plan.groups().is_empty());
    }

    #[test]
    fn test_group_membership_is_exclusive() {
        let mut plan = FloorPlan::new();
        let (a, b, c) = (chair(&mut plan), chair(&mut plan), chair(&mut plan));
        let first = plan.create_group(&[a, b], Some("Dining".into())).unwrap();
        let second = plan.create_group(&[b, c], None).unwrap();

        assert_eq!(plan.get_group_for_item(b).unwrap().id(), second);
        let members: Vec<_> = plan.get_group_members(first).iter().map(|f| f.id()).collect();
        assert_eq!(members, vec![a]);
        plan.validate().unwrap();

        // Taking the last member out removes the group.
        plan.create_group(&[a, c], None).unwrap();
        assert!(plan.get_group_by_id(first).is_none());
    }

    #[test]
    fn test_dissolve_keeps_furniture() {
        let mut plan = FloorPlan::new();
        let (a, b) = (chair(&mut plan), chair(&mut plan));
        let group = plan.create_group(&[a, b], None).unwrap();
        assert!(plan.dissolve_group(group));
        assert_eq!(plan.furniture().len(), 2);
        assert!(plan.get_group_for_item(a).is_none());
        assert!(!plan.dissolve_group(group));
    }

    #[test]
    fn test_nested_groups() {
        let mut plan = FloorPlan::new();
        let (a, b, c, d) = (chair(&mut plan), chair(&mut plan), chair(&mut plan), chair(&mut plan));
        let inner = plan.create_group(&[a, b], None).unwrap();
        let outer = plan.create_group(&[c, d], None).unwrap();
        assert!(plan.reparent_to_group(LayerNode::Group(inner), Some(outer)));
        assert!(!plan.reparent_to_group(LayerNode::Group(outer), Some(inner)));
        assert!(!plan.reparent_to_group(LayerNode::Group(outer), Some(outer)));

        let mut all = plan.collect_group_furniture(outer);
        all.sort();
        let mut expected = vec![a, b, c, d];
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(plan.get_children_of_group(outer)[0], LayerNode::Group(inner));

        plan.dissolve_group(outer);
        assert_eq!(plan.get_group_by_id(inner).unwrap().parent_group_id, None);
    }

    #[test]
    fn test_reparent_furniture_between_groups() {
        let mut plan = FloorPlan::new();
        let (a, b, c, d) = (chair(&mut plan), chair(&mut plan), chair(&mut plan), chair(&mut plan));
        let g1 = plan.create_group(&[a, b], None).unwrap();
        let g2 = plan.create_group(&[c, d], None).unwrap();
        assert!(plan.reparent_to_group(LayerNode::Furniture(a), Some(g2)));
        assert_eq!(plan.get_group_members(g2).len(), 3);
        assert_eq!(plan.get_group_members(g1).len(), 1);
        assert!(plan.reparent_to_group(LayerNode::Furniture(c), None));
        assert!(plan.get_group_for_item(c).is_none());
        plan.validate().unwrap();
    }

    #[test]
    fn test_reparent_room_rejects_cycles() {
        let mut plan = FloorPlan::new();
        let (outer, middle, inner) = (room(&mut plan), room(&mut plan), room(&mut plan));
        assert!(plan.reparent_room(middle, Some(outer)));
        assert!(plan.reparent_room(inner, Some(middle)));

        assert!(!plan.reparent_room(outer, Some(inner)));
        assert!(!plan.reparent_room(outer, Some(outer)));
        assert_eq!(plan.room_descendants(outer), vec![middle, inner]);
        assert_eq!(plan.get_room_by_id(outer).unwrap().contained_room_ids, vec![middle]);

        assert!(plan.reparent_room(inner, Some(outer)));
        assert!(plan.get_room_by_id(middle).unwrap().contained_room_ids.is_empty());
        assert_eq!(plan.get_room_by_id(outer).unwrap().contained_room_ids, vec![middle, inner]);
    }

    #[test]
    fn test_reparent_furniture_syncs_rooms() {
        let mut plan = FloorPlan::new();
        let (r1, r2) = (room(&mut plan), room(&mut plan));
        let item = chair(&mut plan);
        assert!(plan.reparent_furniture(item, Some(r1)));
        assert!(plan.reparent_furniture(item, Some(r2)));
        assert!(plan.get_room_by_id(r1).unwrap().contained_furniture_ids.is_empty());
        assert_eq!(plan.get_room_by_id(r2).unwrap().contained_furniture_ids, vec![item]);
        assert!(!plan.reparent_furniture(item, Some(uuid::Uuid::new_v4())));
    }

    #[test]
    fn test_reorder_swaps_z() {
        let mut plan = FloorPlan::new();
        let (a, b) = (chair(&mut plan), chair(&mut plan));
        assert!(plan.reorder_furniture(a, b));
        assert_eq!(plan.get_furniture_by_id(a).unwrap().z_index, 1);
        assert_eq!(plan.get_furniture_by_id(b).unwrap().z_index, 0);

        let (r1, r2) = (room(&mut plan), room(&mut plan));
        assert!(plan.reorder_room(r2, r1));
        assert_eq!(plan.get_room_by_id(r2).unwrap().z_index, 0);
        assert!(!plan.reorder_group(uuid::Uuid::new_v4(), uuid::Uuid::new_v4()));
    }

    #[test]
    fn test_layer_tree_and_ancestors() {
        let mut plan = FloorPlan::new();
        let kitchen = room(&mut plan);
        let (a, b, loose) = (chair(&mut plan), chair(&mut plan), chair(&mut plan));
        plan.reparent_furniture(a, Some(kitchen));
        plan.reparent_furniture(b, Some(kitchen));
        let group = plan.create_group(&[a, b], None).unwrap();

        let tree = plan.layer_tree();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].node, LayerNode::Room(kitchen));
        assert_eq!(tree[0].children[0].node, LayerNode::Group(group));
        assert_eq!(tree[0].children[0].children.len(), 2);
        assert_eq!(tree[1].node, LayerNode::Unassigned);
        assert_eq!(tree[1].children[0].node, LayerNode::Furniture(loose));

        let index = ParentIndex::build(&plan);
        assert_eq!(
            index.ancestors(LayerNode::Furniture(a)),
            vec![LayerNode::Group(group), LayerNode::Room(kitchen)]
        );
        assert_eq!(index.descendants(LayerNode::Room(kitchen)).len(), 3);
    }
}
