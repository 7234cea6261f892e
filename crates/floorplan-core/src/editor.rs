//! Editing session: one open plan with its selection, view, settings and history.

use crate::adjacency::{classify_connection, find_adjacent_rooms};
use crate::camera::Camera;
use crate::connections::{ConnectionHints, ConnectionSync, ConnectionUpdate, NewConnection};
use crate::hierarchy::LayerNode;
use crate::history::{HistoryEntry, HistoryManager, Instant};
use crate::model::{
    Axis, Bounds, ConnectionId, Dimensions, EntityId, EntityKind, FurnitureId, GroupId, OpeningId, RoomId, Selection,
    WallEnd, WallId,
};
use crate::plan::FloorPlan;
use crate::settings::EditorSettings;
use crate::snap::{
    AlignmentGuide, FurnitureSnapResult, RoomSnapResult, calculate_alignment_guides, snap_room, snap_to_grid,
};
use kurbo::{Point, Vec2};
use std::collections::HashMap;

/// Gesture in progress. History recording is suspended while one is active.
#[derive(Debug, Clone)]
pub enum DragState {
    Room {
        room_id: RoomId,
        /// Bounds at drag start, restored on cancel.
        origin: Bounds,
        /// Connection types classified during the last drag frame.
        hints: ConnectionHints,
        guides: Vec<AlignmentGuide>,
    },
    Furniture {
        /// Item whose bounding box drives alignment.
        anchor: FurnitureId,
        origins: HashMap<FurnitureId, Point>,
        guides: Vec<AlignmentGuide>,
    },
}

impl DragState {
    /// Guides to draw for the current drag frame.
    pub fn guides(&self) -> &[AlignmentGuide] {
        match self {
            DragState::Room { guides, .. } | DragState::Furniture { guides, .. } => guides,
        }
    }
}

#[derive(Debug)]
pub struct Editor {
    plan: FloorPlan,
    selection: Selection,
    camera: Camera,
    settings: EditorSettings,
    history: HistoryManager,
    drag: Option<DragState>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_plan(FloorPlan::new(), settings)
    }

    /// Open an existing plan. Its current state becomes the history baseline.
    pub fn with_plan(plan: FloorPlan, settings: EditorSettings) -> Self {
        let settings = settings.validated();
        let history = HistoryManager::new(settings.history_limit, settings.selection_debounce());
        let mut editor = Self {
            plan,
            selection: Selection::new(),
            camera: Camera::new(),
            settings,
            history,
            drag: None,
        };
        editor.observe(Instant::now());
        editor
    }

    /// The open document.
    pub fn plan(&self) -> &FloorPlan {
        &self.plan
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access for pan and zoom.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn drag_state(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Check if a room or furniture drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Drop selected ids that no longer exist, then let history see the state.
    fn observe(&mut self, now: Instant) -> bool {
        let plan = &self.plan;
        self.selection.retain(|&id| plan.contains(id));
        self.history.observe(&self.plan, &self.selection, now)
    }

    /// Apply an arbitrary mutation and record it.
    pub fn edit<R>(&mut self, mutate: impl FnOnce(&mut FloorPlan) -> R) -> R {
        let result = mutate(&mut self.plan);
        self.observe(Instant::now());
        result
    }

    /// Restore a history entry. History already points at it, so nothing is recorded.
    fn replace(&mut self, entry: HistoryEntry) {
        if self.drag.take().is_some() {
            self.history.end_gesture();
        }
        self.plan = entry.plan;
        self.selection = entry.selection;
    }

    // --- selection ---

    pub fn select(&mut self, id: EntityId) {
        self.selection.select(id);
        self.observe(Instant::now());
    }

    pub fn add_to_selection(&mut self, id: EntityId) {
        self.selection.add(id);
        self.observe(Instant::now());
    }

    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.selection = Selection::from_ids(ids);
        self.observe(Instant::now());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.observe(Instant::now());
    }

    /// Commit a settled selection change whose debounce window has elapsed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        self.history.poll(&self.plan, &self.selection, now)
    }

    // --- history ---

    /// Restore the previous state. Any active drag is abandoned.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.plan, &self.selection) {
            Some(entry) => {
                self.replace(entry);
                true
            }
            None => false,
        }
    }

    /// Reapply the last undone state. Any active drag is abandoned.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.plan, &self.selection) {
            Some(entry) => {
                self.replace(entry);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Forget all undo steps; the current state becomes the new baseline.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.observe(Instant::now());
    }

    /// Replace the whole document, e.g. after loading from storage.
    pub fn load_floor_plan(&mut self, plan: FloorPlan) {
        self.drag = None;
        self.plan = plan;
        self.selection.clear();
        self.history.clear();
        self.history.end_gesture();
        self.observe(Instant::now());
        log::info!("Loaded floor plan '{}' ({} rooms)", self.plan.name, self.plan.rooms().len());
    }

    // --- room drag ---

    /// Start dragging a room. Fails if the room is missing or another drag is active.
    pub fn begin_room_drag(&mut self, room_id: RoomId) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let Some(room) = self.plan.get_room_by_id(room_id) else {
            return false;
        };
        self.drag = Some(DragState::Room {
            room_id,
            origin: room.bounds(),
            hints: ConnectionHints::new(),
            guides: Vec::new(),
        });
        self.history.begin_gesture();
        true
    }

    /// Move the dragged room toward `proposed_origin` (top-left corner), snapped.
    pub fn drag_room(&mut self, proposed_origin: Point) -> Option<RoomSnapResult> {
        let Some(DragState::Room { room_id, .. }) = self.drag else {
            return None;
        };
        let bounds = self.plan.get_room_by_id(room_id)?.bounds();
        let mut moving = self.plan.room_descendants(room_id);
        moving.push(room_id);
        let result = snap_room(
            bounds.with_origin(proposed_origin),
            self.plan.rooms(),
            &moving,
            self.camera.world_threshold(self.settings.snap_threshold_px),
            self.settings.grid_size,
            self.settings.snap_mode,
        );
        self.plan.move_room_to(room_id, result.bounds.origin());

        let new_hints = if self.settings.classify_connections_on_drop {
            self.classify_neighbours(room_id)
        } else {
            ConnectionHints::new()
        };
        if let Some(DragState::Room { hints, guides, .. }) = &mut self.drag {
            *hints = new_hints;
            guides.clone_from(&result.guides);
        }
        Some(result)
    }

    fn classify_neighbours(&self, room_id: RoomId) -> ConnectionHints {
        let Some(room) = self.plan.get_room_by_id(room_id) else {
            return ConnectionHints::new();
        };
        let tolerance = self.settings.adjacency_tolerance;
        find_adjacent_rooms(
            &room.bounds(),
            self.plan.rooms(),
            room_id,
            tolerance,
            self.settings.min_adjacency_overlap,
        )
        .iter()
        .filter_map(|adjacency| {
            let other = self.plan.get_room_by_id(adjacency.room_id)?;
            let kind = classify_connection(room, other, adjacency, self.plan.walls(), tolerance);
            Some((adjacency.room_id, kind))
        })
        .collect()
    }

    /// Drop the dragged room: re-derive its connections and record one history step.
    pub fn end_room_drag(&mut self) -> Option<ConnectionSync> {
        let Some(DragState::Room { room_id, hints, .. }) = self.drag.take() else {
            return None;
        };
        let sync = self.plan.finish_room_move(
            room_id,
            &hints,
            self.settings.adjacency_tolerance,
            self.settings.min_adjacency_overlap,
        );
        self.history.end_gesture();
        self.observe(Instant::now());
        Some(sync)
    }

    // --- furniture drag ---

    /// Start dragging items. Grouped items bring their whole group; locked items stay.
    pub fn begin_furniture_drag(&mut self, ids: &[FurnitureId]) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let mut origins = HashMap::new();
        let mut anchor = None;
        for &id in ids {
            let members = match self.plan.get_group_for_item(id) {
                Some(group) => self.plan.collect_group_furniture(group.id()),
                None => vec![id],
            };
            for member in members {
                let Some(item) = self.plan.get_furniture_by_id(member) else {
                    continue;
                };
                if item.locked {
                    continue;
                }
                anchor.get_or_insert(member);
                origins.insert(member, item.position);
            }
        }
        let Some(anchor) = anchor else {
            return false;
        };
        self.drag = Some(DragState::Furniture { anchor, origins, guides: Vec::new() });
        self.history.begin_gesture();
        true
    }

    /// Offset the dragged items by `delta` from where the drag started, snapped.
    pub fn drag_furniture(&mut self, delta: Vec2) -> Option<FurnitureSnapResult> {
        let Some(DragState::Furniture { anchor, origins, .. }) = &self.drag else {
            return None;
        };
        let anchor_item = self.plan.get_furniture_by_id(*anchor)?;
        let start = *origins.get(anchor)?;
        let proposed = start + delta;

        let mode = self.settings.snap_mode;
        let mut target = if mode.snaps_to_grid() {
            snap_to_grid(proposed, self.settings.grid_size)
        } else {
            proposed
        };
        let result = if mode.snaps_to_shapes() {
            let moving: Vec<FurnitureId> = origins.keys().copied().collect();
            calculate_alignment_guides(
                anchor_item,
                proposed,
                self.plan.furniture(),
                &moving,
                self.camera.world_threshold(self.settings.snap_threshold_px),
                self.settings.guide_margin,
            )
        } else {
            FurnitureSnapResult::none()
        };
        for guide in &result.guides {
            match guide.axis {
                Axis::Vertical => target.x = proposed.x + result.delta.x,
                Axis::Horizontal => target.y = proposed.y + result.delta.y,
            }
        }

        let offset = target - start;
        let moves: Vec<(FurnitureId, Point)> = origins.iter().map(|(&id, &origin)| (id, origin + offset)).collect();
        for (id, position) in moves {
            self.plan.move_furniture(id, position);
        }
        if let Some(DragState::Furniture { guides, .. }) = &mut self.drag {
            guides.clone_from(&result.guides);
        }
        Some(result)
    }

    /// Drop the dragged items. Each one is re-parented to the topmost room under its center.
    pub fn end_furniture_drag(&mut self) -> bool {
        let Some(DragState::Furniture { origins, .. }) = self.drag.take() else {
            return false;
        };
        for &id in origins.keys() {
            let Some(center) = self.plan.get_furniture_by_id(id).map(|f| f.position) else {
                continue;
            };
            let room = self.room_at(center);
            self.plan.reparent_furniture(id, room);
        }
        self.history.end_gesture();
        self.observe(Instant::now());
        true
    }

    fn room_at(&self, point: Point) -> Option<RoomId> {
        self.plan
            .rooms()
            .iter()
            .filter(|r| r.bounds().to_rect().contains(point))
            .max_by_key(|r| r.z_index)
            .map(|r| r.id())
    }

    /// Abort the active drag and put everything back where it started.
    pub fn cancel_drag(&mut self) {
        match self.drag.take() {
            Some(DragState::Room { room_id, origin, .. }) => {
                self.plan.move_room_to(room_id, origin.origin());
            }
            Some(DragState::Furniture { origins, .. }) => {
                for (id, position) in origins {
                    self.plan.move_furniture(id, position);
                }
            }
            None => return,
        }
        self.history.end_gesture();
        self.observe(Instant::now());
    }

    // --- document mutations ---

    pub fn move_furniture(&mut self, id: FurnitureId, position: Point) -> bool {
        self.edit(|plan| plan.move_furniture(id, position))
    }

    pub fn resize_furniture(&mut self, id: FurnitureId, dimensions: Dimensions) -> bool {
        self.edit(|plan| plan.resize_furniture(id, dimensions))
    }

    pub fn rotate_furniture(&mut self, id: FurnitureId, delta_degrees: f64) -> bool {
        self.edit(|plan| plan.rotate_furniture(id, delta_degrees))
    }

    pub fn move_multiple_furniture(&mut self, ids: &[FurnitureId], delta: Vec2) -> usize {
        self.edit(|plan| plan.move_multiple_furniture(ids, delta))
    }

    pub fn duplicate_multiple(&mut self, ids: &[FurnitureId], offset: Vec2) -> Vec<FurnitureId> {
        self.edit(|plan| plan.duplicate_multiple(ids, offset))
    }

    /// Duplicate the selected furniture (whole groups for selected groups) and
    /// select the copies.
    pub fn duplicate_selected(&mut self, offset: Vec2) -> Vec<FurnitureId> {
        let mut ids = Vec::new();
        for &id in self.selection.ids() {
            match self.plan.entity_kind(id) {
                Some(EntityKind::Furniture) => ids.push(id),
                Some(EntityKind::Group) => ids.extend(self.plan.collect_group_furniture(id)),
                _ => {}
            }
        }
        let created = self.plan.duplicate_multiple(&ids, offset);
        if !created.is_empty() {
            self.selection = Selection::from_ids(created.iter().copied());
        }
        self.observe(Instant::now());
        created
    }

    pub fn move_wall_endpoint(&mut self, wall_id: WallId, end: WallEnd, position: Point) -> bool {
        self.edit(|plan| plan.move_wall_endpoint(wall_id, end, position))
    }

    pub fn move_wall_joint(&mut self, from: Point, to: Point) -> usize {
        self.edit(|plan| plan.move_wall_joint(from, to))
    }

    /// Move a room (with its contents) and settle its connections.
    pub fn move_room_to(&mut self, room_id: RoomId, origin: Point) -> bool {
        let (tolerance, min_overlap) = (self.settings.adjacency_tolerance, self.settings.min_adjacency_overlap);
        self.edit(|plan| {
            let moved = plan.move_room_to(room_id, origin);
            if moved {
                plan.finish_room_move(room_id, &ConnectionHints::new(), tolerance, min_overlap);
            }
            moved
        })
    }

    /// Resize a room and settle its connections.
    pub fn resize_room(&mut self, room_id: RoomId, bounds: Bounds) -> bool {
        let (tolerance, min_overlap) = (self.settings.adjacency_tolerance, self.settings.min_adjacency_overlap);
        self.edit(|plan| {
            let resized = plan.resize_room(room_id, bounds);
            if resized {
                plan.sync_room_connections(room_id, &ConnectionHints::new(), tolerance, min_overlap);
            }
            resized
        })
    }

    pub fn finish_room_move(&mut self, room_id: RoomId, hints: &ConnectionHints) -> ConnectionSync {
        let (tolerance, min_overlap) = (self.settings.adjacency_tolerance, self.settings.min_adjacency_overlap);
        self.edit(|plan| plan.finish_room_move(room_id, hints, tolerance, min_overlap))
    }

    pub fn add_room_connection(&mut self, request: NewConnection) -> Option<ConnectionId> {
        self.edit(|plan| plan.add_room_connection(request))
    }

    pub fn remove_room_connection(&mut self, id: ConnectionId) -> bool {
        self.edit(|plan| plan.remove_room_connection(id).is_some())
    }

    pub fn update_room_connection(&mut self, id: ConnectionId, update: ConnectionUpdate) -> bool {
        self.edit(|plan| plan.update_room_connection(id, update))
    }

    pub fn add_connection_opening(&mut self, id: ConnectionId, position: f64, width: f64) -> Option<OpeningId> {
        self.edit(|plan| plan.add_connection_opening(id, position, width))
    }

    pub fn remove_connection_opening(&mut self, id: ConnectionId, opening_id: OpeningId) -> bool {
        self.edit(|plan| plan.remove_connection_opening(id, opening_id))
    }

    pub fn create_group(&mut self, ids: &[FurnitureId], name: Option<String>) -> Option<GroupId> {
        self.edit(|plan| plan.create_group(ids, name))
    }

    pub fn dissolve_group(&mut self, group_id: GroupId) -> bool {
        self.edit(|plan| plan.dissolve_group(group_id))
    }

    pub fn reparent_to_group(&mut self, node: LayerNode, target: Option<GroupId>) -> bool {
        self.edit(|plan| plan.reparent_to_group(node, target))
    }

    pub fn reparent_furniture(&mut self, id: FurnitureId, room: Option<RoomId>) -> bool {
        self.edit(|plan| plan.reparent_furniture(id, room))
    }

    pub fn reparent_room(&mut self, id: RoomId, parent: Option<RoomId>) -> bool {
        self.edit(|plan| plan.reparent_room(id, parent))
    }

    pub fn reorder_furniture(&mut self, id: FurnitureId, target: FurnitureId) -> bool {
        self.edit(|plan| plan.reorder_furniture(id, target))
    }

    pub fn reorder_room(&mut self, id: RoomId, target: RoomId) -> bool {
        self.edit(|plan| plan.reorder_room(id, target))
    }

    pub fn reorder_group(&mut self, id: GroupId, target: GroupId) -> bool {
        self.edit(|plan| plan.reorder_group(id, target))
    }

    /// Remove every selected entity, cascading per kind, and clear the selection.
    pub fn remove_selected(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        let removed = self.plan.remove_entities(&ids);
        self.selection.clear();
        self.observe(Instant::now());
        removed
    }
}
