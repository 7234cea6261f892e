//! Snap functionality: grid snapping, room-to-room alignment and furniture guides.
//!
//! Everything here is a pure function of the proposed geometry and the current
//! entities; nothing mutates the plan.

use crate::model::{Axis, Bounds, FurnitureId, FurnitureInstance, Room, RoomId};
use kurbo::{Line, Point, Rect, Vec2};

/// Default grid size for snapping, in centimeters.
pub const GRID_SIZE: f64 = 10.0;

/// Default alignment threshold in screen pixels. Divide by zoom for world units.
pub const SNAP_THRESHOLD_PX: f64 = 10.0;

/// Extra length added to both ends of a furniture guide line.
pub const GUIDE_MARGIN: f64 = 20.0;

/// Snap mode for aligning rooms and furniture to the grid or to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapMode {
    /// No snapping.
    None,
    /// Snap to grid intersections.
    Grid,
    /// Snap to other entities' edges and centers.
    Shapes,
    /// Grid first, then entity alignment overrides per axis.
    #[default]
    All,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Grid,
            SnapMode::Grid => SnapMode::Shapes,
            SnapMode::Shapes => SnapMode::All,
            SnapMode::All => SnapMode::None,
        }
    }

    /// Check if grid snapping applies.
    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    /// Check if alignment snapping applies.
    pub fn snaps_to_shapes(self) -> bool {
        matches!(self, SnapMode::Shapes | SnapMode::All)
    }

    /// Check if any snapping applies.
    pub fn is_enabled(self) -> bool {
        self != SnapMode::None
    }
}

/// Round a single coordinate to the grid.
pub fn snap_value(value: f64, grid_size: f64) -> f64 {
    if grid_size <= 0.0 {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(snap_value(point.x, grid_size), snap_value(point.y, grid_size))
}

/// A transient alignment line shown while dragging.
///
/// A vertical guide has constant x (`position`) and spans `start..end` in y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentGuide {
    pub axis: Axis,
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

impl AlignmentGuide {
    /// The guide as a line in plan coordinates.
    pub fn line(&self) -> Line {
        match self.axis {
            Axis::Vertical => Line::new((self.position, self.start), (self.position, self.end)),
            Axis::Horizontal => Line::new((self.start, self.position), (self.end, self.position)),
        }
    }
}

/// Reference line on one axis of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Min,
    Max,
    Center,
}

impl Anchor {
    fn on(self, span: (f64, f64)) -> f64 {
        match self {
            Anchor::Min => span.0,
            Anchor::Max => span.1,
            Anchor::Center => (span.0 + span.1) / 2.0,
        }
    }
}

/// Room candidates in enumeration order: left-left, right-right, left-right,
/// right-left, center-center (top/bottom on the y axis).
const ROOM_ALIGNMENTS: [(Anchor, Anchor); 5] = [
    (Anchor::Min, Anchor::Min),
    (Anchor::Max, Anchor::Max),
    (Anchor::Min, Anchor::Max),
    (Anchor::Max, Anchor::Min),
    (Anchor::Center, Anchor::Center),
];

/// Furniture candidates: each of the dragged box's left/right/center against
/// the other box's left/right/center.
const FURNITURE_ALIGNMENTS: [(Anchor, Anchor); 9] = [
    (Anchor::Min, Anchor::Min),
    (Anchor::Min, Anchor::Max),
    (Anchor::Min, Anchor::Center),
    (Anchor::Max, Anchor::Min),
    (Anchor::Max, Anchor::Max),
    (Anchor::Max, Anchor::Center),
    (Anchor::Center, Anchor::Min),
    (Anchor::Center, Anchor::Max),
    (Anchor::Center, Anchor::Center),
];

/// First candidate closer than `threshold`, as (offset to apply, aligned line).
fn first_alignment(
    moving: (f64, f64),
    other: (f64, f64),
    candidates: &[(Anchor, Anchor)],
    threshold: f64,
) -> Option<(f64, f64)> {
    candidates.iter().find_map(|&(mine, theirs)| {
        let line = theirs.on(other);
        let offset = line - mine.on(moving);
        (offset.abs() < threshold).then_some((offset, line))
    })
}

fn x_span(rect: Rect) -> (f64, f64) {
    (rect.x0, rect.x1)
}

fn y_span(rect: Rect) -> (f64, f64) {
    (rect.y0, rect.y1)
}

/// Result of snapping a dragged room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapResult {
    pub bounds: Bounds,
    pub guides: Vec<AlignmentGuide>,
    /// Whether an alignment (not the grid) fixed the x coordinate.
    pub snapped_x: bool,
    /// Whether an alignment (not the grid) fixed the y coordinate.
    pub snapped_y: bool,
}

/// Snap a room's proposed bounds against the grid and every other room.
///
/// Distances are measured from the proposed (unsnapped) bounds. On each axis the
/// first qualifying candidate in enumeration order wins and overrides the grid.
/// `threshold` is in world units. Rooms in `exclude` are never snap targets.
pub fn snap_room(
    proposed: Bounds,
    rooms: &[Room],
    exclude: &[RoomId],
    threshold: f64,
    grid_size: f64,
    mode: SnapMode,
) -> RoomSnapResult {
    let mut bounds = proposed;
    if mode.snaps_to_grid() {
        bounds.x = snap_value(proposed.x, grid_size);
        bounds.y = snap_value(proposed.y, grid_size);
    }
    if !mode.snaps_to_shapes() {
        return RoomSnapResult { bounds, guides: Vec::new(), snapped_x: false, snapped_y: false };
    }

    let rect = proposed.to_rect();
    let mut align_x: Option<(f64, f64, Rect)> = None;
    let mut align_y: Option<(f64, f64, Rect)> = None;
    for room in rooms.iter().filter(|r| !exclude.contains(&r.id())) {
        let other = room.bounds().to_rect();
        if align_x.is_none() {
            align_x = first_alignment(x_span(rect), x_span(other), &ROOM_ALIGNMENTS, threshold)
                .map(|(offset, line)| (offset, line, other));
        }
        if align_y.is_none() {
            align_y = first_alignment(y_span(rect), y_span(other), &ROOM_ALIGNMENTS, threshold)
                .map(|(offset, line)| (offset, line, other));
        }
        if align_x.is_some() && align_y.is_some() {
            break;
        }
    }

    if let Some((offset, _, _)) = align_x {
        bounds.x = proposed.x + offset;
    }
    if let Some((offset, _, _)) = align_y {
        bounds.y = proposed.y + offset;
    }

    let snapped = bounds.to_rect();
    let mut guides = Vec::new();
    if let Some((_, line, other)) = align_x {
        guides.push(AlignmentGuide {
            axis: Axis::Vertical,
            position: line,
            start: snapped.y0.min(other.y0),
            end: snapped.y1.max(other.y1),
        });
    }
    if let Some((_, line, other)) = align_y {
        guides.push(AlignmentGuide {
            axis: Axis::Horizontal,
            position: line,
            start: snapped.x0.min(other.x0),
            end: snapped.x1.max(other.x1),
        });
    }

    log::trace!("Room snap {:?} -> {:?} ({} guides)", proposed, bounds, guides.len());
    RoomSnapResult {
        bounds,
        guides,
        snapped_x: align_x.is_some(),
        snapped_y: align_y.is_some(),
    }
}

/// Result of aligning a dragged furniture item.
#[derive(Debug, Clone, PartialEq)]
pub struct FurnitureSnapResult {
    /// Correction to add to the proposed center.
    pub delta: Vec2,
    pub guides: Vec<AlignmentGuide>,
}

impl FurnitureSnapResult {
    /// No correction and no guides.
    pub fn none() -> Self {
        Self { delta: Vec2::ZERO, guides: Vec::new() }
    }

    /// Check if any alignment was found.
    pub fn is_snapped(&self) -> bool {
        !self.guides.is_empty()
    }
}

/// Compute alignment guides for `moving` placed at `proposed_center`.
///
/// Bounding boxes are the rotated footprints around each item's center. The
/// first qualifying offset per axis is kept; guides span both items plus `margin`.
pub fn calculate_alignment_guides(
    moving: &FurnitureInstance,
    proposed_center: Point,
    furniture: &[FurnitureInstance],
    exclude: &[FurnitureId],
    threshold: f64,
    margin: f64,
) -> FurnitureSnapResult {
    let rect = moving.footprint_at(proposed_center);
    let mut align_x: Option<(f64, f64, Rect)> = None;
    let mut align_y: Option<(f64, f64, Rect)> = None;

    for item in furniture
        .iter()
        .filter(|f| f.id() != moving.id() && !exclude.contains(&f.id()))
    {
        let other = item.footprint();
        if align_x.is_none() {
            align_x = first_alignment(x_span(rect), x_span(other), &FURNITURE_ALIGNMENTS, threshold)
                .map(|(offset, line)| (offset, line, other));
        }
        if align_y.is_none() {
            align_y = first_alignment(y_span(rect), y_span(other), &FURNITURE_ALIGNMENTS, threshold)
                .map(|(offset, line)| (offset, line, other));
        }
        if align_x.is_some() && align_y.is_some() {
            break;
        }
    }

    let delta = Vec2::new(
        align_x.map_or(0.0, |(offset, _, _)| offset),
        align_y.map_or(0.0, |(offset, _, _)| offset),
    );
    let snapped = rect + delta;
    let mut guides = Vec::new();
    if let Some((_, line, other)) = align_x {
        guides.push(AlignmentGuide {
            axis: Axis::Vertical,
            position: line,
            start: snapped.y0.min(other.y0) - margin,
            end: snapped.y1.max(other.y1) + margin,
        });
    }
    if let Some((_, line, other)) = align_y {
        guides.push(AlignmentGuide {
            axis: Axis::Horizontal,
            position: line,
            start: snapped.x0.min(other.x0) - margin,
            end: snapped.x1.max(other.x1) + margin,
        });
    }
    FurnitureSnapResult { delta, guides }
}
