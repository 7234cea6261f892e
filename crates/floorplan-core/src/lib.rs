//! Floor-plan editor core
//!
//! Platform-agnostic document model and editing logic: snapping, room connections,
//! wall joints, grouping and undo history. Rendering and UI live elsewhere and drive
//! the [`Editor`] session.

pub mod adjacency;
pub mod camera;
pub mod connections;
pub mod editor;
pub mod hierarchy;
pub mod history;
pub mod joints;
pub mod model;
pub mod plan;
pub mod settings;
pub mod snap;

pub use adjacency::{Adjacency, classify_connection, find_adjacent_rooms};
pub use camera::Camera;
pub use connections::{ConnectionHints, ConnectionSync, ConnectionUpdate, NewConnection};
pub use editor::{DragState, Editor};
pub use hierarchy::{LayerNode, LayerTreeNode, ParentIndex};
pub use history::{HistoryEntry, HistoryManager, MAX_HISTORY_SIZE};
pub use joints::Joint;
pub use plan::{FloorPlan, FloorPlanError};
pub use settings::{EditorSettings, SettingsError};
pub use snap::{
    AlignmentGuide, FurnitureSnapResult, GRID_SIZE, RoomSnapResult, SnapMode, calculate_alignment_guides, snap_room,
    snap_to_grid,
};
