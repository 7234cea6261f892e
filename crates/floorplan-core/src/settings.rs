//! Editor configuration.

use crate::adjacency::{ADJACENCY_TOLERANCE, MIN_ADJACENCY_OVERLAP};
use crate::history::{MAX_HISTORY_SIZE, SELECTION_DEBOUNCE_MS};
use crate::snap::{GRID_SIZE, GUIDE_MARGIN, SNAP_THRESHOLD_PX, SnapMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables of the editing core. Every field has a default, so partial JSON works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Grid resolution in centimeters.
    pub grid_size: f64,
    pub snap_mode: SnapMode,
    /// Alignment threshold in screen pixels.
    pub snap_threshold_px: f64,
    /// Edge distance within which rooms count as touching, in centimeters.
    pub adjacency_tolerance: f64,
    /// Minimum shared edge length for two rooms to be adjacent.
    pub min_adjacency_overlap: f64,
    /// Extra length on both ends of furniture guides.
    pub guide_margin: f64,
    /// Maximum number of undo steps kept.
    pub history_limit: usize,
    /// Quiet period before a selection change becomes an undo step.
    pub selection_debounce_ms: u64,
    /// Use the drag-time wall/direct classification when creating connections on drop.
    /// When off, new connections are always wall-type.
    pub classify_connections_on_drop: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_mode: SnapMode::default(),
            snap_threshold_px: SNAP_THRESHOLD_PX,
            adjacency_tolerance: ADJACENCY_TOLERANCE,
            min_adjacency_overlap: MIN_ADJACENCY_OVERLAP,
            guide_margin: GUIDE_MARGIN,
            history_limit: MAX_HISTORY_SIZE,
            selection_debounce_ms: SELECTION_DEBOUNCE_MS,
            classify_connections_on_drop: false,
        }
    }
}

impl EditorSettings {
    /// Parse settings from JSON and sanitize them.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.validated())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replace negative or non-finite values with defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        let sane = |value: f64, fallback: f64| if value.is_finite() && value >= 0.0 { value } else { fallback };
        self.grid_size = sane(self.grid_size, defaults.grid_size);
        self.snap_threshold_px = sane(self.snap_threshold_px, defaults.snap_threshold_px);
        self.adjacency_tolerance = sane(self.adjacency_tolerance, defaults.adjacency_tolerance);
        self.min_adjacency_overlap = sane(self.min_adjacency_overlap, defaults.min_adjacency_overlap);
        self.guide_margin = sane(self.guide_margin, defaults.guide_margin);
        if self.history_limit == 0 {
            log::warn!("history_limit of 0 disables undo; using {}", defaults.history_limit);
            self.history_limit = defaults.history_limit;
        }
        self
    }

    pub fn selection_debounce(&self) -> Duration {
        Duration::from_millis(self.selection_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = EditorSettings::from_json(r#"{ "grid_size": 25.0, "snap_mode": "grid" }"#).unwrap();
        assert_eq!(settings.grid_size, 25.0);
        assert_eq!(settings.snap_mode, SnapMode::Grid);
        assert_eq!(settings.history_limit, MAX_HISTORY_SIZE);
        assert_eq!(settings.selection_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_invalid_values_replaced() {
        let settings = EditorSettings::from_json(r#"{ "grid_size": -5.0, "history_limit": 0 }"#).unwrap();
        assert_eq!(settings.grid_size, GRID_SIZE);
        assert_eq!(settings.history_limit, MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(EditorSettings::from_json("[1, 2"), Err(SettingsError::Parse(_))));
    }
}
