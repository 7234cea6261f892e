//! Load a plan from disk, re-derive its connections and describe the result.

use clap::Parser;
use floorplan_core::{ConnectionSync, EditorSettings, FloorPlan, FloorPlanError, SettingsError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid floor plan {path}: {source}")]
    Plan {
        path: PathBuf,
        #[source]
        source: FloorPlanError,
    },
    #[error("invalid settings {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: SettingsError,
    },
    #[error("failed to serialize plan: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "floorplan", about = "Inspect a floor-plan document")]
pub struct Cli {
    /// Plan document (JSON).
    pub plan: PathBuf,

    /// Editor settings (JSON). Defaults apply to missing fields.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write the plan with re-derived connections to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })
}

pub fn load_plan(path: &Path) -> Result<FloorPlan, AppError> {
    FloorPlan::from_json(&read(path)?).map_err(|source| AppError::Plan { path: path.to_path_buf(), source })
}

pub fn load_settings(path: Option<&Path>) -> Result<EditorSettings, AppError> {
    match path {
        Some(path) => EditorSettings::from_json(&read(path)?)
            .map_err(|source| AppError::Settings { path: path.to_path_buf(), source }),
        None => Ok(EditorSettings::default()),
    }
}

/// A synced plan and what the sync changed.
pub struct Report {
    pub plan: FloorPlan,
    pub sync: ConnectionSync,
}

impl Report {
    pub fn build(mut plan: FloorPlan, settings: &EditorSettings) -> Self {
        let sync = plan.sync_all_connections(settings.adjacency_tolerance, settings.min_adjacency_overlap);
        log::info!(
            "Connections synced: {} added, {} removed, {} updated",
            sync.added.len(),
            sync.removed.len(),
            sync.updated.len()
        );
        Self { plan, sync }
    }

    fn room_name(&self, id: floorplan_core::model::RoomId) -> &str {
        self.plan.get_room_by_id(id).map_or("?", |r| r.name.as_str())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = &self.plan;
        writeln!(f, "Floor plan: {} ({})", plan.name, plan.id)?;
        writeln!(
            f,
            "Walls: {}  Rooms: {}  Furniture: {}  Groups: {}",
            plan.walls().len(),
            plan.rooms().len(),
            plan.furniture().len(),
            plan.groups().len()
        )?;
        writeln!(
            f,
            "Sync: {} added, {} removed, {} updated",
            self.sync.added.len(),
            self.sync.removed.len(),
            self.sync.updated.len()
        )?;

        let joints = plan.joints();
        writeln!(f, "Joints: {}", joints.len())?;
        for joint in &joints {
            writeln!(f, "  ({}, {}): {} endpoints", joint.point.x, joint.point.y, joint.len())?;
        }

        writeln!(f, "Connections: {}", plan.connections().len())?;
        for connection in plan.connections() {
            let [a, b] = connection.room_ids;
            let edge = connection.shared_edge;
            writeln!(
                f,
                "  {} <-> {}: {:?} {:?}, edge ({}, {}) -> ({}, {}), {} openings",
                self.room_name(a),
                self.room_name(b),
                connection.connection_type(),
                connection.axis,
                edge.start.x,
                edge.start.y,
                edge.end.x,
                edge.end.y,
                connection.openings().len()
            )?;
        }
        Ok(())
    }
}

pub fn run(cli: &Cli) -> Result<Report, AppError> {
    let settings = load_settings(cli.settings.as_deref())?;
    let plan = load_plan(&cli.plan)?;
    let report = Report::build(plan, &settings);
    if let Some(output) = &cli.output {
        std::fs::write(output, report.plan.to_json()?)
            .map_err(|source| AppError::Io { path: output.clone(), source })?;
        log::info!("Wrote {}", output.display());
    }
    Ok(report)
}
