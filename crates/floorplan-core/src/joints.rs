//! Joint resolver: wall endpoints that share a position move together.
//!
//! Joints are never stored; they are recomputed from exact endpoint equality
//! on every query.

use crate::model::{WallEnd, WallId};
use crate::plan::FloorPlan;
use kurbo::Point;

/// A point shared by at least two wall endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub point: Point,
    pub members: Vec<(WallId, WallEnd)>,
}

impl Joint {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

const ENDS: [WallEnd; 2] = [WallEnd::Start, WallEnd::End];

impl FloorPlan {
    /// Move one endpoint of one wall. Other walls are never touched, so this also
    /// detaches the endpoint from any joint it belonged to.
    ///
    /// Returns false if the wall is missing or the move would collapse it.
    pub fn move_wall_endpoint(&mut self, wall_id: WallId, end: WallEnd, position: Point) -> bool {
        let Some(wall) = self.wall_mut(wall_id) else {
            return false;
        };
        let other = match end {
            WallEnd::Start => wall.end,
            WallEnd::End => wall.start,
        };
        if other == position {
            log::warn!("Moving {:?} of wall {} onto its other end", end, wall_id);
            return false;
        }
        wall.set_endpoint(end, position);
        true
    }

    /// Move every wall endpoint located exactly at `from` to `to`.
    ///
    /// All endpoints move or none do: if any wall would end up with `start == end`
    /// the whole move is rejected. Returns the number of endpoints moved.
    pub fn move_wall_joint(&mut self, from: Point, to: Point) -> usize {
        let targets: Vec<(usize, WallEnd)> = self
            .walls
            .iter()
            .enumerate()
            .flat_map(|(index, wall)| {
                ENDS.into_iter()
                    .filter(move |&end| wall.endpoint(end) == from)
                    .map(move |end| (index, end))
            })
            .collect();
        if targets.is_empty() || from == to {
            return 0;
        }

        let collapses = targets.iter().any(|&(index, _)| {
            let wall = &self.walls[index];
            let start = if targets.contains(&(index, WallEnd::Start)) { to } else { wall.start };
            let end = if targets.contains(&(index, WallEnd::End)) { to } else { wall.end };
            start == end
        });
        if collapses {
            log::warn!("Joint move {:?} -> {:?} would collapse a wall; ignored", from, to);
            return 0;
        }

        for &(index, end) in &targets {
            self.walls[index].set_endpoint(end, to);
        }
        log::debug!("Moved joint {:?} -> {:?} ({} endpoints)", from, to, targets.len());
        targets.len()
    }

    /// Number of wall endpoints, across all walls, located exactly at `point`.
    pub fn joint_count(&self, point: Point) -> usize {
        self.walls
            .iter()
            .map(|w| ENDS.iter().filter(|&&end| w.endpoint(end) == point).count())
            .sum()
    }

    /// Whether the given endpoint is shared with at least one other endpoint.
    pub fn endpoint_is_joint(&self, wall_id: WallId, end: WallEnd) -> bool {
        self.get_wall_by_id(wall_id)
            .is_some_and(|wall| self.joint_count(wall.endpoint(end)) >= 2)
    }

    /// `(start_is_joint, end_is_joint)` for a wall.
    pub fn wall_joint_flags(&self, wall_id: WallId) -> (bool, bool) {
        (
            self.endpoint_is_joint(wall_id, WallEnd::Start),
            self.endpoint_is_joint(wall_id, WallEnd::End),
        )
    }

    /// All joints, ordered by the first wall endpoint that reaches them.
    pub fn joints(&self) -> Vec<Joint> {
        let mut joints: Vec<Joint> = Vec::new();
        for wall in &self.walls {
            for end in ENDS {
                let point = wall.endpoint(end);
                match joints.iter_mut().find(|j| j.point == point) {
                    Some(joint) => joint.members.push((wall.id, end)),
                    None => joints.push(Joint { point, members: vec![(wall.id, end)] }),
                }
            }
        }
        joints.retain(|j| j.len() >= 2);
        joints
    }
}
