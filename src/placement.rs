use nalgebra as na;
use std::collections::BTreeMap;

use crate::config::PlacementConfig;
use crate::types::{Plane, PlaneId};

/// Planes currently reported by plane detection.
#[derive(Debug, Clone, Default)]
pub struct PlaneRegistry {
    planes: BTreeMap<PlaneId, Plane>,
}

impl PlaneRegistry {
    pub fn new() -> PlaneRegistry {
        Default::default()
    }

    /// Adds a new plane or replaces the geometry of a known one.
    pub fn upsert(&mut self, plane: Plane) -> Option<Plane> {
        self.planes.insert(plane.id, plane)
    }

    pub fn remove(&mut self, id: PlaneId) -> Option<Plane> {
        self.planes.remove(&id)
    }

    pub fn get(&self, id: PlaneId) -> Option<&Plane> {
        self.planes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.planes.values()
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn clear(&mut self) {
        self.planes.clear();
    }
}

/// Pulls `position` back towards the camera so it is at most `max_distance` away.
pub fn clamp_to_camera_distance(
    position: &na::Point3<f64>,
    camera_position: &na::Point3<f64>,
    max_distance: f64,
) -> na::Point3<f64> {
    let to_position = position - camera_position;
    let distance = to_position.norm();
    if distance > max_distance {
        camera_position + to_position * (max_distance / distance)
    } else {
        *position
    }
}

/// Moves an already placed marker onto `plane` when it hovers just above or below it.
///
/// The marker must lie over the plane's rectangle grown by `snap_tolerance`
/// times the full extent on every side, and its height above the plane must be
/// within `(snap_epsilon, snap_vertical_allowance)`. Returns the snapped world
/// position, or `None` when the marker should stay where it is.
pub fn snap_onto_plane(
    position: &na::Point3<f64>,
    plane: &Plane,
    config: &PlacementConfig,
) -> Option<na::Point3<f64>> {
    let local = plane.world_from_plane.inverse_transform_point(position);
    let margin = plane.half_extent * 2.0 * config.snap_tolerance;
    if !plane.contains_local(&local, margin) {
        return None;
    }
    let height = local.y.abs();
    if height <= config.snap_epsilon || height >= config.snap_vertical_allowance {
        return None;
    }
    let on_plane = na::Point3::new(local.x, 0.0, local.z);
    Some(plane.world_from_plane.transform_point(&on_plane))
}
