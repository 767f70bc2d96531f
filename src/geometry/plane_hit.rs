use nalgebra as na;

use super::Ray;

use crate::types::{Plane, PlaneId};

/// Rays whose direction has less than this along a plane's normal are treated
/// as parallel to it.
const PARALLEL_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHit {
    pub plane: PlaneId,
    pub position: na::Point3<f64>,
    /// Distance along the ray.
    pub distance: f64,
}

/// Intersects `ray` with the bounded rectangle of `plane`.
///
/// The test is exact: hits outside `center ± half_extent` are misses.
pub fn hit_test_plane(ray: &Ray, plane: &Plane) -> Option<PlaneHit> {
    let origin = plane.world_from_plane.inverse_transform_point(&ray.origin);
    let direction = plane
        .world_from_plane
        .inverse_transform_vector(&ray.direction.into_inner());

    // Plane normal is local +Y.
    if direction.y.abs() < PARALLEL_EPSILON {
        return None;
    }
    let t = -origin.y / direction.y;
    if !t.is_finite() || t <= 0.0 {
        return None;
    }
    let local_hit = origin + direction * t;
    if !plane.contains_local(&local_hit, na::Vector2::zeros()) {
        return None;
    }
    Some(PlaneHit {
        plane: plane.id,
        position: plane.world_from_plane.transform_point(&local_hit),
        distance: t,
    })
}

/// Returns the nearest in-bounds hit among `planes`.
pub fn hit_test_planes<'a>(
    ray: &Ray,
    planes: impl IntoIterator<Item = &'a Plane>,
) -> Option<PlaneHit> {
    planes
        .into_iter()
        .filter_map(|plane| hit_test_plane(ray, plane))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}
