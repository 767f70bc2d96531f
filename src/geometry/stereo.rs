use nalgebra as na;

use super::Ray;

use crate::config::StereoConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoHit {
    /// Midpoint of the two closest points.
    pub position: na::Point3<f64>,
    pub closest_on_first: na::Point3<f64>,
    pub closest_on_second: na::Point3<f64>,
    pub first_param: f64,
    pub second_param: f64,
    pub separation: f64,
}

/// Closest approach of the lines `A + t·a` and `B + s·b`.
///
/// With `c = B - A`:
///
/// ```text
/// t = (-(a·b)(b·c) + (a·c)(b·b)) / ((a·a)(b·b) - (a·b)²)
/// s = ( (a·b)(a·c) - (b·c)(a·a)) / ((a·a)(b·b) - (a·b)²)
/// ```
///
/// Returns `None` only for exactly parallel lines, where the denominator
/// vanishes; nearly parallel lines give unstable results and should go through
/// [`triangulate`] instead.
pub fn closest_approach(first: &Ray, second: &Ray) -> Option<StereoHit> {
    let a = first.direction.into_inner();
    let b = second.direction.into_inner();
    let c = second.origin - first.origin;

    let aa = a.dot(&a);
    let bb = b.dot(&b);
    let ab = a.dot(&b);
    let ac = a.dot(&c);
    let bc = b.dot(&c);

    let denom = aa * bb - ab * ab;
    if denom <= f64::EPSILON * aa * bb {
        return None;
    }
    let t = (-ab * bc + ac * bb) / denom;
    let s = (ab * ac - bc * aa) / denom;

    let d = first.origin + a * t;
    let e = second.origin + b * s;
    Some(StereoHit {
        position: na::center(&d, &e),
        closest_on_first: d,
        closest_on_second: e,
        first_param: t,
        second_param: s,
        separation: (d - e).norm(),
    })
}

/// Triangulates a point seen along two rays, rejecting untrustworthy geometry.
///
/// A result is refused when the rays are closer to parallel than
/// `min_sin_angle`, when the lines pass further apart than `max_separation`, or
/// when the point is not in front of both ray origins.
pub fn triangulate(first: &Ray, second: &Ray, limits: &StereoConfig) -> Option<StereoHit> {
    let sin_angle = first.direction.cross(second.direction.as_ref()).norm();
    if sin_angle < limits.min_sin_angle {
        log::debug!("rays are too close to parallel (sin {:.2e})", sin_angle);
        return None;
    }
    let hit = closest_approach(first, second)?;
    if !hit.position.coords.iter().all(|v| v.is_finite()) {
        return None;
    }
    if hit.separation > limits.max_separation {
        log::debug!(
            "rays pass {:.3} m apart, rejecting triangulation",
            hit.separation
        );
        return None;
    }
    if hit.first_param <= limits.min_depth || hit.second_param <= limits.min_depth {
        log::debug!(
            "triangulated point is behind a camera (t = {:.3}, s = {:.3})",
            hit.first_param,
            hit.second_param
        );
        return None;
    }
    Some(hit)
}
