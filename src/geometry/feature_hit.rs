use nalgebra as na;
use rayon::prelude::*;

use super::Ray;

/// Search cone around a ray for the feature point hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureCone {
    /// Full opening angle of the cone; capped at 360 degrees.
    pub opening_angle_deg: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub max_results: usize,
}

impl Default for FeatureCone {
    fn default() -> Self {
        Self {
            opening_angle_deg: 18.0,
            min_distance: 0.0,
            max_distance: f64::MAX,
            max_results: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureHit {
    /// Projection of the feature onto the ray.
    pub position: na::Point3<f64>,
    pub distance_to_ray_origin: f64,
    pub feature: na::Point3<f64>,
    pub feature_distance_to_ray: f64,
}

impl FeatureHit {
    fn from_feature(ray: &Ray, feature: &na::Point3<f64>) -> FeatureHit {
        let t = ray.projection_param(feature);
        let position = ray.at(t);
        FeatureHit {
            position,
            distance_to_ray_origin: (position - ray.origin).norm(),
            feature: *feature,
            feature_distance_to_ray: ray.distance_to_line(feature),
        }
    }
}

/// Finds feature points inside the cone around `ray`, nearest first.
///
/// At most `cone.max_results` hits are returned, sorted by the distance of
/// their projection from the ray origin.
pub fn hit_test_features(
    ray: &Ray,
    features: &[na::Point3<f64>],
    cone: &FeatureCone,
) -> Vec<FeatureHit> {
    let max_angle = (cone.opening_angle_deg.min(360.0) / 2.0).to_radians();
    let mut hits: Vec<FeatureHit> = features
        .par_iter()
        .filter_map(|feature| {
            let hit = FeatureHit::from_feature(ray, feature);
            if hit.distance_to_ray_origin < cone.min_distance
                || hit.distance_to_ray_origin > cone.max_distance
            {
                return None;
            }
            let to_feature = na::Unit::try_new(feature - ray.origin, 1e-12)?;
            let angle = ray.direction.dot(to_feature.as_ref()).clamp(-1.0, 1.0).acos();
            if angle > max_angle {
                return None;
            }
            Some(hit)
        })
        .collect();
    hits.sort_by(|a, b| {
        a.distance_to_ray_origin
            .total_cmp(&b.distance_to_ray_origin)
    });
    hits.truncate(cone.max_results);
    hits
}

/// Picks the feature closest to the ray's line and projects it onto the ray.
///
/// Only features in front of the ray origin are considered.
pub fn closest_feature_hit(ray: &Ray, features: &[na::Point3<f64>]) -> Option<FeatureHit> {
    features
        .iter()
        .filter(|feature| ray.projection_param(feature) > 0.0)
        .map(|feature| (ray.distance_to_line(feature), feature))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, feature)| FeatureHit::from_feature(ray, feature))
}
