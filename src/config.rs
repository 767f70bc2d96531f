use serde::{Deserialize, Serialize};

use crate::geometry::FeatureCone;

/// Feature point hit test settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureHitConfig {
    pub enabled: bool,
    pub cone_angle_deg: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub max_results: usize,
    /// Fall back to the feature closest to the ray when nothing is in the cone.
    pub closest_point_fallback: bool,
}

impl Default for FeatureHitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cone_angle_deg: 18.0,
            min_distance: 0.2,
            max_distance: 2.0,
            max_results: 1,
            closest_point_fallback: false,
        }
    }
}

impl FeatureHitConfig {
    pub fn cone(&self) -> FeatureCone {
        FeatureCone {
            opening_angle_deg: self.cone_angle_deg,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            max_results: self.max_results,
        }
    }
}

/// Limits that decide whether a two-view triangulation is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoConfig {
    /// Smallest accepted sine of the angle between the two rays.
    pub min_sin_angle: f64,
    /// Largest accepted gap in meters between the two closest points.
    pub max_separation: f64,
    /// Closest points must lie further than this along both rays.
    pub min_depth: f64,
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            min_sin_angle: 1e-3,
            max_separation: 0.25,
            min_depth: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Markers are never anchored further than this from the capturing camera.
    pub max_camera_distance: f64,
    /// Fraction of a plane's full extent added on every side when snapping.
    pub snap_tolerance: f64,
    pub snap_vertical_allowance: f64,
    pub snap_epsilon: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_camera_distance: 10.0,
            snap_tolerance: 0.1,
            snap_vertical_allowance: 0.05,
            snap_epsilon: 0.001,
        }
    }
}

/// When an unresolved job is given up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPolicy {
    pub max_responses: usize,
    pub timeout_secs: u64,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            max_responses: 12,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub feature_hit: FeatureHitConfig,
    pub stereo: StereoConfig,
    pub placement: PlacementConfig,
    pub jobs: JobPolicy,
}
