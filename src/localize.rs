//! Resolution of annotations into world positions.
//!
//! A single annotation is tried against the planes first and then, when
//! enabled, against the frame's feature cloud. Two annotations from different
//! frames can be triangulated.

use nalgebra as na;

use crate::config::LocatorConfig;
use crate::geometry::{
    ViewProjection, closest_feature_hit, hit_test_features, hit_test_planes, ray_from_pixel,
    triangulate,
};
use crate::placement::PlaneRegistry;
use crate::types::{CameraFrame, Localization, Response};

/// Read-only view of the scene a resolution runs against.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub view: &'a ViewProjection,
    pub planes: &'a PlaneRegistry,
    pub config: &'a LocatorConfig,
}

/// A successful resolution together with the camera pose it was made from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub localization: Localization,
    pub camera_to_world: na::Matrix4<f64>,
}

impl Resolution {
    pub fn position(&self) -> Option<na::Point3<f64>> {
        self.localization.position()
    }
}

/// Localizes one annotation on the frame it was marked on.
pub fn localize_single(response: &Response, frame: &CameraFrame, scene: &Scene) -> Localization {
    let Some(ray) = ray_from_pixel(response.pixel, scene.view, frame) else {
        return Localization::NoHit;
    };

    if let Some(hit) = hit_test_planes(&ray, scene.planes.iter()) {
        log::debug!("annotation on {} hit plane {:?}", response.image, hit.plane);
        return Localization::PlaneHit {
            position: hit.position,
            plane: hit.plane,
        };
    }

    let feature_config = &scene.config.feature_hit;
    if !feature_config.enabled {
        return Localization::NoHit;
    }
    let Some(features) = frame.feature_points.as_deref() else {
        return Localization::NoHit;
    };
    if let Some(hit) = hit_test_features(&ray, features, &feature_config.cone()).first() {
        log::debug!("annotation on {} hit a feature point", response.image);
        return Localization::FeatureHit {
            position: hit.position,
        };
    }
    if feature_config.closest_point_fallback {
        if let Some(hit) = closest_feature_hit(&ray, features) {
            log::debug!(
                "annotation on {} fell back to a feature {:.3} m off the ray",
                response.image,
                hit.feature_distance_to_ray
            );
            return Localization::FeatureHit {
                position: hit.position,
            };
        }
    }
    Localization::NoHit
}

/// Triangulates two annotations marked on two different frames.
pub fn localize_stereo(
    first: (&Response, &CameraFrame),
    second: (&Response, &CameraFrame),
    scene: &Scene,
) -> Localization {
    let (Some(ray1), Some(ray2)) = (
        ray_from_pixel(first.0.pixel, scene.view, first.1),
        ray_from_pixel(second.0.pixel, scene.view, second.1),
    ) else {
        return Localization::NoHit;
    };
    match triangulate(&ray1, &ray2, &scene.config.stereo) {
        Some(hit) => Localization::StereoHit {
            position: hit.position,
            separation: hit.separation,
        },
        None => Localization::NoHit,
    }
}
