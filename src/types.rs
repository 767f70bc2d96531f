use glam::Vec2;
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Identifier of one captured camera image, as shown to annotators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        ImageId(value.to_string())
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaneId(pub u64);

/// Tracking state captured at one instant.
///
/// `camera_to_world` maps camera-space points (camera looking down -Z) into
/// world space. `image_size` is the pixel size of the image sent to
/// annotators, when it differs from the viewport the rays are cast through.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub camera_to_world: na::Matrix4<f64>,
    pub feature_points: Option<Vec<na::Point3<f64>>>,
    pub image_size: Option<(u32, u32)>,
}

impl CameraFrame {
    pub fn new(camera_to_world: na::Matrix4<f64>) -> CameraFrame {
        CameraFrame {
            camera_to_world,
            feature_points: None,
            image_size: None,
        }
    }

    pub fn from_pose(camera_to_world: &na::Isometry3<f64>) -> CameraFrame {
        Self::new(camera_to_world.to_homogeneous())
    }

    #[must_use]
    pub fn with_feature_points(self, feature_points: Vec<na::Point3<f64>>) -> CameraFrame {
        CameraFrame {
            feature_points: Some(feature_points),
            ..self
        }
    }

    #[must_use]
    pub fn with_image_size(self, width: u32, height: u32) -> CameraFrame {
        CameraFrame {
            image_size: Some((width, height)),
            ..self
        }
    }

    /// A transform is usable when it is finite, affine and invertible.
    pub fn has_valid_transform(&self) -> bool {
        let m = &self.camera_to_world;
        if m.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let last_row = m.row(3);
        if last_row[0] != 0.0 || last_row[1] != 0.0 || last_row[2] != 0.0 || last_row[3] != 1.0 {
            return false;
        }
        m.fixed_view::<3, 3>(0, 0).determinant().abs() > 1e-12
    }

    /// World position of the camera, if the transform is usable.
    pub fn camera_position(&self) -> Option<na::Point3<f64>> {
        if !self.has_valid_transform() {
            return None;
        }
        let t = self.camera_to_world.fixed_view::<3, 1>(0, 3);
        Some(na::Point3::new(t[0], t[1], t[2]))
    }
}

/// Bounded rectangle reported by plane detection.
///
/// The plane's normal is the local +Y axis of `world_from_plane`; `center` and
/// `half_extent` are measured along local X (first component) and local Z
/// (second component).
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub id: PlaneId,
    pub world_from_plane: na::Isometry3<f64>,
    pub center: na::Vector2<f64>,
    pub half_extent: na::Vector2<f64>,
}

impl Plane {
    pub fn new(
        id: PlaneId,
        world_from_plane: na::Isometry3<f64>,
        center: na::Vector2<f64>,
        half_extent: na::Vector2<f64>,
    ) -> Plane {
        Plane {
            id,
            world_from_plane,
            center,
            half_extent,
        }
    }

    /// Plane at the given height whose normal is world +Y.
    pub fn horizontal(id: PlaneId, height: f64, half_extent: na::Vector2<f64>) -> Plane {
        Plane::new(
            id,
            na::Isometry3::translation(0.0, height, 0.0),
            na::Vector2::zeros(),
            half_extent,
        )
    }

    /// Whether a plane-local point lies over the rectangle grown by `margin`
    /// along each local axis.
    pub fn contains_local(&self, local: &na::Point3<f64>, margin: na::Vector2<f64>) -> bool {
        (local.x - self.center.x).abs() <= self.half_extent.x + margin.x
            && (local.z - self.center.y).abs() <= self.half_extent.y + margin.y
    }
}

/// One annotator's mark on one captured image.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub annotator: String,
    pub image: ImageId,
    pub pixel: Vec2,
}

impl Response {
    pub fn new(annotator: &str, image: ImageId, pixel: Vec2) -> Response {
        Response {
            annotator: annotator.to_string(),
            image,
            pixel,
        }
    }
}

/// Outcome of a localization attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Localization {
    PlaneHit {
        position: na::Point3<f64>,
        plane: PlaneId,
    },
    FeatureHit {
        position: na::Point3<f64>,
    },
    StereoHit {
        position: na::Point3<f64>,
        separation: f64,
    },
    NoHit,
}

impl Localization {
    pub fn position(&self) -> Option<na::Point3<f64>> {
        match self {
            Localization::PlaneHit { position, .. }
            | Localization::FeatureHit { position }
            | Localization::StereoHit { position, .. } => Some(*position),
            Localization::NoHit => None,
        }
    }

    pub fn plane(&self) -> Option<PlaneId> {
        match self {
            Localization::PlaneHit { plane, .. } => Some(*plane),
            _ => None,
        }
    }

    pub fn hit_a_plane(&self) -> bool {
        matches!(self, Localization::PlaneHit { .. })
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, Localization::NoHit)
    }
}
