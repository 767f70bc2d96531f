use glam::Vec2;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::types::CameraFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: na::Point3<f64>,
    pub direction: na::Unit<na::Vector3<f64>>,
}

impl Ray {
    /// Returns `None` when `direction` has no usable length.
    pub fn new(origin: na::Point3<f64>, direction: na::Vector3<f64>) -> Option<Ray> {
        let direction = na::Unit::try_new(direction, 1e-12)?;
        Some(Ray { origin, direction })
    }

    pub fn at(&self, t: f64) -> na::Point3<f64> {
        self.origin + self.direction.into_inner() * t
    }

    /// Signed distance along the ray of the point's orthogonal projection.
    pub fn projection_param(&self, point: &na::Point3<f64>) -> f64 {
        self.direction.dot(&(point - self.origin))
    }

    /// Perpendicular distance from `point` to the ray's supporting line.
    pub fn distance_to_line(&self, point: &na::Point3<f64>) -> f64 {
        (point - self.origin).cross(self.direction.as_ref()).norm()
    }
}

/// Viewport and perspective the annotated pixels are unprojected through.
///
/// Pixels use the usual image convention: x to the right, y down, origin in
/// the top left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub width: f64,
    pub height: f64,
    pub projection: na::Perspective3<f64>,
}

/// Serializable description of a [`ViewProjection`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewProjectionConfig {
    pub width: f64,
    pub height: f64,
    pub fovy_deg: f64,
    pub znear: f64,
    pub zfar: f64,
}

impl ViewProjection {
    /// `fovy` is the vertical field of view in radians.
    pub fn new(
        width: f64,
        height: f64,
        fovy: f64,
        znear: f64,
        zfar: f64,
    ) -> Option<ViewProjection> {
        let finite = [width, height, fovy, znear, zfar]
            .iter()
            .all(|v| v.is_finite());
        if !finite || width <= 0.0 || height <= 0.0 || znear <= 0.0 || zfar <= znear {
            return None;
        }
        if fovy <= 0.0 || fovy >= std::f64::consts::PI {
            return None;
        }
        Some(ViewProjection {
            width,
            height,
            projection: na::Perspective3::new(width / height, fovy, znear, zfar),
        })
    }

    pub fn from_config(config: &ViewProjectionConfig) -> Option<ViewProjection> {
        Self::new(
            config.width,
            config.height,
            config.fovy_deg.to_radians(),
            config.znear,
            config.zfar,
        )
    }

    /// Rescales a pixel from a captured image of `image_size` into viewport pixels.
    pub fn image_to_view(&self, pixel: Vec2, image_size: Option<(u32, u32)>) -> na::Point2<f64> {
        let (x, y) = (pixel.x as f64, pixel.y as f64);
        match image_size {
            Some((w, h)) if w > 0 && h > 0 => {
                na::Point2::new(self.width * x / w as f64, self.height * y / h as f64)
            }
            _ => na::Point2::new(x, y),
        }
    }

    /// Unprojects a viewport pixel onto the far clipping plane, in camera space.
    pub fn unproject_far(&self, pixel: &na::Point2<f64>) -> na::Point3<f64> {
        let ndc = na::Point3::new(
            2.0 * pixel.x / self.width - 1.0,
            1.0 - 2.0 * pixel.y / self.height,
            1.0,
        );
        self.projection.unproject_point(&ndc)
    }
}

/// Casts the ray through `pixel` (image space of `frame`) into the world.
pub fn ray_from_pixel(pixel: Vec2, view: &ViewProjection, frame: &CameraFrame) -> Option<Ray> {
    let Some(camera_position) = frame.camera_position() else {
        log::debug!("frame has no usable camera transform, cannot cast ray");
        return None;
    };
    let view_pixel = view.image_to_view(pixel, frame.image_size);
    let far = frame
        .camera_to_world
        .transform_point(&view.unproject_far(&view_pixel));
    Ray::new(camera_position, far - camera_position)
}
