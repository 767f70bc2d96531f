#![allow(dead_code)]

use glam::Vec2;
use nalgebra as na;
use object_locator::{CameraFrame, ViewProjection};

pub const WIDTH: f64 = 640.0;
pub const HEIGHT: f64 = 480.0;

pub fn view() -> ViewProjection {
    ViewProjection::new(WIDTH, HEIGHT, 60f64.to_radians(), 0.001, 1000.0).unwrap()
}

/// Camera at `position` looking down -Z.
pub fn forward_pose(position: [f64; 3]) -> na::Isometry3<f64> {
    na::Isometry3::translation(position[0], position[1], position[2])
}

/// Camera at `position` looking straight down.
pub fn downward_pose(position: [f64; 3]) -> na::Isometry3<f64> {
    na::Isometry3::new(
        na::Vector3::from(position),
        na::Vector3::x() * -std::f64::consts::FRAC_PI_2,
    )
}

pub fn frame(pose: &na::Isometry3<f64>) -> CameraFrame {
    CameraFrame::from_pose(pose)
}

/// Pixel at which `target` appears for a camera at `pose`.
pub fn pixel_of(
    view: &ViewProjection,
    pose: &na::Isometry3<f64>,
    target: &na::Point3<f64>,
) -> Vec2 {
    let in_camera = pose.inverse_transform_point(target);
    let ndc = view.projection.project_point(&in_camera);
    Vec2::new(
        ((ndc.x + 1.0) / 2.0 * view.width) as f32,
        ((1.0 - ndc.y) / 2.0 * view.height) as f32,
    )
}
