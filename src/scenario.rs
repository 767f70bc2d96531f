//! Recorded sessions that can be replayed through a [`Locator`].
//!
//! Matrices are given row-major. Image names are local to the scenario file;
//! the locator assigns its own image ids when frames are captured.

use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::geometry::ViewProjectionConfig;
use crate::locator::{Locator, Placement};
use crate::types::{CameraFrame, ImageId, JobId, Plane, PlaneId, Response};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneRecord {
    pub id: u64,
    pub translation: [f64; 3],
    /// Axis-angle rotation, radians.
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub center: [f64; 2],
    pub half_extent: [f64; 2],
}

impl PlaneRecord {
    pub fn to_plane(&self) -> Plane {
        Plane::new(
            PlaneId(self.id),
            na::Isometry3::new(
                na::Vector3::from(self.translation),
                na::Vector3::from(self.rotation),
            ),
            na::Vector2::from(self.center),
            na::Vector2::from(self.half_extent),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub image: String,
    pub camera_to_world: [[f64; 4]; 4],
    #[serde(default)]
    pub feature_points: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub image_size: Option<(u32, u32)>,
}

impl FrameRecord {
    pub fn to_frame(&self) -> CameraFrame {
        let rows = self.camera_to_world;
        let matrix = na::Matrix4::from_fn(|r, c| rows[r][c]);
        CameraFrame {
            camera_to_world: matrix,
            feature_points: self
                .feature_points
                .as_ref()
                .map(|points| points.iter().copied().map(na::Point3::from).collect()),
            image_size: self.image_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub key: String,
    pub object: String,
    pub frames: Vec<FrameRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub annotator: String,
    pub image: String,
    pub pixel: [f32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    /// Complete current response set of one job.
    Responses {
        job: String,
        responses: Vec<ResponseRecord>,
    },
    UpsertPlane(PlaneRecord),
    RemovePlane { id: u64 },
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub view: ViewProjectionConfig,
    #[serde(default)]
    pub planes: Vec<PlaneRecord>,
    pub jobs: Vec<JobRecord>,
    pub events: Vec<ScenarioEvent>,
}

/// Job ids and image ids assigned while replaying.
#[derive(Debug, Default)]
pub struct ReplayIds {
    pub jobs: HashMap<String, JobId>,
    images: HashMap<(String, String), ImageId>,
}

impl ReplayIds {
    pub fn image(&self, job: &str, image: &str) -> Option<&ImageId> {
        self.images.get(&(job.to_string(), image.to_string()))
    }
}

impl Scenario {
    /// Feeds the whole scenario into `locator` in file order.
    ///
    /// Responses naming an unknown image keep a placeholder id, so they are
    /// treated like any other orphaned annotation.
    pub fn replay(&self, locator: &Locator) -> (ReplayIds, Vec<Placement>) {
        let mut ids = ReplayIds::default();
        let mut placements = Vec::new();

        for plane in &self.planes {
            locator.upsert_plane(plane.to_plane());
        }
        for job in &self.jobs {
            let mut frames = job.frames.iter();
            let Some(first) = frames.next() else {
                log::warn!("job {} has no frames, skipping", job.key);
                continue;
            };
            let (id, image) = locator.open_job(&job.object, first.to_frame());
            ids.images.insert((job.key.clone(), first.image.clone()), image);
            for frame in frames {
                if let Some(image) = locator.add_snapshot(id, frame.to_frame()) {
                    ids.images.insert((job.key.clone(), frame.image.clone()), image);
                }
            }
            ids.jobs.insert(job.key.clone(), id);
        }

        for event in &self.events {
            match event {
                ScenarioEvent::Responses { job, responses } => {
                    let Some(&id) = ids.jobs.get(job) else {
                        log::warn!("responses for unknown job {}", job);
                        continue;
                    };
                    let responses = responses
                        .iter()
                        .map(|r| {
                            let image = ids
                                .image(job, &r.image)
                                .cloned()
                                .unwrap_or_else(|| ImageId(format!("unknown:{}", r.image)));
                            Response::new(&r.annotator, image, glam::Vec2::from(r.pixel))
                        })
                        .collect();
                    if let Some(placement) = locator.submit_responses(id, responses) {
                        placements.push(placement);
                    }
                }
                ScenarioEvent::UpsertPlane(plane) => locator.upsert_plane(plane.to_plane()),
                ScenarioEvent::RemovePlane { id } => {
                    locator.remove_plane(PlaneId(*id));
                }
                ScenarioEvent::Reset => locator.reset(),
            }
        }
        (ids, placements)
    }
}
