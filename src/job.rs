use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::localize::{Resolution, Scene, localize_single, localize_stereo};
use crate::types::{CameraFrame, ImageId, JobId, Localization, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    WaitingForInitialResponse,
    /// Only held while a resolution is running.
    WaitingForPosition,
    WaitingForAdditionalResponse,
    Placed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Placed | JobStatus::Failed)
    }
}

/// What a job evaluation decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    Placed(Resolution),
    Waiting,
    Failed,
}

/// One outstanding request to locate an object.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub object: String,
    frames: HashMap<ImageId, Arc<CameraFrame>>,
    responses: Vec<Response>,
    status: JobStatus,
    opened_at: Instant,
    snapshot_count: usize,
}

impl Job {
    /// Opens a job seeded with its first frame; returns the job and that frame's id.
    pub fn open(id: JobId, object: &str, frame: CameraFrame, opened_at: Instant) -> (Job, ImageId) {
        let mut job = Job {
            id,
            object: object.to_string(),
            frames: HashMap::new(),
            responses: Vec::new(),
            status: JobStatus::WaitingForInitialResponse,
            opened_at,
            snapshot_count: 0,
        };
        let image = job.insert_frame(frame);
        (job, image)
    }

    fn insert_frame(&mut self, frame: CameraFrame) -> ImageId {
        let image = ImageId(format!("{}-img{}", self.id, self.snapshot_count));
        self.snapshot_count += 1;
        self.frames.insert(image.clone(), Arc::new(frame));
        image
    }

    /// Stores another capture under a fresh image id. Terminal jobs refuse it.
    pub fn add_snapshot(&mut self, frame: CameraFrame) -> Option<ImageId> {
        if self.is_terminal() {
            return None;
        }
        Some(self.insert_frame(frame))
    }

    pub fn frame(&self, image: &ImageId) -> Option<&CameraFrame> {
        self.frames.get(image).map(|f| f.as_ref())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.opened_at)
    }

    /// Replaces the response history with the complete current set.
    pub fn replace_responses(&mut self, responses: Vec<Response>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.responses = responses;
        true
    }

    /// First two responses of each annotator that refer to distinct images, in
    /// order of each annotator's first response.
    pub fn stereo_pairs(&self) -> Vec<(&Response, &Response)> {
        let mut annotators: Vec<&str> = Vec::new();
        let mut by_annotator: HashMap<&str, Vec<&Response>> = HashMap::new();
        for response in &self.responses {
            let entry = by_annotator.entry(response.annotator.as_str()).or_insert_with(|| {
                annotators.push(response.annotator.as_str());
                Vec::new()
            });
            entry.push(response);
        }
        annotators
            .into_iter()
            .filter_map(|annotator| {
                let responses = by_annotator.get(annotator)?;
                let first = *responses.first()?;
                let second = responses.iter().skip(1).find(|r| r.image != first.image)?;
                Some((first, *second))
            })
            .collect()
    }

    /// Resolves the job from its current responses and frames.
    ///
    /// The result depends only on the response set, the frames and the scene,
    /// so re-running it is always safe.
    pub fn resolve(&self, scene: &Scene) -> Option<Resolution> {
        let latest = self.responses.last()?;
        if let Some(frame) = self.frame(&latest.image) {
            let localization = localize_single(latest, frame, scene);
            if localization.is_hit() {
                return Some(Resolution {
                    localization,
                    camera_to_world: frame.camera_to_world,
                });
            }
        } else {
            log::debug!("{}: no frame for image {}", self.id, latest.image);
        }

        for (first, second) in self.stereo_pairs() {
            let (Some(frame1), Some(frame2)) = (self.frame(&first.image), self.frame(&second.image))
            else {
                continue;
            };
            let localization = localize_stereo((first, frame1), (second, frame2), scene);
            if let Localization::StereoHit { separation, .. } = localization {
                log::debug!(
                    "{}: triangulated from {}'s marks on {} and {} ({:.3} m gap)",
                    self.id,
                    first.annotator,
                    first.image,
                    second.image,
                    separation
                );
                return Some(Resolution {
                    localization,
                    camera_to_world: frame1.camera_to_world,
                });
            }
        }
        None
    }

    /// Runs a resolution and applies the resulting status transition.
    ///
    /// An unresolved job that already holds `max_responses` responses fails.
    pub fn evaluate(&mut self, scene: &Scene) -> Evaluation {
        if self.is_terminal() {
            return Evaluation::Failed;
        }
        self.status = JobStatus::WaitingForPosition;
        match self.resolve(scene) {
            Some(resolution) => {
                self.status = JobStatus::Placed;
                Evaluation::Placed(resolution)
            }
            None if self.responses.len() >= scene.config.jobs.max_responses => {
                self.status = JobStatus::Failed;
                Evaluation::Failed
            }
            None => {
                self.status = JobStatus::WaitingForAdditionalResponse;
                Evaluation::Waiting
            }
        }
    }

    /// Gives up on the job. Returns `false` if it was already terminal.
    pub fn fail(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        true
    }
}
