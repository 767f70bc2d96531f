//! The job table and its single serialization point.
//!
//! [`Locator`] owns every open job, the current planes and the markers placed
//! so far behind one mutex. Each operation holds the lock for its whole run,
//! so the evaluations of one job never interleave. Outcomes leave through an
//! [`mpsc`] channel, which never blocks the caller; the rendering side drains
//! it on its own thread.

use nalgebra as na;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError, mpsc};
use std::time::{Duration, Instant};

use crate::config::LocatorConfig;
use crate::geometry::ViewProjection;
use crate::job::{Evaluation, Job, JobStatus};
use crate::localize::Scene;
use crate::placement::{PlaneRegistry, clamp_to_camera_distance, snap_onto_plane};
use crate::types::{CameraFrame, ImageId, JobId, Localization, Plane, PlaneId, Response};

/// Everything the rendering side needs to anchor a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub job: JobId,
    pub object: String,
    pub localization: Localization,
    /// Resolved position, pulled within `max_camera_distance` of the camera.
    pub anchor: na::Point3<f64>,
    pub camera_to_world: na::Matrix4<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocatorEvent {
    JobOpened {
        job: JobId,
        object: String,
    },
    StatusChanged {
        job: JobId,
        status: JobStatus,
    },
    Placed(Placement),
    CouldNotPlace {
        job: JobId,
        object: String,
    },
    MarkerSnapped {
        job: JobId,
        plane: PlaneId,
        position: na::Point3<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub job: JobId,
    pub object: String,
    pub position: na::Point3<f64>,
}

struct LocatorState {
    jobs: BTreeMap<JobId, Job>,
    planes: PlaneRegistry,
    markers: Vec<Marker>,
    next_job: u64,
}

pub struct Locator {
    view: ViewProjection,
    config: LocatorConfig,
    state: Mutex<LocatorState>,
    events: mpsc::Sender<LocatorEvent>,
}

impl Locator {
    pub fn new(
        view: ViewProjection,
        config: LocatorConfig,
    ) -> (Locator, mpsc::Receiver<LocatorEvent>) {
        let (events, receiver) = mpsc::channel();
        let locator = Locator {
            view,
            config,
            state: Mutex::new(LocatorState {
                jobs: BTreeMap::new(),
                planes: PlaneRegistry::new(),
                markers: Vec::new(),
                next_job: 0,
            }),
            events,
        };
        (locator, receiver)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, LocatorState> {
        // Every mutation leaves the table consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LocatorEvent) {
        if self.events.send(event).is_err() {
            log::trace!("no event receiver attached");
        }
    }

    /// Opens a job for `object`, seeded with the frame the request was made on.
    pub fn open_job(&self, object: &str, frame: CameraFrame) -> (JobId, ImageId) {
        let mut state = self.lock();
        let id = JobId(state.next_job);
        state.next_job += 1;
        let (job, image) = Job::open(id, object, frame, Instant::now());
        log::info!("{}: looking for \"{}\" (first image {})", id, object, image);
        state.jobs.insert(id, job);
        self.emit(LocatorEvent::JobOpened {
            job: id,
            object: object.to_string(),
        });
        (id, image)
    }

    /// Adds another capture to an open job.
    pub fn add_snapshot(&self, job: JobId, frame: CameraFrame) -> Option<ImageId> {
        let mut state = self.lock();
        let image = state.jobs.get_mut(&job)?.add_snapshot(frame)?;
        log::debug!("{}: added snapshot {}", job, image);
        Some(image)
    }

    /// Re-evaluates a job against the complete current set of its responses.
    ///
    /// Unknown and finished jobs are ignored. Returns the placement when the job
    /// resolves; the same placement is also sent as [`LocatorEvent::Placed`].
    pub fn submit_responses(&self, job: JobId, responses: Vec<Response>) -> Option<Placement> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(entry) = state.jobs.get_mut(&job) else {
            log::debug!("{}: ignoring responses for unknown or finished job", job);
            return None;
        };
        if responses.is_empty() || !entry.replace_responses(responses) {
            return None;
        }

        let scene = Scene {
            view: &self.view,
            planes: &state.planes,
            config: &self.config,
        };
        let evaluation = entry.evaluate(&scene);
        let status = entry.status();
        let object = entry.object.clone();
        self.emit(LocatorEvent::StatusChanged { job, status });

        match evaluation {
            Evaluation::Waiting => {
                log::info!(
                    "{}: {} responses, waiting for more",
                    job,
                    entry.responses().len()
                );
                None
            }
            Evaluation::Failed => {
                log::warn!(
                    "{}: giving up on \"{}\" after {} responses",
                    job,
                    object,
                    entry.responses().len()
                );
                state.jobs.remove(&job);
                self.emit(LocatorEvent::CouldNotPlace { job, object });
                None
            }
            Evaluation::Placed(resolution) => {
                state.jobs.remove(&job);
                let position = resolution.position()?;
                let camera = na::Point3::from(
                    resolution
                        .camera_to_world
                        .fixed_view::<3, 1>(0, 3)
                        .into_owned(),
                );
                let anchor = clamp_to_camera_distance(
                    &position,
                    &camera,
                    self.config.placement.max_camera_distance,
                );
                log::info!(
                    "{}: placed \"{}\" at [{:.3}, {:.3}, {:.3}]",
                    job,
                    object,
                    anchor.x,
                    anchor.y,
                    anchor.z
                );
                state.markers.push(Marker {
                    job,
                    object: object.clone(),
                    position: anchor,
                });
                let placement = Placement {
                    job,
                    object,
                    localization: resolution.localization,
                    anchor,
                    camera_to_world: resolution.camera_to_world,
                };
                self.emit(LocatorEvent::Placed(placement.clone()));
                Some(placement)
            }
        }
    }

    /// Adds or updates a detected plane and snaps nearby markers onto it.
    pub fn upsert_plane(&self, plane: Plane) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut snapped = Vec::new();
        for marker in state.markers.iter_mut() {
            if let Some(position) =
                snap_onto_plane(&marker.position, &plane, &self.config.placement)
            {
                marker.position = position;
                snapped.push(LocatorEvent::MarkerSnapped {
                    job: marker.job,
                    plane: plane.id,
                    position,
                });
            }
        }
        state.planes.upsert(plane);
        for event in snapped {
            self.emit(event);
        }
    }

    pub fn remove_plane(&self, id: PlaneId) -> bool {
        self.lock().planes.remove(id).is_some()
    }

    /// Fails every job that has been open longer than the configured timeout.
    pub fn expire_stale_jobs(&self, now: Instant) -> Vec<JobId> {
        let timeout = Duration::from_secs(self.config.jobs.timeout_secs);
        let mut state = self.lock();
        let stale: Vec<JobId> = state
            .jobs
            .values()
            .filter(|job| job.age(now) > timeout)
            .map(|job| job.id)
            .collect();
        for id in &stale {
            if let Some(mut job) = state.jobs.remove(id) {
                job.fail();
                log::warn!("{}: timed out looking for \"{}\"", id, job.object);
                self.emit(LocatorEvent::StatusChanged {
                    job: *id,
                    status: job.status(),
                });
                self.emit(LocatorEvent::CouldNotPlace {
                    job: *id,
                    object: job.object,
                });
            }
        }
        stale
    }

    /// Drops every job, plane and marker, as when the tracking session restarts.
    pub fn reset(&self) {
        let mut state = self.lock();
        log::info!("session reset, discarding {} open jobs", state.jobs.len());
        state.jobs.clear();
        state.planes.clear();
        state.markers.clear();
    }

    /// Status of an open job; finished jobs are no longer tracked.
    pub fn status(&self, job: JobId) -> Option<JobStatus> {
        self.lock().jobs.get(&job).map(|j| j.status())
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.lock().jobs.keys().copied().collect()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.lock().markers.clone()
    }

    pub fn plane_count(&self) -> usize {
        self.lock().planes.len()
    }
}
