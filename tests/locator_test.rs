mod common;

use common::*;
use glam::Vec2;
use nalgebra as na;
use object_locator::{
    ImageId, JobId, JobStatus, Localization, Locator, LocatorConfig, LocatorEvent, Plane, PlaneId,
    Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn locator() -> (Locator, std::sync::mpsc::Receiver<LocatorEvent>) {
    Locator::new(view(), LocatorConfig::default())
}

fn center(annotator: &str, image: &ImageId) -> Response {
    Response::new(annotator, image.clone(), Vec2::new(320.0, 240.0))
}

/// Square horizontal plane centered on the world origin.
fn floor(id: u64, height: f64, half_extent: f64) -> Plane {
    let extent = na::Vector2::new(half_extent, half_extent);
    Plane::horizontal(PlaneId(id), height, extent)
}

fn waiting_for_more(locator: &Locator, job: JobId) -> bool {
    locator.status(job) == Some(JobStatus::WaitingForAdditionalResponse)
}

#[test]
fn first_response_on_a_plane_places_immediately() {
    let (locator, events) = locator();
    locator.upsert_plane(floor(1, 0.0, 2.0));
    let (job, image) = locator.open_job("mug", frame(&downward_pose([0.0, 1.2, 0.0])));
    let initial = locator.status(job);
    assert_eq!(initial, Some(JobStatus::WaitingForInitialResponse));

    let placement = locator.submit_responses(job, vec![center("alice", &image)]).unwrap();
    assert!(placement.localization.hit_a_plane());
    assert_eq!(placement.localization.plane(), Some(PlaneId(1)));
    assert!((placement.anchor - na::Point3::origin()).norm() < 1e-9);
    assert_eq!(placement.object, "mug");
    assert!(locator.active_jobs().is_empty());
    assert_eq!(locator.status(job), None);

    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(
        events[0],
        LocatorEvent::JobOpened {
            job,
            object: "mug".to_string()
        }
    );
    assert_eq!(
        events[1],
        LocatorEvent::StatusChanged {
            job,
            status: JobStatus::Placed
        }
    );
    let LocatorEvent::Placed(placed) = &events[2] else {
        panic!("expected a placement, got {:?}", events[2]);
    };
    assert_eq!(placed.job, job);
}

#[test]
fn one_annotator_on_two_frames_is_triangulated() {
    let (locator, events) = locator();
    let view = view();
    let target = na::Point3::new(0.2, 0.8, -2.5);
    let left = forward_pose([-0.4, 1.0, 0.0]);
    let right = forward_pose([0.4, 1.1, 0.1]);

    let (job, first) = locator.open_job("keys", frame(&left));
    let mark1 = Response::new("alice", first.clone(), pixel_of(&view, &left, &target));
    assert!(locator.submit_responses(job, vec![mark1.clone()]).is_none());
    assert!(waiting_for_more(&locator, job));

    let second = locator.add_snapshot(job, frame(&right)).unwrap();
    let mark2 = Response::new("alice", second, pixel_of(&view, &right, &target));
    let placement = locator.submit_responses(job, vec![mark1, mark2]).unwrap();

    match placement.localization {
        Localization::StereoHit { position, separation } => {
            assert!((position - target).norm() < 1e-3, "got {}", position);
            assert!(separation < 1e-3);
        }
        other => panic!("expected a stereo hit, got {:?}", other),
    }
    assert_eq!(placement.camera_to_world, left.to_homogeneous());

    let statuses: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            LocatorEvent::StatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![JobStatus::WaitingForAdditionalResponse, JobStatus::Placed]
    );
}

#[test]
fn two_annotators_with_one_mark_each_keep_waiting() {
    let (locator, _events) = locator();
    let (job, first) = locator.open_job("keys", frame(&forward_pose([0.0, 1.0, 0.0])));
    let second = locator.add_snapshot(job, frame(&forward_pose([1.0, 1.0, 0.0]))).unwrap();
    let responses = vec![center("alice", &first), center("bob", &second)];
    assert!(locator.submit_responses(job, responses).is_none());
    assert!(waiting_for_more(&locator, job));
}

#[test]
fn a_lone_response_never_resolves_on_its_own() {
    let (locator, _events) = locator();
    let (job, image) = locator.open_job("wallet", frame(&forward_pose([0.0, 1.0, 0.0])));
    for _ in 0..5 {
        let placement = locator.submit_responses(job, vec![center("alice", &image)]);
        assert!(placement.is_none());
        assert!(waiting_for_more(&locator, job));
    }
}

#[test]
fn late_responses_after_placement_are_ignored() {
    let (locator, events) = locator();
    locator.upsert_plane(floor(1, 0.0, 2.0));
    let (job, image) = locator.open_job("mug", frame(&downward_pose([0.0, 1.0, 0.0])));
    let first = locator.submit_responses(job, vec![center("alice", &image)]).unwrap();
    let _ = events.try_iter().count();

    let late = vec![
        center("alice", &image),
        center("bob", &image),
        Response::new("carol", image.clone(), Vec2::new(10.0, 10.0)),
    ];
    assert!(locator.submit_responses(job, late).is_none());
    assert_eq!(events.try_iter().count(), 0);
    assert_eq!(locator.markers().len(), 1);
    assert_eq!(locator.markers()[0].position, first.anchor);
}

#[test]
fn orphaned_image_ids_fail_only_that_response() {
    let (locator, _events) = locator();
    let view = view();
    let target = na::Point3::new(0.0, 0.5, -2.0);
    let a = forward_pose([-0.5, 1.0, 0.0]);
    let b = forward_pose([0.5, 1.0, 0.0]);
    let (job, first) = locator.open_job("cup", frame(&a));
    let second = locator.add_snapshot(job, frame(&b)).unwrap();

    let responses = vec![
        Response::new("alice", first, pixel_of(&view, &a, &target)),
        Response::new("alice", second, pixel_of(&view, &b, &target)),
        Response::new("bob", ImageId::from("never-captured"), Vec2::new(1.0, 1.0)),
    ];
    let placement = locator.submit_responses(job, responses).unwrap();
    let stereo = matches!(placement.localization, Localization::StereoHit { .. });
    assert!(stereo);
}

#[test]
fn unknown_jobs_are_ignored() {
    let (locator, events) = locator();
    let placement = locator.submit_responses(JobId(99), vec![center("alice", &ImageId::from("x"))]);
    assert!(placement.is_none());
    let snapshot = locator.add_snapshot(JobId(99), frame(&forward_pose([0.0; 3])));
    assert!(snapshot.is_none());
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn response_ceiling_fails_the_job() {
    let mut config = LocatorConfig::default();
    config.jobs.max_responses = 3;
    let (locator, events) = Locator::new(view(), config);
    let (job, image) = locator.open_job("remote", frame(&forward_pose([0.0, 1.0, 0.0])));

    let mut responses = Vec::new();
    for name in ["a", "b", "c"] {
        responses.push(center(name, &image));
        assert!(locator.submit_responses(job, responses.clone()).is_none());
    }
    assert_eq!(locator.status(job), None);
    let events: Vec<_> = events.try_iter().collect();
    assert!(events.contains(&LocatorEvent::StatusChanged {
        job,
        status: JobStatus::Failed
    }));
    assert_eq!(
        events.last(),
        Some(&LocatorEvent::CouldNotPlace {
            job,
            object: "remote".to_string()
        })
    );
}

#[test]
fn stale_jobs_time_out() {
    let (locator, events) = locator();
    let (old, _) = locator.open_job("glasses", frame(&forward_pose([0.0; 3])));
    assert!(locator.expire_stale_jobs(Instant::now()).is_empty());

    let later = Instant::now() + Duration::from_secs(121);
    assert_eq!(locator.expire_stale_jobs(later), vec![old]);
    assert!(locator.active_jobs().is_empty());
    let failures: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            LocatorEvent::CouldNotPlace { job, .. } => Some(job),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![old]);
}

#[test]
fn reset_discards_everything() {
    let (locator, _events) = locator();
    locator.upsert_plane(floor(1, 0.0, 2.0));
    let (job, image) = locator.open_job("mug", frame(&downward_pose([0.0, 1.0, 0.0])));
    locator.reset();
    assert_eq!(locator.plane_count(), 0);
    let placement = locator.submit_responses(job, vec![center("alice", &image)]);
    assert!(placement.is_none());

    // Ids are not reused after a reset.
    let (next, _) = locator.open_job("mug", frame(&downward_pose([0.0, 1.0, 0.0])));
    assert_ne!(next, job);
}

#[test]
fn new_planes_snap_nearby_markers() {
    let mut config = LocatorConfig::default();
    config.feature_hit.enabled = true;
    let (locator, events) = Locator::new(view(), config);
    let pose = downward_pose([0.0, 1.0, 0.0]);
    let frame = frame(&pose).with_feature_points(vec![na::Point3::new(0.0, 0.03, 0.0)]);
    let (job, image) = locator.open_job("phone", frame);
    let placement = locator.submit_responses(job, vec![center("alice", &image)]).unwrap();
    let feature = matches!(placement.localization, Localization::FeatureHit { .. });
    assert!(feature);
    let _ = events.try_iter().count();

    locator.upsert_plane(floor(5, 0.0, 0.5));
    let snapped = events.try_iter().collect::<Vec<_>>();
    assert_eq!(snapped.len(), 1);
    match &snapped[0] {
        LocatorEvent::MarkerSnapped { job: j, plane, position } => {
            assert_eq!(*j, job);
            assert_eq!(*plane, PlaneId(5));
            assert!(position.y.abs() < 1e-12);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(locator.markers()[0].position.y.abs() < 1e-12);
}

#[test]
fn far_hits_are_anchored_within_reach() {
    let (locator, _events) = locator();
    locator.upsert_plane(floor(1, -30.0, 5.0));
    let (job, image) = locator.open_job("balloon", frame(&downward_pose([0.0, 0.0, 0.0])));
    let placement = locator.submit_responses(job, vec![center("alice", &image)]).unwrap();
    let resolved = placement.localization.position().unwrap();
    assert!((resolved.y + 30.0).abs() < 1e-9);
    let within_reach = na::Point3::new(0.0, -10.0, 0.0);
    assert!((placement.anchor - within_reach).norm() < 1e-9);
}

#[test]
fn concurrent_submissions_resolve_each_job_once() {
    let (locator, events) = locator();
    let locator = Arc::new(locator);
    locator.upsert_plane(floor(1, 0.0, 2.0));
    let jobs: Vec<_> = (0..4)
        .map(|i| {
            let pose = downward_pose([0.0, 1.0, 0.0]);
            locator.open_job(&format!("object {}", i), frame(&pose))
        })
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let locator = Arc::clone(&locator);
            let jobs = jobs.clone();
            std::thread::spawn(move || {
                jobs.iter()
                    .filter_map(|(job, image)| {
                        locator.submit_responses(*job, vec![center(&format!("w{}", worker), image)])
                    })
                    .count()
            })
        })
        .collect();
    let placed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(placed, 4);

    let placed_events = events
        .try_iter()
        .filter(|e| matches!(e, LocatorEvent::Placed(_)))
        .count();
    assert_eq!(placed_events, 4);
    assert!(locator.active_jobs().is_empty());
}
