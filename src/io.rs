use std::io::Write;

use serde::{Serialize, de::DeserializeOwned};

use crate::job::JobStatus;
use crate::locator::LocatorEvent;
use crate::types::Localization;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) -> std::io::Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> std::io::Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Summary of a replayed session, written as JSON.
#[derive(Debug, serde::Serialize)]
pub struct ReplayReport {
    pub timestamp: String,
    pub jobs: Vec<JobReport>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JobReport {
    pub job: u64,
    pub object: String,
    pub status: JobStatus,
    pub hit: Option<String>,
    pub position: Option<[f64; 3]>,
    pub snapped_position: Option<[f64; 3]>,
}

fn timestamp() -> String {
    let now = time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Folds the event stream of a session into one entry per job.
///
/// Object names come from `JobOpened`, so jobs still open at the end of the
/// session are reported under their name too.
pub fn report_from_events<'a>(
    events: impl IntoIterator<Item = &'a LocatorEvent>,
) -> ReplayReport {
    let mut jobs: Vec<JobReport> = Vec::new();
    for event in events {
        let (id, object) = match event {
            LocatorEvent::StatusChanged { job, .. } | LocatorEvent::MarkerSnapped { job, .. } => {
                (*job, None)
            }
            LocatorEvent::JobOpened { job, object }
            | LocatorEvent::CouldNotPlace { job, object } => (*job, Some(object.clone())),
            LocatorEvent::Placed(p) => (p.job, Some(p.object.clone())),
        };
        let idx = match jobs.iter().position(|j| j.job == id.0) {
            Some(idx) => idx,
            None => {
                jobs.push(JobReport {
                    job: id.0,
                    object: String::new(),
                    status: JobStatus::WaitingForInitialResponse,
                    hit: None,
                    position: None,
                    snapped_position: None,
                });
                jobs.len() - 1
            }
        };
        let entry = &mut jobs[idx];
        if let Some(object) = object {
            entry.object = object;
        }
        match event {
            LocatorEvent::JobOpened { .. } => {}
            LocatorEvent::StatusChanged { status, .. } => entry.status = *status,
            LocatorEvent::Placed(p) => {
                entry.status = JobStatus::Placed;
                let hit = match p.localization {
                    Localization::PlaneHit { .. } => "plane",
                    Localization::FeatureHit { .. } => "feature",
                    Localization::StereoHit { .. } => "stereo",
                    Localization::NoHit => "none",
                };
                entry.hit = Some(hit.to_string());
                entry.position = Some([p.anchor.x, p.anchor.y, p.anchor.z]);
            }
            LocatorEvent::CouldNotPlace { .. } => entry.status = JobStatus::Failed,
            LocatorEvent::MarkerSnapped { position, .. } => {
                entry.snapped_position = Some([position.x, position.y, position.z]);
            }
        }
    }
    ReplayReport {
        timestamp: timestamp(),
        jobs,
    }
}

pub fn write_replay_report(output_path: &str, report: &ReplayReport) -> std::io::Result<()> {
    object_to_json(output_path, report)
}
