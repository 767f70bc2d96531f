//! Locates physical objects in an AR scene from crowd-sourced pixel annotations.
//!
//! Annotators mark an object in one or more captured camera frames. Each mark is
//! cast as a ray into the world and intersected with detected planes or the
//! sparse feature cloud; two marks from the same annotator on different frames
//! can be triangulated instead. [`locator::Locator`] tracks the open jobs and
//! decides when a position is known.

pub mod config;
pub mod geometry;
pub mod io;
pub mod job;
pub mod localize;
pub mod locator;
pub mod placement;
pub mod scenario;
pub mod types;

pub use config::LocatorConfig;
pub use geometry::{Ray, ViewProjection};
pub use job::JobStatus;
pub use locator::{Locator, LocatorEvent, Placement};
pub use types::*;
