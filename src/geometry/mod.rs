//! Ray casting against the reconstructed scene.
//!
//! A pixel marked by an annotator is turned into a world-space [`Ray`] using the
//! pose of the frame it was marked on. The ray is then intersected with the
//! detected planes, searched against the sparse feature cloud, or paired with a
//! second ray from another frame and triangulated.
//!
//! Two rays `O1 + t a` and `O2 + s b` from different frames rarely meet
//! exactly. Triangulation finds the point `D` on the first and `E` on the second
//! where the segment `DE` is perpendicular to both rays, and places the object
//! at the midpoint `(D + E) / 2`. The length of `DE` is the separation that the
//! stereo limits check.
//!
//! Everything here is pure and may be called from any thread.

pub mod feature_hit;
pub mod plane_hit;
pub mod ray;
pub mod stereo;

pub use feature_hit::*;
pub use plane_hit::*;
pub use ray::*;
pub use stereo::*;
