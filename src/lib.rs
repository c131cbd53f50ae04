//! Mock integral-field spectroscopy of simulated galaxies.
//!
//! Takes an N-body snapshot, projects it to an inclined line of sight,
//! deposits particle light into a spatially binned spectral cube the way
//! an IFU would record it, and measures the lambda_R spin proxy inside a
//! flux-grown ellipse. A separate profiling path reports the intrinsic
//! kinematics of the same snapshot in equal-width shells, no instrument
//! in the way.

pub mod algo;
pub mod constants;
pub mod cosmology;
pub mod observation;
pub mod particles;
pub mod profile;

pub use observation::{observe, MockObservation, ObservationConfig, ObservationError};
pub use particles::{Galaxy, Particle, ParticleGroup, ParticleKind};
pub use profile::{profile, BinDirection, ProfileConfig, ShellProfile};
