//! Particle catalogs and derived reference frames
//!
//! A simulation snapshot arrives as per-type arrays of positions, velocities
//! and masses. This module assembles them into a [`Galaxy`], tracks which
//! particle kinds are present, and provides the center-of-mass frame every
//! downstream analysis starts from. Projection into an observer frame and
//! polar-coordinate kinematics live in the submodules.

use std::collections::BTreeSet;
use std::fmt;

use nalgebra::Vector3;

pub mod group;
pub mod kinematics;
pub mod luminosity;
pub mod projection;

pub use group::{GroupError, ParticleGroup, SpectrumError, SpectrumTable};
pub use kinematics::{KinematicGalaxy, KinematicParticle};
pub use luminosity::{FluxModel, Light};
pub use projection::{project, ObservedGalaxy, ObservedParticle};

/// Particle types recognized in a snapshot, in conventional block order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParticleKind {
    Gas,
    DarkMatter,
    Disc,
    Bulge,
    Stars,
    Boundary,
}

impl ParticleKind {
    /// Kinds that carry stellar light and default to a mass-to-light flux.
    pub fn is_luminous(&self) -> bool {
        matches!(self, Self::Disc | Self::Bulge | Self::Stars)
    }

    /// Short lowercase label, used in log messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::DarkMatter => "dark matter",
            Self::Disc => "disc",
            Self::Bulge => "bulge",
            Self::Stars => "stars",
            Self::Boundary => "boundary",
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single simulation particle in the snapshot frame.
///
/// Positions are in kpc, velocities in km/s and masses in 10^10 solar
/// masses, the unit system of the source snapshot. A particle never
/// mutates once assembled; derived frames copy what they need.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Snapshot identifier, unique within the catalog
    pub id: u64,
    /// Particle type
    pub kind: ParticleKind,
    /// Position in kpc
    pub position_kpc: Vector3<f64>,
    /// Velocity in km/s
    pub velocity_kms: Vector3<f64>,
    /// Mass in 10^10 solar masses
    pub mass_1e10: f64,
    /// Luminosity information, if any
    pub light: Light,
}

impl Particle {
    /// Angular momentum m * (r x v) in 10^10 Msun kpc km/s.
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.mass_1e10 * self.position_kpc.cross(&self.velocity_kms)
    }
}

/// A particle catalog assembled from one or more typed groups.
///
/// The set of kinds present is tracked explicitly so callers can test for
/// a component without scanning the particle list.
#[derive(Debug, Clone)]
pub struct Galaxy {
    particles: Vec<Particle>,
    kinds: BTreeSet<ParticleKind>,
}

impl Galaxy {
    /// Assemble a catalog from typed groups.
    ///
    /// Group order is preserved in the flattened particle list. Empty
    /// groups are dropped and do not register their kind as present.
    pub fn assemble(groups: Vec<(ParticleKind, ParticleGroup)>) -> Self {
        let mut particles = Vec::with_capacity(groups.iter().map(|(_, g)| g.len()).sum());
        let mut kinds = BTreeSet::new();

        for (kind, group) in groups {
            if group.is_empty() {
                log::warn!("{kind} group is empty and was dropped from the catalog");
                continue;
            }
            kinds.insert(kind);
            group.emit(kind, &mut particles);
        }

        Self { particles, kinds }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Kinds present in the catalog.
    pub fn kinds(&self) -> &BTreeSet<ParticleKind> {
        &self.kinds
    }

    pub fn has_kind(&self, kind: ParticleKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Particles of the requested kinds, in catalog order.
    ///
    /// A requested kind that is absent from the catalog is an advisory
    /// condition: it is logged and the remaining kinds are returned.
    pub fn select(&self, kinds: &[ParticleKind]) -> Vec<&Particle> {
        for kind in kinds {
            if !self.has_kind(*kind) {
                log::warn!("requested {kind} particles are not present in the catalog");
            }
        }
        self.particles
            .iter()
            .filter(|p| kinds.contains(&p.kind))
            .collect()
    }

    /// Total mass in 10^10 solar masses.
    pub fn total_mass_1e10(&self) -> f64 {
        self.particles.iter().map(|p| p.mass_1e10).sum()
    }

    /// Mass-weighted mean position (kpc) and velocity (km/s).
    ///
    /// An empty or massless catalog has its center at the origin.
    pub fn center_of_mass(&self) -> (Vector3<f64>, Vector3<f64>) {
        let total = self.total_mass_1e10();
        if total <= 0.0 {
            return (Vector3::zeros(), Vector3::zeros());
        }

        let mut position = Vector3::zeros();
        let mut velocity = Vector3::zeros();
        for p in &self.particles {
            position += p.mass_1e10 * p.position_kpc;
            velocity += p.mass_1e10 * p.velocity_kms;
        }

        (position / total, velocity / total)
    }

    /// A copy of the catalog shifted to its center-of-mass frame.
    ///
    /// Centering an already-centered catalog is a no-op up to rounding.
    pub fn centered(&self) -> Self {
        let (com_position, com_velocity) = self.center_of_mass();

        let particles = self
            .particles
            .iter()
            .map(|p| Particle {
                position_kpc: p.position_kpc - com_position,
                velocity_kms: p.velocity_kms - com_velocity,
                ..p.clone()
            })
            .collect();

        Self {
            particles,
            kinds: self.kinds.clone(),
        }
    }
}
