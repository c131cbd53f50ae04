//! Intrinsic kinematic profiles in equal-width shells.
//!
//! Where the observation pipeline reports what an instrument would see,
//! this module reports what the snapshot actually contains: mass,
//! density, angular momentum and velocity moments binned by spherical
//! radius, cylindrical radius or height above the midplane. The
//! spherical direction additionally derives circular velocity,
//! anisotropy and the Bullock spin parameter, which need a mass budget
//! that includes the halo; catalogs without dark matter particles must
//! supply an analytic [`DarkMatterProfile`] for it.

pub mod darkmatter;
pub mod shells;

pub use darkmatter::DarkMatterProfile;
pub use shells::{ShellProfile, SphericalShellColumns, VelocityMoments};

use log::debug;
use thiserror::Error;

use crate::particles::{Galaxy, KinematicGalaxy, ParticleKind};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile extent must be positive and finite, got {0} kpc")]
    InvalidExtent(f64),
    #[error("profile needs at least one shell")]
    NoShells,
    #[error(
        "spherical profiling needs dark matter: the catalog has no dark-matter \
         particles and no analytic profile was supplied"
    )]
    MissingDarkMatter,
}

/// Which coordinate the shells are laid out along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinDirection {
    /// Spherical shells in r.
    Spherical,
    /// Cylindrical annuli in R, cut to |z| <= extent.
    Cylindrical,
    /// Slabs in |z|, cut to R <= extent.
    Vertical,
}

/// How to bin a galaxy into shells.
#[derive(Debug, Clone, Copy)]
pub struct ProfileConfig {
    pub direction: BinDirection,
    /// Outer edge of the last shell, kpc
    pub rmax_kpc: f64,
    pub n_shells: usize,
    /// Analytic halo folded into circular velocity and spin; ignored
    /// outside the spherical direction
    pub dark_matter: Option<DarkMatterProfile>,
    /// Shift to the center of mass before binning
    pub recenter: bool,
    pub parallel: bool,
}

impl ProfileConfig {
    pub fn new(direction: BinDirection, rmax_kpc: f64, n_shells: usize) -> Self {
        Self {
            direction,
            rmax_kpc,
            n_shells,
            dark_matter: None,
            recenter: true,
            parallel: true,
        }
    }

    pub fn with_dark_matter(mut self, profile: DarkMatterProfile) -> Self {
        self.dark_matter = Some(profile);
        self
    }

    pub fn without_recentering(mut self) -> Self {
        self.recenter = false;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn validate(&self, galaxy: &Galaxy) -> Result<(), ProfileError> {
        if !(self.rmax_kpc > 0.0) || !self.rmax_kpc.is_finite() {
            return Err(ProfileError::InvalidExtent(self.rmax_kpc));
        }
        if self.n_shells == 0 {
            return Err(ProfileError::NoShells);
        }
        // The spherical mass budget is meaningless without the halo.
        if self.direction == BinDirection::Spherical
            && self.dark_matter.is_none()
            && !galaxy.has_kind(ParticleKind::DarkMatter)
        {
            return Err(ProfileError::MissingDarkMatter);
        }
        Ok(())
    }
}

/// Bins `galaxy` into shells and reports the per-shell statistics.
pub fn profile(galaxy: &Galaxy, config: &ProfileConfig) -> Result<ShellProfile, ProfileError> {
    config.validate(galaxy)?;

    let centered;
    let source = if config.recenter {
        centered = galaxy.centered();
        &centered
    } else {
        galaxy
    };
    let kin = KinematicGalaxy::from_galaxy(source);
    debug!(
        "profiling {} particles into {} {:?} shells out to {} kpc",
        kin.len(),
        config.n_shells,
        config.direction,
        config.rmax_kpc
    );

    Ok(shells::compute(&kin, config))
}
