//! The mock-observation pipeline.
//!
//! [`observe`] drives the whole chain: project a catalog into the
//! observer frame, bin it into a spectral cube under the instrument
//! aperture, apply seeing and sky noise, collapse the cube to kinematic
//! maps, place the measurement ellipse, and integrate the spin statistic.
//! The submodules hold the individual stages and stay public for callers
//! that need only part of the chain.

pub mod aperture;
pub mod config;
pub mod convolve;
pub mod cube;
pub mod ellipse;
pub mod images;
pub mod lambda;
pub mod noise;
pub mod psf;

pub use aperture::{ApertureError, ApertureGrid, ApertureShape};
pub use config::{presets, ConfigError, MeasureMode, ObservationConfig, SkyNoise, VelocityPixel};
pub use cube::{build_cube, CubeError, SpectralCube};
pub use ellipse::{resolve_ellipse, EllipseError, MeasurementEllipse};
pub use images::{
    AxisCalibration, ComponentScales, ImageBundle, KinematicMaps, MapKind, ObservationMeta,
};
pub use lambda::{lambda_r, SpinError, SpinMeasurement};
pub use psf::{PsfConfig, PsfKind};

use log::debug;
use thiserror::Error;

use crate::particles::{project, FluxModel, Galaxy};

/// Any failure of the observation pipeline
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aperture(#[from] ApertureError),

    #[error(transparent)]
    Cube(#[from] CubeError),

    #[error(transparent)]
    Ellipse(#[from] EllipseError),

    #[error(transparent)]
    Spin(#[from] SpinError),
}

/// Everything one observation produces.
#[derive(Debug, Clone)]
pub struct MockObservation {
    pub cube: SpectralCube,
    pub maps: KinematicMaps,
    pub ellipse: MeasurementEllipse,
    pub spin: SpinMeasurement,
    pub meta: ObservationMeta,
    pub calibration: AxisCalibration,
}

impl MockObservation {
    /// Bundle one collapsed map for an external serializer.
    pub fn export(&self, kind: MapKind) -> ImageBundle<'_> {
        ImageBundle {
            kind,
            data: self.maps.map(kind),
            calibration: self.calibration,
            meta: &self.meta,
        }
    }
}

/// Run the full mock-observation pipeline on a catalog.
///
/// The catalog is recentred on its centre of mass unless the
/// configuration says otherwise, projected at the configured inclination,
/// and observed through the configured instrument. Fluxes follow from
/// the mass-to-light ratio or per-particle luminosities, placed at the
/// configured redshift.
///
/// # Errors
///
/// Configuration problems surface before any work happens; an aperture
/// that resolves to fewer than two bins, a cube with no visible
/// particles, and a fluxless or fully masked measurement aperture each
/// abort with their stage's error.
pub fn observe(
    galaxy: &Galaxy,
    config: &ObservationConfig,
) -> Result<MockObservation, ObservationError> {
    config.validate()?;

    let kpc_per_arcsec = config.cosmology.kpc_per_arcsec(config.redshift);
    let grid = ApertureGrid::new(
        config.aperture_shape,
        config.fov_arcsec,
        config.spatial_pixel_arcsec,
        kpc_per_arcsec,
    )?;
    debug!(
        "{:?} aperture, {n}x{n} bins of {:.3} arcsec ({:.4} kpc at z = {})",
        grid.shape(),
        grid.pixel_arcsec(),
        grid.pixel_kpc(),
        config.redshift,
        n = grid.n_bins(),
    );

    let centered;
    let source = if config.recenter {
        centered = galaxy.centered();
        &centered
    } else {
        galaxy
    };

    let flux_model = FluxModel {
        mass_to_light: config.mass_to_light,
        rest_wavelength_aa: config.central_wavelength_aa / (1.0 + config.redshift),
        distance_modulus_mag: config.cosmology.distance_modulus_mag(config.redshift),
        mag_zero_point: config.mag_zero_point,
    };
    let observed = project(source, config.inclination_deg, &flux_model);

    let flux_floor = config.mag_threshold.map(|m| flux_model.flux_floor(m));
    let mut cube = build_cube(
        &observed,
        &grid,
        config.velocity_pixel_kms(),
        config.lsf_sigma_kms(),
        flux_floor,
        config.parallel,
    )?;
    debug!(
        "cube {:?} from {} projected particles, total flux {:.4e}",
        cube.data.dim(),
        observed.particles.len(),
        cube.total_flux()
    );

    if let Some(psf) = &config.psf {
        cube.convolve_psf(psf, config.parallel);
    }
    if let Some(sky) = &config.sky_noise {
        cube.add_sky_noise(sky);
    }

    let maps = KinematicMaps::collapse(&cube);
    let ellipse = resolve_ellipse(
        &maps.flux,
        grid.footprint(),
        &config.measure,
        grid.pixel_kpc(),
    )?;
    let spin = lambda_r(&maps, grid.footprint(), &ellipse)?;
    debug!(
        "lambda_R = {:.4} over {} bins (a = {:.2} kpc, b/a = {:.2})",
        spin.lambda_r,
        spin.pixels_used,
        ellipse.semi_major_kpc,
        ellipse.semi_minor_px / ellipse.semi_major_px,
    );

    let meta = ObservationMeta {
        name: config.name.clone(),
        inclination_deg: config.inclination_deg,
        r200_kpc: config.r200_kpc,
        component_scales: config.component_scales,
        mag_threshold: config.mag_threshold,
        sky_noise_sigma: config
            .sky_noise
            .map(|s| noise::sky_sigma(s.mag_zero_point, s.threshold_mag)),
    };
    let calibration = AxisCalibration {
        pixel_arcsec: config.spatial_pixel_arcsec,
        velocity_pixel_kms: config.velocity_pixel_kms(),
        redshift: config.redshift,
        reference_wavelength_aa: config.central_wavelength_aa,
    };

    Ok(MockObservation {
        cube,
        maps,
        ellipse,
        spin,
        meta,
        calibration,
    })
}
