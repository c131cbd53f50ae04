//! Observation configuration and instrument presets.
//!
//! An [`ObservationConfig`] gathers every tunable of the mock-observation
//! pipeline: aperture geometry, wavelength sampling, projection, photometric
//! cuts, seeing and noise, and the measurement-ellipse mode. Configurations
//! are validated once up front so the pipeline itself can assume sane
//! values. Representative instrument setups live in [`presets`].

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::constants::{C_KMS, FWHM_PER_SIGMA};
use crate::cosmology::Cosmology;

use super::aperture::ApertureShape;
use super::images::ComponentScales;
use super::psf::PsfConfig;

/// Errors raised by configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field of view must be positive, got {0} arcsec")]
    InvalidFov(f64),

    #[error("spatial pixel scale must be positive and smaller than the field of view")]
    InvalidSpatialPixel,

    #[error("central wavelength must be positive")]
    InvalidWavelength,

    #[error("LSF FWHM must not be negative")]
    InvalidLsf,

    #[error("velocity pixel scale must be positive")]
    InvalidVelocityPixel,

    #[error("redshift must be positive to place the galaxy at a finite distance, got {0}")]
    InvalidRedshift(f64),

    #[error("inclination must lie in [0, 90] degrees, got {0}")]
    InvalidInclination(f64),

    #[error("mass-to-light ratio must be positive")]
    InvalidMassToLight,

    #[error("PSF FWHM must be positive")]
    InvalidPsf,

    #[error("sky-noise magnitudes must be finite")]
    InvalidSkyNoise,

    #[error("measurement ellipse parameters are invalid: {0}")]
    InvalidMeasure(&'static str),
}

/// Velocity pixel scale, given directly or as a wavelength pixel.
#[derive(Debug, Clone, Copy)]
pub enum VelocityPixel {
    /// Channel width in km/s
    KmPerSecond(f64),
    /// Channel width in Angstroms, converted at the central wavelength
    Angstrom(f64),
}

impl VelocityPixel {
    /// Channel width in km/s at the given central wavelength.
    pub fn to_kms(&self, central_wavelength_aa: f64) -> f64 {
        match self {
            Self::KmPerSecond(v) => *v,
            Self::Angstrom(dl) => C_KMS * dl / central_wavelength_aa,
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::KmPerSecond(v) => *v,
            Self::Angstrom(dl) => *dl,
        }
    }
}

/// Sky-noise injection parameters.
///
/// The noise level per cube voxel is the linear flux of the threshold
/// magnitude against the zero point, so a fainter threshold means quieter
/// sky. A seed makes the realization reproducible.
#[derive(Debug, Clone, Copy)]
pub struct SkyNoise {
    /// Magnitude corresponding to unit linear flux
    pub mag_zero_point: f64,
    /// Surface-brightness magnitude setting the noise standard deviation
    pub threshold_mag: f64,
    /// RNG seed; a random seed is drawn when absent
    pub seed: Option<u64>,
}

/// How the measurement ellipse for the spin statistic is resolved.
#[derive(Debug, Clone, Copy)]
pub enum MeasureMode {
    /// Fit shape and effective radius from the flux image, then scale the
    /// effective-radius ellipse by `fac`
    Fit { fac: f64 },
    /// Caller-supplied shape in kpc, grown until it encloses `fraction`
    /// of the total image flux
    Specified {
        semi_major_kpc: f64,
        semi_minor_kpc: f64,
        angle_deg: f64,
        fraction: f64,
    },
    /// Caller-supplied one-effective-radius shape in kpc, scaled by `fac`
    /// with no fitting or growing
    Fixed {
        semi_major_kpc: f64,
        semi_minor_kpc: f64,
        angle_deg: f64,
        fac: f64,
    },
}

impl Default for MeasureMode {
    fn default() -> Self {
        Self::Fit { fac: 1.0 }
    }
}

/// Complete mock-observation configuration.
#[derive(Debug, Clone)]
pub struct ObservationConfig {
    /// Observation label carried into exported metadata
    pub name: String,
    /// Aperture footprint shape
    pub aperture_shape: ApertureShape,
    /// Aperture diameter or side length in arcsec
    pub fov_arcsec: f64,
    /// Observed central wavelength of the band, Angstroms
    pub central_wavelength_aa: f64,
    /// Line-spread-function FWHM, Angstroms; zero disables broadening
    pub lsf_fwhm_aa: f64,
    /// Spatial pixel scale, arcsec
    pub spatial_pixel_arcsec: f64,
    /// Velocity channel width
    pub velocity_pixel: VelocityPixel,
    /// Inclination in degrees; 0 is face-on, 90 edge-on
    pub inclination_deg: f64,
    /// Observation redshift; must be positive
    pub redshift: f64,
    /// Virial radius in kpc, carried into exported metadata
    pub r200_kpc: Option<f64>,
    /// Structural scale lengths of the source, carried into exported metadata
    pub component_scales: ComponentScales,
    /// Faint-end magnitude cut applied per particle
    pub mag_threshold: Option<f64>,
    /// Magnitude corresponding to unit linear flux
    pub mag_zero_point: f64,
    /// Mass-to-light ratio in solar units for luminous particles
    pub mass_to_light: f64,
    /// Atmospheric seeing kernel, if any
    pub psf: Option<PsfConfig>,
    /// Sky-noise injection, if any
    pub sky_noise: Option<SkyNoise>,
    /// Measurement-ellipse mode
    pub measure: MeasureMode,
    /// Cosmology for the angular scale and distance modulus
    pub cosmology: Cosmology,
    /// Shift the catalog to its center of mass before projecting
    pub recenter: bool,
    /// Parallelize cube deposits and convolution with rayon
    pub parallel: bool,
}

impl ObservationConfig {
    /// Create a configuration from the core instrument parameters.
    ///
    /// Remaining fields start from survey-neutral defaults: inclination 70
    /// degrees, redshift 0.05, mass-to-light 1, zero point 8.9, ellipse fit
    /// at one effective radius, no PSF, no noise, parallel execution.
    pub fn new(
        aperture_shape: ApertureShape,
        fov_arcsec: f64,
        spatial_pixel_arcsec: f64,
        central_wavelength_aa: f64,
        lsf_fwhm_aa: f64,
        velocity_pixel: VelocityPixel,
    ) -> Self {
        Self {
            name: "observation".to_string(),
            aperture_shape,
            fov_arcsec,
            central_wavelength_aa,
            lsf_fwhm_aa,
            spatial_pixel_arcsec,
            velocity_pixel,
            inclination_deg: 70.0,
            redshift: 0.05,
            r200_kpc: None,
            component_scales: ComponentScales::default(),
            mag_threshold: None,
            mag_zero_point: 8.9,
            mass_to_light: 1.0,
            psf: None,
            sky_noise: None,
            measure: MeasureMode::default(),
            cosmology: Cosmology::default(),
            recenter: true,
            parallel: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_inclination(mut self, inclination_deg: f64) -> Self {
        self.inclination_deg = inclination_deg;
        self
    }

    pub fn with_redshift(mut self, redshift: f64) -> Self {
        self.redshift = redshift;
        self
    }

    pub fn with_r200(mut self, r200_kpc: f64) -> Self {
        self.r200_kpc = Some(r200_kpc);
        self
    }

    pub fn with_component_scales(mut self, scales: ComponentScales) -> Self {
        self.component_scales = scales;
        self
    }

    pub fn with_mag_threshold(mut self, threshold_mag: f64) -> Self {
        self.mag_threshold = Some(threshold_mag);
        self
    }

    pub fn with_mass_to_light(mut self, mass_to_light: f64) -> Self {
        self.mass_to_light = mass_to_light;
        self
    }

    pub fn with_psf(mut self, psf: PsfConfig) -> Self {
        self.psf = Some(psf);
        self
    }

    pub fn with_sky_noise(mut self, sky_noise: SkyNoise) -> Self {
        self.sky_noise = Some(sky_noise);
        self
    }

    pub fn with_measure(mut self, measure: MeasureMode) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_cosmology(mut self, cosmology: Cosmology) -> Self {
        self.cosmology = cosmology;
        self
    }

    /// Keep the catalog frame as supplied instead of recentering.
    pub fn without_recentering(mut self) -> Self {
        self.recenter = false;
        self
    }

    /// Run every stage single-threaded.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Velocity channel width in km/s.
    pub fn velocity_pixel_kms(&self) -> f64 {
        self.velocity_pixel.to_kms(self.central_wavelength_aa)
    }

    /// LSF standard deviation in km/s at the central wavelength.
    pub fn lsf_sigma_kms(&self) -> f64 {
        (self.lsf_fwhm_aa / self.central_wavelength_aa) * C_KMS / FWHM_PER_SIGMA
    }

    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// Returns the first offending parameter as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_arcsec > 0.0) {
            return Err(ConfigError::InvalidFov(self.fov_arcsec));
        }
        if !(self.spatial_pixel_arcsec > 0.0) || self.spatial_pixel_arcsec > self.fov_arcsec {
            return Err(ConfigError::InvalidSpatialPixel);
        }
        if !(self.central_wavelength_aa > 0.0) {
            return Err(ConfigError::InvalidWavelength);
        }
        if !(self.lsf_fwhm_aa >= 0.0) || !self.lsf_fwhm_aa.is_finite() {
            return Err(ConfigError::InvalidLsf);
        }
        if !(self.velocity_pixel.value() > 0.0) {
            return Err(ConfigError::InvalidVelocityPixel);
        }
        if !(self.redshift > 0.0) {
            return Err(ConfigError::InvalidRedshift(self.redshift));
        }
        if !(0.0..=90.0).contains(&self.inclination_deg) {
            return Err(ConfigError::InvalidInclination(self.inclination_deg));
        }
        if !(self.mass_to_light > 0.0) {
            return Err(ConfigError::InvalidMassToLight);
        }
        if let Some(psf) = &self.psf {
            if !(psf.fwhm_arcsec > 0.0) {
                return Err(ConfigError::InvalidPsf);
            }
        }
        if let Some(sky) = &self.sky_noise {
            if !sky.mag_zero_point.is_finite() || !sky.threshold_mag.is_finite() {
                return Err(ConfigError::InvalidSkyNoise);
            }
        }
        self.validate_measure()
    }

    fn validate_measure(&self) -> Result<(), ConfigError> {
        match self.measure {
            MeasureMode::Fit { fac } => {
                if !(fac > 0.0) {
                    return Err(ConfigError::InvalidMeasure("fac must be positive"));
                }
            }
            MeasureMode::Specified {
                semi_major_kpc,
                semi_minor_kpc,
                fraction,
                ..
            } => {
                if !(semi_major_kpc > 0.0) || !(semi_minor_kpc > 0.0) {
                    return Err(ConfigError::InvalidMeasure("axes must be positive"));
                }
                if semi_minor_kpc > semi_major_kpc {
                    return Err(ConfigError::InvalidMeasure(
                        "semi-minor axis exceeds semi-major axis",
                    ));
                }
                if !(fraction > 0.0 && fraction < 1.0) {
                    return Err(ConfigError::InvalidMeasure(
                        "enclosed fraction must lie in (0, 1)",
                    ));
                }
            }
            MeasureMode::Fixed {
                semi_major_kpc,
                semi_minor_kpc,
                fac,
                ..
            } => {
                if !(semi_major_kpc > 0.0) || !(semi_minor_kpc > 0.0) {
                    return Err(ConfigError::InvalidMeasure("axes must be positive"));
                }
                if semi_minor_kpc > semi_major_kpc {
                    return Err(ConfigError::InvalidMeasure(
                        "semi-minor axis exceeds semi-major axis",
                    ));
                }
                if !(fac > 0.0) {
                    return Err(ConfigError::InvalidMeasure("fac must be positive"));
                }
            }
        }
        Ok(())
    }
}

/// Representative instrument setups
pub mod presets {
    use super::*;

    /// SAMI-like circular fibre bundle: 15 arcsec bundle, 0.5 arcsec
    /// spaxels, blue-arm resolution at 4800 A.
    pub static SAMI: Lazy<ObservationConfig> = Lazy::new(|| {
        ObservationConfig::new(
            ApertureShape::Circular,
            15.0,   // bundle diameter, arcsec
            0.5,    // spaxel, arcsec
            4800.0, // central wavelength, A
            2.65,   // LSF FWHM, A
            VelocityPixel::Angstrom(1.04),
        )
        .with_name("SAMI")
    });

    /// MaNGA-like hexagonal fibre bundle; its log-wavelength solution gives
    /// constant-width velocity channels.
    pub static MANGA: Lazy<ObservationConfig> = Lazy::new(|| {
        ObservationConfig::new(
            ApertureShape::Hexagonal,
            22.0,   // corner-to-corner bundle diameter, arcsec
            0.5,    // spaxel, arcsec
            4700.0, // central wavelength, A
            2.35,   // LSF FWHM, A
            VelocityPixel::KmPerSecond(69.0),
        )
        .with_name("MaNGA")
    });

    /// MUSE-like wide-field square IFU.
    pub static MUSE: Lazy<ObservationConfig> = Lazy::new(|| {
        ObservationConfig::new(
            ApertureShape::Square,
            60.0,   // field side, arcsec
            0.2,    // spaxel, arcsec
            6000.0, // central wavelength, A
            2.51,   // LSF FWHM, A
            VelocityPixel::Angstrom(1.25),
        )
        .with_name("MUSE")
    });
}


#[cfg(test)]
mod preset_tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(presets::SAMI.validate().is_ok());
        assert!(presets::MANGA.validate().is_ok());
        assert!(presets::MUSE.validate().is_ok());
    }

    #[test]
    fn test_sami_preset_values() {
        assert_eq!(presets::SAMI.name, "SAMI");
        assert_eq!(presets::SAMI.fov_arcsec, 15.0);
        assert_eq!(presets::SAMI.spatial_pixel_arcsec, 0.5);
        assert!(matches!(
            presets::SAMI.aperture_shape,
            ApertureShape::Circular
        ));
        assert!(matches!(
            presets::MANGA.aperture_shape,
            ApertureShape::Hexagonal
        ));
        assert!(matches!(presets::MUSE.aperture_shape, ApertureShape::Square));
    }
}
