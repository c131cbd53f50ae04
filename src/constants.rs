//! Physical constants in the unit system used throughout the crate:
//! lengths in kpc, velocities in km/s, masses in 10^10 solar masses,
//! wavelengths in angstroms.

use std::f64::consts::PI;

/// Speed of light in km/s.
pub const C_KMS: f64 = 299_792.458;

/// Gravitational constant in kpc (km/s)^2 per 10^10 solar masses.
///
/// G = 4.30091e-6 kpc M_sun^-1 (km/s)^2, scaled to the 10^10 M_sun mass
/// unit carried by simulation snapshots.
pub const G_GALACTIC: f64 = 4.30091e4;

/// Conversion between a Gaussian FWHM and its standard deviation,
/// FWHM = 2 sqrt(2 ln 2) * sigma.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Arcseconds per radian.
pub const ARCSEC_PER_RAD: f64 = 360.0 * 60.0 * 60.0 / (PI * 2.0);

/// Absolute AB magnitude of the Sun (bolometric reference used when
/// converting particle luminosities to apparent magnitudes).
pub const SOLAR_ABS_MAG: f64 = 4.74;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fwhm_sigma_factor() {
        assert_relative_eq!(
            FWHM_PER_SIGMA,
            2.0 * (2.0 * 2.0_f64.ln()).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_arcsec_per_rad() {
        assert_relative_eq!(ARCSEC_PER_RAD, 206_264.806, epsilon = 1e-3);
    }

    #[test]
    fn test_circular_velocity_scale() {
        // 10^11 M_sun inside 10 kpc should orbit at a few hundred km/s,
        // a quick sanity check that the unit system hangs together.
        let vc = (G_GALACTIC * 10.0 / 10.0).sqrt();
        assert!(vc > 150.0 && vc < 300.0, "vc = {vc} km/s");
    }
}
