//! Particle luminosity and magnitude-to-flux conversion.
//!
//! Every particle entering the observational path needs a linear flux.
//! Luminous particle kinds default to a mass-to-light conversion; any
//! particle may instead carry an explicit scalar luminosity or a spectrum
//! sampled at the observation's rest-frame wavelength. Luminosities are
//! converted to apparent magnitudes through the distance modulus and then
//! to linear flux against a magnitude zero point, so threshold cuts and
//! sky-noise levels share one photometric scale.

use std::sync::Arc;

use crate::constants::SOLAR_ABS_MAG;

use super::{group::SpectrumTable, Particle};

/// Luminosity information carried by a particle.
#[derive(Debug, Clone)]
pub enum Light {
    /// No luminosity supplied; luminous kinds fall back to mass-to-light
    Dark,
    /// Bolometric-style scalar luminosity in solar luminosities
    Scalar(f64),
    /// Row of a shared spectrum table, evaluated per observation
    Sampled {
        table: Arc<SpectrumTable>,
        row: usize,
    },
}

/// Converts particle properties to the linear flux deposited in the cube.
#[derive(Debug, Clone)]
pub struct FluxModel {
    /// Mass-to-light ratio in solar units, applied to luminous kinds
    /// that carry no explicit luminosity
    pub mass_to_light: f64,
    /// Rest-frame wavelength at which spectra are sampled, in Angstroms
    pub rest_wavelength_aa: f64,
    /// Distance modulus at the observation redshift, in magnitudes
    pub distance_modulus_mag: f64,
    /// Magnitude corresponding to unit linear flux
    pub mag_zero_point: f64,
}

impl FluxModel {
    /// Luminosity of a particle in solar luminosities.
    ///
    /// Kinds without stellar light and without a supplied luminosity are
    /// dark: they return 0.0 and stay invisible to the instrument.
    pub fn luminosity_lsun(&self, particle: &Particle) -> f64 {
        match &particle.light {
            Light::Dark => {
                if particle.kind.is_luminous() {
                    particle.mass_1e10 * 1e10 / self.mass_to_light
                } else {
                    0.0
                }
            }
            Light::Scalar(lum) => *lum,
            Light::Sampled { table, row } => table.at(*row, self.rest_wavelength_aa),
        }
    }

    /// Apparent magnitude of a luminosity at the observation distance.
    ///
    /// Zero luminosity is infinitely faint.
    pub fn apparent_mag(&self, luminosity_lsun: f64) -> f64 {
        if luminosity_lsun <= 0.0 {
            return f64::INFINITY;
        }
        SOLAR_ABS_MAG - 2.5 * luminosity_lsun.log10() + self.distance_modulus_mag
    }

    /// Linear flux relative to the magnitude zero point.
    pub fn linear_flux(&self, luminosity_lsun: f64) -> f64 {
        if luminosity_lsun <= 0.0 {
            return 0.0;
        }
        10f64.powf(-0.4 * (self.apparent_mag(luminosity_lsun) - self.mag_zero_point))
    }

    /// Linear flux of a particle.
    pub fn particle_flux(&self, particle: &Particle) -> f64 {
        self.linear_flux(self.luminosity_lsun(particle))
    }

    /// Smallest linear flux that still passes a magnitude threshold.
    pub fn flux_floor(&self, threshold_mag: f64) -> f64 {
        10f64.powf(-0.4 * (threshold_mag - self.mag_zero_point))
    }
}
