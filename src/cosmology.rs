//! Flat ΛCDM distance calculations.
//!
//! The observation pipeline needs one cosmological quantity: the angular
//! scale (kpc per arcsecond) at the observation redshift, which couples
//! every spatial scale of the instrument to the redshift parameter. The
//! luminosity distance feeds apparent-magnitude conversion for flux
//! thresholds. Distances come from a Simpson-integrated comoving distance;
//! curvature is ignored (the parameter defaults describe a flat universe).

use crate::constants::{ARCSEC_PER_RAD, C_KMS};

/// Number of Simpson sub-intervals for the comoving-distance integral.
/// The integrand is smooth; this is accurate to well below 0.01% for z < 10.
const INTEGRATION_STEPS: usize = 256;

/// Cosmological parameters for distance calculations.
///
/// The default is the h-free convention (H0 = 100 km/s/Mpc) with
/// Ωm = 0.3, ΩΛ = 0.7, matching the unit system of most simulation
/// snapshots. Pass an explicit H0 to work in physical units.
#[derive(Debug, Clone, Copy)]
pub struct Cosmology {
    /// Hubble constant in km/s/Mpc
    pub h0_kms_per_mpc: f64,
    /// Matter density parameter
    pub omega_m: f64,
    /// Dark-energy density parameter
    pub omega_l: f64,
}

impl Default for Cosmology {
    fn default() -> Self {
        Self {
            h0_kms_per_mpc: 100.0,
            omega_m: 0.3,
            omega_l: 0.7,
        }
    }
}

impl Cosmology {
    /// Create a new cosmology from H0 (km/s/Mpc), Ωm and ΩΛ.
    pub fn new(h0_kms_per_mpc: f64, omega_m: f64, omega_l: f64) -> Self {
        Self {
            h0_kms_per_mpc,
            omega_m,
            omega_l,
        }
    }

    /// Dimensionless Hubble parameter E(z) = H(z)/H0 for a flat universe.
    fn e_of_z(&self, z: f64) -> f64 {
        (self.omega_m * (1.0 + z).powi(3) + self.omega_l).sqrt()
    }

    /// Line-of-sight comoving distance in Mpc, Simpson-integrated.
    pub fn comoving_distance_mpc(&self, z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }

        let h = z / INTEGRATION_STEPS as f64;
        let mut sum = 1.0 / self.e_of_z(0.0) + 1.0 / self.e_of_z(z);
        for i in 1..INTEGRATION_STEPS {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight / self.e_of_z(i as f64 * h);
        }

        (C_KMS / self.h0_kms_per_mpc) * sum * h / 3.0
    }

    /// Angular-diameter distance in Mpc.
    pub fn angular_diameter_distance_mpc(&self, z: f64) -> f64 {
        self.comoving_distance_mpc(z) / (1.0 + z)
    }

    /// Luminosity distance in Mpc.
    pub fn luminosity_distance_mpc(&self, z: f64) -> f64 {
        self.comoving_distance_mpc(z) * (1.0 + z)
    }

    /// Physical transverse scale in kpc per arcsecond at redshift z.
    ///
    /// This is the conversion every aperture and pixel-scale calculation
    /// goes through: the same galaxy observed at different z occupies a
    /// different number of pixels.
    pub fn kpc_per_arcsec(&self, z: f64) -> f64 {
        self.angular_diameter_distance_mpc(z) * 1000.0 / ARCSEC_PER_RAD
    }

    /// Distance modulus m - M = 5 log10(D_L / 10 pc).
    pub fn distance_modulus_mag(&self, z: f64) -> f64 {
        5.0 * self.luminosity_distance_mpc(z).log10() + 25.0
    }
}
