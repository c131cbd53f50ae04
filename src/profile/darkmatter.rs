//! Analytic dark-matter halo profiles.
//!
//! Snapshots often omit the halo particles to save space. When they do,
//! circular-velocity and spin columns would silently miss most of the
//! enclosed mass, so the profiler accepts one of these analytic halos in
//! the particles' stead.

use std::f64::consts::PI;

/// Spherically symmetric analytic halo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DarkMatterProfile {
    /// Hernquist (1990) sphere of total mass `mass_1e10` and scale
    /// radius `scale_kpc`
    Hernquist { mass_1e10: f64, scale_kpc: f64 },
    /// NFW halo with scale radius and characteristic density in
    /// 10^10 Msun per kpc^3
    Nfw {
        scale_kpc: f64,
        characteristic_density_1e10_kpc3: f64,
    },
}

impl DarkMatterProfile {
    /// NFW halo normalized so the mass enclosed at `r200_kpc` equals
    /// `virial_mass_1e10`.
    pub fn nfw_from_virial(virial_mass_1e10: f64, scale_kpc: f64, r200_kpc: f64) -> Self {
        let c = r200_kpc / scale_kpc;
        let g = (1.0 + c).ln() - c / (1.0 + c);
        Self::Nfw {
            scale_kpc,
            characteristic_density_1e10_kpc3: virial_mass_1e10
                / (4.0 * PI * scale_kpc.powi(3) * g),
        }
    }

    /// Halo mass enclosed within `r_kpc`, in 10^10 Msun.
    pub fn enclosed_mass_1e10(&self, r_kpc: f64) -> f64 {
        if r_kpc <= 0.0 {
            return 0.0;
        }
        match *self {
            Self::Hernquist {
                mass_1e10,
                scale_kpc,
            } => mass_1e10 * r_kpc * r_kpc / ((r_kpc + scale_kpc) * (r_kpc + scale_kpc)),
            Self::Nfw {
                scale_kpc,
                characteristic_density_1e10_kpc3,
            } => {
                let x = r_kpc / scale_kpc;
                4.0 * PI
                    * characteristic_density_1e10_kpc3
                    * scale_kpc.powi(3)
                    * ((1.0 + x).ln() - x / (1.0 + x))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hernquist_quarter_mass_at_scale_radius() {
        let halo = DarkMatterProfile::Hernquist {
            mass_1e10: 50.0,
            scale_kpc: 10.0,
        };
        assert_eq!(halo.enclosed_mass_1e10(0.0), 0.0);
        assert_relative_eq!(halo.enclosed_mass_1e10(10.0), 12.5, epsilon = 1e-12);
        // converges to the total mass far out
        assert_relative_eq!(halo.enclosed_mass_1e10(1e6), 50.0, max_relative = 1e-4);
    }

    #[test]
    fn test_nfw_virial_normalization_round_trips() {
        let halo = DarkMatterProfile::nfw_from_virial(80.0, 20.0, 200.0);
        assert_relative_eq!(halo.enclosed_mass_1e10(200.0), 80.0, max_relative = 1e-12);
        assert_eq!(halo.enclosed_mass_1e10(0.0), 0.0);
    }

    #[test]
    fn test_enclosed_mass_is_monotone() {
        let halos = [
            DarkMatterProfile::Hernquist {
                mass_1e10: 30.0,
                scale_kpc: 15.0,
            },
            DarkMatterProfile::nfw_from_virial(80.0, 20.0, 200.0),
        ];
        for halo in halos {
            let mut last = 0.0;
            for k in 1..200 {
                let m = halo.enclosed_mass_1e10(k as f64);
                assert!(m >= last);
                last = m;
            }
        }
    }
}
