//! Shell binning and per-shell statistics.
//!
//! Every shell's sums are independent of every other shell's, so the
//! per-shell pass can run on the rayon pool; the cumulative columns come
//! from an explicit prefix pass afterwards. The parallel and serial
//! paths visit particles in the same order within each shell, so they
//! agree bit for bit.

use nalgebra::Vector3;
use rayon::prelude::*;
use std::f64::consts::{PI, SQRT_2};

use crate::constants::G_GALACTIC;
use crate::particles::{KinematicGalaxy, KinematicParticle};

use super::{BinDirection, ProfileConfig};

/// Mass-weighted mean and dispersion of one velocity component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityMoments {
    pub mean_kms: f64,
    pub sigma_kms: f64,
}

impl VelocityMoments {
    fn quiet() -> Self {
        Self {
            mean_kms: 0.0,
            sigma_kms: 0.0,
        }
    }
}

/// Columns only the spherical direction carries.
#[derive(Debug, Clone)]
pub struct SphericalShellColumns {
    /// sqrt(G M(r) / r) at each outer edge, including any analytic halo, km/s
    pub circular_velocity_kms: Vec<f64>,
    /// 1 - (sigma_theta^2 + sigma_phi^2) / (2 sigma_r^2); NaN where
    /// sigma_r is zero
    pub anisotropy_beta: Vec<f64>,
    /// |J|/(M r) at each outer edge, km/s
    pub rotational_velocity_kms: Vec<f64>,
    /// Bullock spin parameter |J| / (sqrt(2) M vc r)
    pub spin_lambda: Vec<f64>,
}

/// Per-shell profile columns, innermost shell first.
///
/// Empty shells carry zero mass, zero moments and a log-density of
/// negative infinity; nothing here is NaN except the anisotropy where
/// the radial dispersion vanishes.
#[derive(Debug, Clone)]
pub struct ShellProfile {
    pub direction: BinDirection,
    /// Outer edge of each shell, kpc
    pub outer_edge_kpc: Vec<f64>,
    /// Mass in each shell, 10^10 Msun
    pub shell_mass_1e10: Vec<f64>,
    /// Particle mass enclosed out to each outer edge, 10^10 Msun
    pub enclosed_mass_1e10: Vec<f64>,
    /// log10 of shell mass over shell volume, in 10^10 Msun / kpc^3
    pub log_density: Vec<f64>,
    /// Angular momentum enclosed out to each outer edge, 10^10 Msun kpc km/s
    pub enclosed_j: Vec<Vector3<f64>>,
    /// Magnitude of the enclosed angular momentum
    pub enclosed_j_mag: Vec<f64>,
    /// Spherical or cylindrical radial velocity, as fits the direction
    pub v_radial: Vec<VelocityMoments>,
    /// Azimuthal velocity
    pub v_azimuthal: Vec<VelocityMoments>,
    /// Polar velocity; spherical direction only
    pub v_polar: Option<Vec<VelocityMoments>>,
    /// Vertical velocity; cylindrical and vertical directions only
    pub v_vertical: Option<Vec<VelocityMoments>>,
    /// Derived columns; spherical direction only
    pub spherical: Option<SphericalShellColumns>,
}

impl ShellProfile {
    pub fn n_shells(&self) -> usize {
        self.outer_edge_kpc.len()
    }
}

/// Running sums for one shell.
#[derive(Debug, Clone, Copy)]
struct ShellSums {
    mass: f64,
    j: Vector3<f64>,
    m1: [f64; 3],
    m2: [f64; 3],
}

impl ShellSums {
    fn zero() -> Self {
        Self {
            mass: 0.0,
            j: Vector3::zeros(),
            m1: [0.0; 3],
            m2: [0.0; 3],
        }
    }

    fn add(&mut self, p: &KinematicParticle, v: [f64; 3]) {
        self.mass += p.mass_1e10;
        self.j += p.j_1e10_kpc_kms;
        for k in 0..3 {
            self.m1[k] += p.mass_1e10 * v[k];
            self.m2[k] += p.mass_1e10 * v[k] * v[k];
        }
    }

    fn moments(&self, k: usize) -> VelocityMoments {
        if self.mass <= 0.0 {
            return VelocityMoments::quiet();
        }
        let mean = self.m1[k] / self.mass;
        let var = (self.m2[k] / self.mass - mean * mean).max(0.0);
        VelocityMoments {
            mean_kms: mean,
            sigma_kms: var.sqrt(),
        }
    }
}

fn bin_coordinate(direction: BinDirection, p: &KinematicParticle) -> f64 {
    match direction {
        BinDirection::Spherical => p.r_kpc,
        BinDirection::Cylindrical => p.r_cyl_kpc,
        BinDirection::Vertical => p.z_kpc.abs(),
    }
}

/// Whether the particle sits inside the region the shell volumes assume.
fn within_lateral_extent(direction: BinDirection, p: &KinematicParticle, rmax: f64) -> bool {
    match direction {
        BinDirection::Spherical => true,
        BinDirection::Cylindrical => p.z_kpc.abs() <= rmax,
        BinDirection::Vertical => p.r_cyl_kpc <= rmax,
    }
}

/// The reported components, ordered radial, azimuthal, third.
fn velocity_components(direction: BinDirection, p: &KinematicParticle) -> [f64; 3] {
    match direction {
        BinDirection::Spherical => [p.v_r_kms, p.v_phi_kms, p.v_theta_kms],
        BinDirection::Cylindrical | BinDirection::Vertical => {
            [p.v_r_cyl_kms, p.v_phi_kms, p.v_z_kms]
        }
    }
}

/// Volume of shell `[inner, outer]` under the direction's geometry.
///
/// Cylindrical annuli span the full |z| <= rmax column; vertical slabs
/// cover both signs of z across the R <= rmax disc.
fn shell_volume(direction: BinDirection, inner: f64, outer: f64, rmax: f64) -> f64 {
    match direction {
        BinDirection::Spherical => 4.0 / 3.0 * PI * (outer.powi(3) - inner.powi(3)),
        BinDirection::Cylindrical => PI * (outer * outer - inner * inner) * 2.0 * rmax,
        BinDirection::Vertical => 2.0 * PI * rmax * rmax * (outer - inner),
    }
}

pub(super) fn compute(kin: &KinematicGalaxy, config: &ProfileConfig) -> ShellProfile {
    let n = config.n_shells;
    let rmax = config.rmax_kpc;
    let width = rmax / n as f64;
    let direction = config.direction;

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, p) in kin.particles.iter().enumerate() {
        if !within_lateral_extent(direction, p, rmax) {
            continue;
        }
        let shell = (bin_coordinate(direction, p) / width).floor() as usize;
        if shell < n {
            members[shell].push(idx);
        }
    }

    let sum_one = |indices: &Vec<usize>| {
        let mut sums = ShellSums::zero();
        for &idx in indices {
            let p = &kin.particles[idx];
            sums.add(p, velocity_components(direction, p));
        }
        sums
    };
    let sums: Vec<ShellSums> = if config.parallel {
        members.par_iter().map(sum_one).collect()
    } else {
        members.iter().map(sum_one).collect()
    };

    let mut outer_edge_kpc = Vec::with_capacity(n);
    let mut shell_mass_1e10 = Vec::with_capacity(n);
    let mut enclosed_mass_1e10 = Vec::with_capacity(n);
    let mut log_density = Vec::with_capacity(n);
    let mut enclosed_j = Vec::with_capacity(n);
    let mut enclosed_j_mag = Vec::with_capacity(n);
    let mut v_radial = Vec::with_capacity(n);
    let mut v_azimuthal = Vec::with_capacity(n);
    let mut third = Vec::with_capacity(n);

    let mut mass_acc = 0.0;
    let mut j_acc = Vector3::zeros();
    for (i, s) in sums.iter().enumerate() {
        let inner = i as f64 * width;
        let outer = (i + 1) as f64 * width;
        mass_acc += s.mass;
        j_acc += s.j;

        outer_edge_kpc.push(outer);
        shell_mass_1e10.push(s.mass);
        enclosed_mass_1e10.push(mass_acc);
        // log10 of an empty shell's zero mass is the -inf it should be
        log_density.push((s.mass / shell_volume(direction, inner, outer, rmax)).log10());
        enclosed_j.push(j_acc);
        enclosed_j_mag.push(j_acc.norm());
        v_radial.push(s.moments(0));
        v_azimuthal.push(s.moments(1));
        third.push(s.moments(2));
    }

    let spherical = (direction == BinDirection::Spherical).then(|| {
        let mut columns = SphericalShellColumns {
            circular_velocity_kms: Vec::with_capacity(n),
            anisotropy_beta: Vec::with_capacity(n),
            rotational_velocity_kms: Vec::with_capacity(n),
            spin_lambda: Vec::with_capacity(n),
        };
        for i in 0..n {
            let r = outer_edge_kpc[i];
            let halo = config
                .dark_matter
                .map_or(0.0, |dm| dm.enclosed_mass_1e10(r));
            let m_total = enclosed_mass_1e10[i] + halo;
            let vc = (G_GALACTIC * m_total / r).sqrt();

            let sigma_r = v_radial[i].sigma_kms;
            let beta = if sigma_r > 0.0 {
                let tangential =
                    third[i].sigma_kms.powi(2) + v_azimuthal[i].sigma_kms.powi(2);
                1.0 - tangential / (2.0 * sigma_r * sigma_r)
            } else {
                f64::NAN
            };

            let j = enclosed_j_mag[i];
            let v_rot = if m_total > 0.0 { j / (m_total * r) } else { 0.0 };
            let lambda = if m_total > 0.0 && vc > 0.0 {
                j / (SQRT_2 * m_total * vc * r)
            } else {
                0.0
            };

            columns.circular_velocity_kms.push(vc);
            columns.anisotropy_beta.push(beta);
            columns.rotational_velocity_kms.push(v_rot);
            columns.spin_lambda.push(lambda);
        }
        columns
    });

    let is_spherical = direction == BinDirection::Spherical;
    ShellProfile {
        direction,
        outer_edge_kpc,
        shell_mass_1e10,
        enclosed_mass_1e10,
        log_density,
        enclosed_j,
        enclosed_j_mag,
        v_radial,
        v_azimuthal,
        v_polar: is_spherical.then(|| third.clone()),
        v_vertical: (!is_spherical).then_some(third),
        spherical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn massive(mass: f64) -> KinematicParticle {
        KinematicParticle {
            r_kpc: 1.0,
            theta_rad: 0.0,
            phi_rad: 0.0,
            v_r_kms: 0.0,
            v_theta_kms: 0.0,
            v_phi_kms: 0.0,
            r_cyl_kpc: 1.0,
            v_r_cyl_kms: 0.0,
            z_kpc: 0.0,
            v_z_kms: 0.0,
            j_1e10_kpc_kms: Vector3::zeros(),
            mass_1e10: mass,
        }
    }

    #[test]
    fn test_moments_are_mass_weighted() {
        let mut sums = ShellSums::zero();
        sums.add(&massive(3.0), [10.0, 0.0, 0.0]);
        sums.add(&massive(1.0), [30.0, 0.0, 0.0]);

        let m = sums.moments(0);
        // mean = (3*10 + 1*30)/4 = 15; var = (3*100 + 1*900)/4 - 225 = 225
        assert_relative_eq!(m.mean_kms, 15.0, epsilon = 1e-12);
        assert_relative_eq!(m.sigma_kms, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_sums_have_quiet_moments() {
        let sums = ShellSums::zero();
        let m = sums.moments(1);
        assert_eq!(m.mean_kms, 0.0);
        assert_eq!(m.sigma_kms, 0.0);
    }

    #[test]
    fn test_shell_volumes() {
        let sphere = shell_volume(BinDirection::Spherical, 0.0, 2.0, 10.0);
        assert_relative_eq!(sphere, 4.0 / 3.0 * PI * 8.0, epsilon = 1e-12);

        // annulus 1 < R < 2 through the full +-10 column
        let annulus = shell_volume(BinDirection::Cylindrical, 1.0, 2.0, 10.0);
        assert_relative_eq!(annulus, PI * 3.0 * 20.0, epsilon = 1e-12);

        // slab 0.5 < |z| < 1.0 over the R <= 10 disc, both signs of z
        let slab = shell_volume(BinDirection::Vertical, 0.5, 1.0, 10.0);
        assert_relative_eq!(slab, 2.0 * PI * 100.0 * 0.5, epsilon = 1e-12);
    }
}
