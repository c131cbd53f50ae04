//! Polar-coordinate kinematics for the intrinsic-profile path.
//!
//! Each particle is decomposed into spherical (r, theta, phi) and
//! cylindrical (R, z) coordinates with the matching velocity components
//! and its angular momentum. Components that are undefined on the
//! coordinate axes (r = 0 or R = 0) are set to zero rather than left as
//! NaN, so shell statistics never see a poisoned value.

use nalgebra::Vector3;

use super::Galaxy;

/// A particle decomposed into polar coordinates and velocities.
#[derive(Debug, Clone, Copy)]
pub struct KinematicParticle {
    /// Spherical radius, kpc
    pub r_kpc: f64,
    /// Polar angle from the +z axis, radians; 0 at the origin
    pub theta_rad: f64,
    /// Azimuth in the x-y plane, radians
    pub phi_rad: f64,
    /// Radial velocity, km/s; 0 at r = 0
    pub v_r_kms: f64,
    /// Polar velocity, km/s; 0 on the z axis
    pub v_theta_kms: f64,
    /// Azimuthal velocity, km/s; 0 on the z axis
    pub v_phi_kms: f64,
    /// Cylindrical radius, kpc
    pub r_cyl_kpc: f64,
    /// Cylindrical radial velocity, km/s; 0 on the z axis
    pub v_r_cyl_kms: f64,
    /// Height above the x-y plane, kpc
    pub z_kpc: f64,
    /// Vertical velocity, km/s
    pub v_z_kms: f64,
    /// Angular momentum m * (r x v), 10^10 Msun kpc km/s
    pub j_1e10_kpc_kms: Vector3<f64>,
    /// Mass, 10^10 Msun
    pub mass_1e10: f64,
}

/// A catalog decomposed for shell profiling.
#[derive(Debug, Clone)]
pub struct KinematicGalaxy {
    pub particles: Vec<KinematicParticle>,
}

impl KinematicGalaxy {
    /// Decompose every particle of a catalog.
    ///
    /// The catalog is taken as-is; center it first if the profile should
    /// be measured about the center of mass.
    pub fn from_galaxy(galaxy: &Galaxy) -> Self {
        let particles = galaxy
            .particles()
            .iter()
            .map(|p| decompose(p.position_kpc, p.velocity_kms, p.mass_1e10))
            .collect();
        Self { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Total angular momentum of the decomposed set.
    pub fn total_j(&self) -> Vector3<f64> {
        self.particles
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.j_1e10_kpc_kms)
    }
}

fn decompose(position: Vector3<f64>, velocity: Vector3<f64>, mass: f64) -> KinematicParticle {
    let (x, y, z) = (position.x, position.y, position.z);
    let (vx, vy, vz) = (velocity.x, velocity.y, velocity.z);

    let r = position.norm();
    let r_cyl = x.hypot(y);

    let theta = if r > 0.0 {
        (z / r).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    };
    let phi = y.atan2(x);

    let v_r = if r > 0.0 { position.dot(&velocity) / r } else { 0.0 };
    let planar = x * vx + y * vy;
    let (v_phi, v_r_cyl) = if r_cyl > 0.0 {
        ((x * vy - y * vx) / r_cyl, planar / r_cyl)
    } else {
        (0.0, 0.0)
    };
    let v_theta = if r > 0.0 && r_cyl > 0.0 {
        (z * planar / r_cyl - r_cyl * vz) / r
    } else {
        0.0
    };

    KinematicParticle {
        r_kpc: r,
        theta_rad: theta,
        phi_rad: phi,
        v_r_kms: v_r,
        v_theta_kms: v_theta,
        v_phi_kms: v_phi,
        r_cyl_kpc: r_cyl,
        v_r_cyl_kms: v_r_cyl,
        z_kpc: z,
        v_z_kms: vz,
        j_1e10_kpc_kms: mass * position.cross(&velocity),
        mass_1e10: mass,
    }
}
