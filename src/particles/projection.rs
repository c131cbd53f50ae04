//! Projection of a particle catalog into an inclined observer frame.
//!
//! The observer convention places the disc plane in x-y with the spin axis
//! along z. Inclination tilts the system about the x axis: 0 degrees is
//! face-on, 90 degrees edge-on. Line-of-sight velocity is positive for
//! receding particles.

use super::{FluxModel, Galaxy};

/// A particle as seen by the instrument, in the observer plane.
#[derive(Debug, Clone, Copy)]
pub struct ObservedParticle {
    /// Sky-plane coordinate along the rotation axis of the projection, kpc
    pub x_kpc: f64,
    /// Sky-plane coordinate perpendicular to it (foreshortened), kpc
    pub y_kpc: f64,
    /// Projected radius from the catalog center, kpc
    pub r_proj_kpc: f64,
    /// Line-of-sight velocity, km/s, positive receding
    pub v_los_kms: f64,
    /// Linear flux contributed by the particle
    pub flux: f64,
}

/// The luminous portion of a catalog in the observer frame.
#[derive(Debug, Clone)]
pub struct ObservedGalaxy {
    pub particles: Vec<ObservedParticle>,
    pub inclination_deg: f64,
    /// Sum of all particle fluxes, before any aperture or threshold cut
    pub total_flux: f64,
}

/// Project a catalog to the observer frame at the given inclination.
///
/// Flux is evaluated per particle through the supplied model; particles
/// with zero flux (dark matter, gas without a supplied luminosity) carry
/// no light and are omitted from the observed set. The source catalog is
/// not modified.
pub fn project(galaxy: &Galaxy, inclination_deg: f64, flux_model: &FluxModel) -> ObservedGalaxy {
    let inc = inclination_deg.to_radians();
    let (sin_i, cos_i) = inc.sin_cos();

    let mut particles = Vec::new();
    let mut total_flux = 0.0;

    for p in galaxy.particles() {
        let flux = flux_model.particle_flux(p);
        if flux <= 0.0 {
            continue;
        }

        let x = p.position_kpc.x;
        let y = p.position_kpc.y * cos_i - p.position_kpc.z * sin_i;
        let v_los = p.velocity_kms.y * sin_i + p.velocity_kms.z * cos_i;

        total_flux += flux;
        particles.push(ObservedParticle {
            x_kpc: x,
            y_kpc: y,
            r_proj_kpc: (x * x + y * y).sqrt(),
            v_los_kms: v_los,
            flux,
        });
    }

    ObservedGalaxy {
        particles,
        inclination_deg,
        total_flux,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::{ParticleGroup, ParticleKind};
    use approx::assert_relative_eq;

    fn flux_model() -> FluxModel {
        FluxModel {
            mass_to_light: 1.0,
            rest_wavelength_aa: 4800.0,
            distance_modulus_mag: 35.0,
            mag_zero_point: 8.9,
        }
    }

    fn single_star(pos: [f64; 3], vel: [f64; 3]) -> Galaxy {
        let group = ParticleGroup::from_arrays(
            vec![0],
            vec![pos[0]],
            vec![pos[1]],
            vec![pos[2]],
            vec![vel[0]],
            vec![vel[1]],
            vec![vel[2]],
            vec![1.0],
        )
        .unwrap();
        Galaxy::assemble(vec![(ParticleKind::Stars, group)])
    }

    #[test]
    fn test_face_on_sees_vertical_velocity() {
        let galaxy = single_star([1.0, 2.0, 3.0], [10.0, 20.0, 30.0]);
        let observed = project(&galaxy, 0.0, &flux_model());
        let p = &observed.particles[0];

        assert_relative_eq!(p.x_kpc, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y_kpc, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.v_los_kms, 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_on_sees_in_plane_velocity() {
        let galaxy = single_star([1.0, 2.0, 3.0], [10.0, 20.0, 30.0]);
        let observed = project(&galaxy, 90.0, &flux_model());
        let p = &observed.particles[0];

        assert_relative_eq!(p.x_kpc, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y_kpc, -3.0, epsilon = 1e-12);
        assert_relative_eq!(p.v_los_kms, 20.0, epsilon = 1e-12);
        assert_relative_eq!(p.r_proj_kpc, 10.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_edge_on_rigid_disc_velocity_tracks_x() {
        // rigid rotation about z: v = omega * (-y, x, 0)
        let omega = 2.0;
        let group = ParticleGroup::from_arrays(
            vec![0, 1, 2],
            vec![1.0, -2.0, 0.5],
            vec![0.5, 1.0, -1.0],
            vec![0.0, 0.0, 0.0],
            vec![-0.5 * omega, -1.0 * omega, 1.0 * omega],
            vec![1.0 * omega, -2.0 * omega, 0.5 * omega],
            vec![0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        let galaxy = Galaxy::assemble(vec![(ParticleKind::Disc, group)]);

        let observed = project(&galaxy, 90.0, &flux_model());
        for p in &observed.particles {
            assert_relative_eq!(p.v_los_kms, omega * p.x_kpc, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dark_particles_are_invisible() {
        let group = ParticleGroup::from_arrays(
            vec![0],
            vec![1.0],
            vec![1.0],
            vec![1.0],
            vec![0.0],
            vec![0.0],
            vec![0.0],
            vec![100.0],
        )
        .unwrap();
        let galaxy = Galaxy::assemble(vec![(ParticleKind::DarkMatter, group)]);

        let observed = project(&galaxy, 45.0, &flux_model());
        assert!(observed.particles.is_empty());
        assert_eq!(observed.total_flux, 0.0);
    }

    #[test]
    fn test_total_flux_accumulates() {
        let group = ParticleGroup::from_arrays(
            vec![0, 1],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
        )
        .unwrap();
        let galaxy = Galaxy::assemble(vec![(ParticleKind::Stars, group)]);

        let observed = project(&galaxy, 30.0, &flux_model());
        let sum: f64 = observed.particles.iter().map(|p| p.flux).sum();
        assert_relative_eq!(observed.total_flux, sum, epsilon = 1e-12);
        assert!(observed.total_flux > 0.0);
    }
}
