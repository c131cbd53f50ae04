//! Collapsing the spectral cube into kinematic maps.
//!
//! The cube reduces along its velocity axis to a flux image, a
//! flux-weighted mean line-of-sight velocity image, and a flux-weighted
//! velocity dispersion image. This module also defines the calibration
//! and metadata records an external serializer needs to write those maps
//! to disk; file formats are the serializer's concern.

use ndarray::{Array2, Axis, Zip};

use super::cube::SpectralCube;

/// Which collapsed map a bundle carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Flux,
    Velocity,
    Dispersion,
}

/// Flux, velocity and dispersion images collapsed from a cube.
///
/// Bins with no flux hold zero in all three maps rather than NaN, so the
/// maps can be summed and masked without poisoning downstream statistics.
#[derive(Debug, Clone)]
pub struct KinematicMaps {
    /// Total flux per spatial bin
    pub flux: Array2<f64>,
    /// Flux-weighted mean line-of-sight velocity, km/s
    pub velocity_kms: Array2<f64>,
    /// Flux-weighted line-of-sight velocity dispersion, km/s
    pub dispersion_kms: Array2<f64>,
}

impl KinematicMaps {
    /// Collapse a cube along its velocity axis.
    pub fn collapse(cube: &SpectralCube) -> Self {
        let (nx, ny, _) = cube.data.dim();
        let mut flux = Array2::zeros((nx, ny));
        let mut velocity_kms = Array2::zeros((nx, ny));
        let mut dispersion_kms = Array2::zeros((nx, ny));

        Zip::indexed(cube.data.lanes(Axis(2))).for_each(|(i, j), lane| {
            let mut f = 0.0;
            let mut m1 = 0.0;
            let mut m2 = 0.0;
            for (k, &c) in lane.iter().enumerate() {
                let v = cube.v_centers_kms[k];
                f += c;
                m1 += c * v;
                m2 += c * v * v;
            }
            if f > 0.0 {
                let mean = m1 / f;
                flux[[i, j]] = f;
                velocity_kms[[i, j]] = mean;
                // clamp the variance: cancellation can push it a hair negative
                dispersion_kms[[i, j]] = (m2 / f - mean * mean).max(0.0).sqrt();
            }
        });

        Self {
            flux,
            velocity_kms,
            dispersion_kms,
        }
    }

    pub fn map(&self, kind: MapKind) -> &Array2<f64> {
        match kind {
            MapKind::Flux => &self.flux,
            MapKind::Velocity => &self.velocity_kms,
            MapKind::Dispersion => &self.dispersion_kms,
        }
    }
}

/// World calibration for a collapsed map's axes.
#[derive(Debug, Clone, Copy)]
pub struct AxisCalibration {
    /// Spatial pixel scale, arcsec
    pub pixel_arcsec: f64,
    /// Velocity channel width, km/s
    pub velocity_pixel_kms: f64,
    /// Redshift the angular scale was evaluated at
    pub redshift: f64,
    /// Observed central wavelength the velocity axis is referenced to, Angstroms
    pub reference_wavelength_aa: f64,
}

/// Structural scale lengths of the source galaxy's components, kpc.
///
/// These come from the snapshot the catalog was read from; the pipeline
/// never reads them, it only carries them into exported metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentScales {
    pub disc_kpc: Option<f64>,
    pub bulge_kpc: Option<f64>,
    pub halo_kpc: Option<f64>,
}

/// Descriptive metadata attached to every exported map.
#[derive(Debug, Clone)]
pub struct ObservationMeta {
    /// Observation label
    pub name: String,
    /// Inclination the catalog was projected at, degrees
    pub inclination_deg: f64,
    /// Virial radius of the source halo, kpc
    pub r200_kpc: Option<f64>,
    /// Structural scale lengths of the source galaxy
    pub component_scales: ComponentScales,
    /// Faint-end magnitude cut applied per particle
    pub mag_threshold: Option<f64>,
    /// Standard deviation of the injected sky noise, linear flux units
    pub sky_noise_sigma: Option<f64>,
}

/// One collapsed map plus everything a serializer needs to write it.
#[derive(Debug, Clone, Copy)]
pub struct ImageBundle<'a> {
    pub kind: MapKind,
    pub data: &'a Array2<f64>,
    pub calibration: AxisCalibration,
    pub meta: &'a ObservationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn hand_cube() -> SpectralCube {
        let mut data = Array3::zeros((2, 2, 3));
        // bin (0,0): equal flux at -10 and +10 km/s
        data[[0, 0, 0]] = 1.0;
        data[[0, 0, 2]] = 1.0;
        // bin (0,1): all flux at rest
        data[[0, 1, 1]] = 2.0;
        // bin (1,0): all flux at +10
        data[[1, 0, 2]] = 3.0;
        // bin (1,1): empty
        SpectralCube {
            data,
            x_centers_arcsec: vec![0.0, 1.0],
            y_centers_arcsec: vec![0.0, 1.0],
            v_centers_kms: vec![-10.0, 0.0, 10.0],
            v_pixel_kms: 10.0,
            pixel_arcsec: 1.0,
            pixel_kpc: 1.0,
            footprint: Array2::from_elem((2, 2), true),
            shape_ellipse: None,
        }
    }

    #[test]
    fn test_collapse_moments() {
        let maps = KinematicMaps::collapse(&hand_cube());

        assert_relative_eq!(maps.flux[[0, 0]], 2.0);
        assert_relative_eq!(maps.velocity_kms[[0, 0]], 0.0);
        assert_relative_eq!(maps.dispersion_kms[[0, 0]], 10.0);

        assert_relative_eq!(maps.flux[[0, 1]], 2.0);
        assert_relative_eq!(maps.velocity_kms[[0, 1]], 0.0);
        assert_relative_eq!(maps.dispersion_kms[[0, 1]], 0.0);

        assert_relative_eq!(maps.flux[[1, 0]], 3.0);
        assert_relative_eq!(maps.velocity_kms[[1, 0]], 10.0);
        assert_relative_eq!(maps.dispersion_kms[[1, 0]], 0.0);
    }

    #[test]
    fn test_empty_bins_stay_zero() {
        let maps = KinematicMaps::collapse(&hand_cube());
        assert_eq!(maps.flux[[1, 1]], 0.0);
        assert_eq!(maps.velocity_kms[[1, 1]], 0.0);
        assert_eq!(maps.dispersion_kms[[1, 1]], 0.0);
    }

    #[test]
    fn test_map_accessor() {
        let maps = KinematicMaps::collapse(&hand_cube());
        assert_eq!(maps.map(MapKind::Flux)[[1, 0]], maps.flux[[1, 0]]);
        assert_eq!(
            maps.map(MapKind::Velocity)[[1, 0]],
            maps.velocity_kms[[1, 0]]
        );
        assert_eq!(
            maps.map(MapKind::Dispersion)[[0, 0]],
            maps.dispersion_kms[[0, 0]]
        );
    }

    #[test]
    fn test_collapse_recovers_line_center_and_width() {
        use crate::observation::aperture::{ApertureGrid, ApertureShape};
        use crate::observation::cube::build_cube;
        use crate::particles::{ObservedGalaxy, ObservedParticle};

        let grid = ApertureGrid::new(ApertureShape::Circular, 16.0, 1.0, 1.0).unwrap();
        let obs = ObservedGalaxy {
            particles: vec![ObservedParticle {
                x_kpc: 0.0,
                y_kpc: 0.0,
                r_proj_kpc: 0.0,
                v_los_kms: 37.0,
                flux: 1.0,
            }],
            inclination_deg: 90.0,
            total_flux: 1.0,
        };
        let sigma = 20.0;
        let dv = 10.0;
        let cube = build_cube(&obs, &grid, dv, sigma, None, false).unwrap();
        let maps = KinematicMaps::collapse(&cube);

        assert_relative_eq!(maps.velocity_kms[[8, 8]], 37.0, epsilon = 1e-3);
        // channel binning adds dv^2/12 of variance to the recovered width
        let expected = (sigma * sigma + dv * dv / 12.0).sqrt();
        assert_relative_eq!(maps.dispersion_kms[[8, 8]], expected, max_relative = 1e-3);
    }
}
