//! Sky-noise injection for the data cube.
//!
//! Noise is Gaussian per voxel with a standard deviation set by the
//! sky-brightness threshold magnitude against the photometric zero point.
//! Voxels are clamped at zero afterwards so the cube stays non-negative,
//! and bins outside the aperture footprint stay untouched.

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Noise standard deviation in linear flux for a threshold magnitude.
pub fn sky_sigma(mag_zero_point: f64, threshold_mag: f64) -> f64 {
    10f64.powf(-0.4 * (threshold_mag - mag_zero_point))
}

/// Add clamped Gaussian noise to every in-footprint voxel of a cube.
///
/// A fixed seed reproduces the same noise field; with `None` a seed is
/// drawn from the thread RNG.
pub fn apply_to_cube(
    data: &mut Array3<f64>,
    footprint: &Array2<bool>,
    sigma: f64,
    seed: Option<u64>,
) {
    let seed = seed.unwrap_or_else(|| rand::rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();

    let n_v = data.dim().2;
    for ((i, j), &inside) in footprint.indexed_iter() {
        if !inside {
            continue;
        }
        for k in 0..n_v {
            let voxel = &mut data[[i, j, k]];
            *voxel = (*voxel + normal.sample(&mut rng)).max(0.0);
        }
    }
}
