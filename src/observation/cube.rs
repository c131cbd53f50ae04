//! The spectral data cube and its flux-deposit machinery.
//!
//! Each observed particle lands in one spatial bin and spreads its flux
//! along the velocity axis as a Gaussian line profile with the LSF
//! standard deviation, integrated exactly over each channel. Spreading
//! by channel integrals rather than nearest-channel deposits is what
//! gives a rotating system its smooth cube gradients.
//!
//! The velocity axis is symmetric about zero, sized from the fastest
//! accepted particle plus a tail margin wide enough that truncation is
//! negligible against the total flux.

use ndarray::{Array2, Array3, Axis, Zip};
use rayon::prelude::*;
use scilib::math::basic::erf;
use std::f64::consts::SQRT_2;
use thiserror::Error;

use crate::algo::{CovarianceEllipse, FluxMoments};
use crate::particles::ObservedGalaxy;

use super::aperture::ApertureGrid;
use super::config::SkyNoise;
use super::convolve::convolve_plane;
use super::noise;
use super::psf::PsfConfig;

/// Half-width of the per-particle deposit window, in LSF sigmas. The
/// velocity axis is padded by the same margin, so the fastest particle
/// still has its full window on the axis.
const LSF_WINDOW_SIGMA: f64 = 5.0;

/// Particles per rayon work unit when depositing in parallel.
const DEPOSIT_CHUNK: usize = 4096;

/// Errors raised while building a cube
#[derive(Debug, Error)]
pub enum CubeError {
    #[error("no particles fall inside the aperture above the flux threshold")]
    NoVisibleParticles,
}

/// A spatial x spatial x velocity flux cube with its axis labels.
#[derive(Debug, Clone)]
pub struct SpectralCube {
    /// Accumulated flux, indexed [x bin, y bin, velocity bin]
    pub data: Array3<f64>,
    /// Bin-center labels of the first spatial axis, arcsec
    pub x_centers_arcsec: Vec<f64>,
    /// Bin-center labels of the second spatial axis, arcsec
    pub y_centers_arcsec: Vec<f64>,
    /// Channel-center labels of the velocity axis, km/s
    pub v_centers_kms: Vec<f64>,
    /// Velocity channel width, km/s
    pub v_pixel_kms: f64,
    /// Spatial pixel scale, arcsec
    pub pixel_arcsec: f64,
    /// Spatial pixel scale at the observation redshift, kpc
    pub pixel_kpc: f64,
    /// Aperture footprint shared by every velocity plane
    pub footprint: Array2<bool>,
    /// Covariance ellipse of the accepted particles' flux distribution,
    /// in sky-plane kpc; `None` when degenerate
    pub shape_ellipse: Option<CovarianceEllipse>,
}

impl SpectralCube {
    /// Total flux currently held in the cube.
    pub fn total_flux(&self) -> f64 {
        self.data.sum()
    }

    pub fn n_velocity_bins(&self) -> usize {
        self.v_centers_kms.len()
    }

    /// Blur every velocity plane with a seeing kernel.
    ///
    /// Bins outside the footprint are zeroed again afterwards: dead sky
    /// records nothing, so flux blurred past the aperture edge is lost.
    pub fn convolve_psf(&mut self, psf: &PsfConfig, parallel: bool) {
        let kernel = psf.kernel(self.pixel_arcsec);
        for k in 0..self.n_velocity_bins() {
            let blurred = convolve_plane(self.data.index_axis(Axis(2), k), &kernel, parallel);
            let mut plane = self.data.index_axis_mut(Axis(2), k);
            Zip::from(&mut plane)
                .and(&blurred)
                .and(&self.footprint)
                .for_each(|dst, &src, &inside| {
                    *dst = if inside { src } else { 0.0 };
                });
        }
    }

    /// Inject sky noise into every in-footprint voxel.
    pub fn add_sky_noise(&mut self, sky: &SkyNoise) {
        let sigma = noise::sky_sigma(sky.mag_zero_point, sky.threshold_mag);
        noise::apply_to_cube(&mut self.data, &self.footprint, sigma, sky.seed);
    }
}

/// One accepted particle, resolved to its spatial bin.
#[derive(Debug, Clone, Copy)]
struct Deposit {
    i: usize,
    j: usize,
    v_kms: f64,
    flux: f64,
}

/// Symmetric velocity axis in whole channels.
#[derive(Debug, Clone, Copy)]
struct VelocityAxis {
    n: usize,
    pixel: f64,
}

impl VelocityAxis {
    /// Smallest symmetric axis whose edges cover `vmax + pad`.
    fn spanning(vmax: f64, pad: f64, pixel: f64) -> Self {
        let half_bins = ((vmax + pad) / pixel - 0.5).ceil().max(1.0) as usize;
        Self {
            n: 2 * half_bins + 1,
            pixel,
        }
    }

    fn centers(&self) -> Vec<f64> {
        (0..self.n)
            .map(|k| (k as f64 - (self.n as f64 - 1.0) / 2.0) * self.pixel)
            .collect()
    }

    fn bottom_edge(&self) -> f64 {
        -(self.n as f64) * self.pixel / 2.0
    }

    /// Lower edge of channel `k`.
    fn edge(&self, k: usize) -> f64 {
        self.bottom_edge() + k as f64 * self.pixel
    }
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Spread one particle's flux across the velocity channels its Gaussian
/// line profile touches. A zero LSF width drops the whole line into its
/// containing channel.
fn deposit_into(data: &mut Array3<f64>, axis: &VelocityAxis, sigma_kms: f64, d: &Deposit) {
    if sigma_kms <= 0.0 {
        let k = (((d.v_kms - axis.bottom_edge()) / axis.pixel).floor().max(0.0) as usize)
            .min(axis.n - 1);
        data[[d.i, d.j, k]] += d.flux;
        return;
    }

    let lo_v = d.v_kms - LSF_WINDOW_SIGMA * sigma_kms;
    let hi_v = d.v_kms + LSF_WINDOW_SIGMA * sigma_kms;
    let bottom = axis.bottom_edge();

    let k_lo = ((lo_v - bottom) / axis.pixel).floor().max(0.0) as usize;
    let k_hi = (((hi_v - bottom) / axis.pixel).floor() as usize).min(axis.n - 1);

    let mut below = normal_cdf((axis.edge(k_lo) - d.v_kms) / sigma_kms);
    for k in k_lo..=k_hi {
        let above = normal_cdf((axis.edge(k + 1) - d.v_kms) / sigma_kms);
        data[[d.i, d.j, k]] += d.flux * (above - below);
        below = above;
    }
}

/// Bin an observed galaxy into a spectral cube.
///
/// Particles outside the aperture footprint are discarded, as are
/// particles below `flux_floor` when one is given. The parallel path
/// deposits chunks of particles into partial cubes and sums them; every
/// deposit lands in the same voxel either way, so the two paths agree to
/// floating-point addition order.
///
/// # Errors
///
/// [`CubeError::NoVisibleParticles`] when nothing survives the aperture
/// and threshold cuts.
pub fn build_cube(
    observed: &ObservedGalaxy,
    grid: &ApertureGrid,
    v_pixel_kms: f64,
    lsf_sigma_kms: f64,
    flux_floor: Option<f64>,
    parallel: bool,
) -> Result<SpectralCube, CubeError> {
    let floor = flux_floor.unwrap_or(0.0);

    let mut deposits = Vec::with_capacity(observed.particles.len());
    let mut points = Vec::with_capacity(observed.particles.len());
    for p in &observed.particles {
        if p.flux < floor {
            continue;
        }
        if let Some((i, j)) = grid.bin_of(p.x_kpc, p.y_kpc) {
            deposits.push(Deposit {
                i,
                j,
                v_kms: p.v_los_kms,
                flux: p.flux,
            });
            points.push((p.x_kpc, p.y_kpc, p.flux));
        }
    }
    if deposits.is_empty() {
        return Err(CubeError::NoVisibleParticles);
    }

    let vmax = deposits
        .iter()
        .map(|d| d.v_kms.abs())
        .fold(0.0, f64::max);
    let axis = VelocityAxis::spanning(vmax, LSF_WINDOW_SIGMA * lsf_sigma_kms, v_pixel_kms);

    let shape_ellipse = FluxMoments::from_points(points).ellipse();

    let n = grid.n_bins();
    let dim = (n, n, axis.n);
    let data = if parallel {
        deposits
            .par_chunks(DEPOSIT_CHUNK)
            .fold(
                || Array3::zeros(dim),
                |mut acc, chunk| {
                    for d in chunk {
                        deposit_into(&mut acc, &axis, lsf_sigma_kms, d);
                    }
                    acc
                },
            )
            .reduce(|| Array3::zeros(dim), |a, b| a + b)
    } else {
        let mut acc = Array3::zeros(dim);
        for d in &deposits {
            deposit_into(&mut acc, &axis, lsf_sigma_kms, d);
        }
        acc
    };

    Ok(SpectralCube {
        data,
        x_centers_arcsec: grid.centers_arcsec().to_vec(),
        y_centers_arcsec: grid.centers_arcsec().to_vec(),
        v_centers_kms: axis.centers(),
        v_pixel_kms,
        pixel_arcsec: grid.pixel_arcsec(),
        pixel_kpc: grid.pixel_kpc(),
        footprint: grid.footprint().clone(),
        shape_ellipse,
    })
}
