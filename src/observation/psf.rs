//! Analytic seeing kernels: Gaussian and Moffat.
//!
//! Kernels are built in pixel units from a FWHM in arcsec and normalized
//! to unit sum, so convolving a cube plane conserves flux up to what
//! leaks past the kernel edge.

use ndarray::Array2;

use crate::constants::FWHM_PER_SIGMA;

/// Moffat shape parameter for atmospheric turbulence.
pub const MOFFAT_BETA: f64 = 4.765;

/// Seeing-kernel families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsfKind {
    Gaussian,
    Moffat,
}

/// Point-spread-function descriptor.
#[derive(Debug, Clone, Copy)]
pub struct PsfConfig {
    pub kind: PsfKind,
    pub fwhm_arcsec: f64,
}

impl PsfConfig {
    pub fn gaussian(fwhm_arcsec: f64) -> Self {
        Self {
            kind: PsfKind::Gaussian,
            fwhm_arcsec,
        }
    }

    pub fn moffat(fwhm_arcsec: f64) -> Self {
        Self {
            kind: PsfKind::Moffat,
            fwhm_arcsec,
        }
    }

    /// Realize the kernel at a pixel scale.
    pub fn kernel(&self, pixel_arcsec: f64) -> Array2<f64> {
        let fwhm_px = self.fwhm_arcsec / pixel_arcsec;
        match self.kind {
            PsfKind::Gaussian => gaussian_kernel(fwhm_px),
            PsfKind::Moffat => moffat_kernel(fwhm_px, MOFFAT_BETA),
        }
    }
}

/// Normalized 2D Gaussian kernel with the given FWHM in pixels.
///
/// The kernel extends to four standard deviations, which keeps the
/// truncated tail mass negligible.
pub fn gaussian_kernel(fwhm_px: f64) -> Array2<f64> {
    let sigma = fwhm_px / FWHM_PER_SIGMA;
    let half = (4.0 * sigma).ceil().max(1.0) as usize;
    build_radial_kernel(half, |r2| (-r2 / (2.0 * sigma * sigma)).exp())
}

/// Normalized 2D Moffat kernel with the given FWHM in pixels.
///
/// Moffat wings fall off slowly, so the kernel extends to three FWHM.
pub fn moffat_kernel(fwhm_px: f64, beta: f64) -> Array2<f64> {
    let alpha = fwhm_px / (2.0 * (2.0_f64.powf(1.0 / beta) - 1.0).sqrt());
    let half = (3.0 * fwhm_px).ceil().max(1.0) as usize;
    build_radial_kernel(half, |r2| (1.0 + r2 / (alpha * alpha)).powf(-beta))
}

fn build_radial_kernel<F>(half: usize, profile: F) -> Array2<f64>
where
    F: Fn(f64) -> f64,
{
    let size = 2 * half + 1;
    let mut kernel = Array2::zeros((size, size));
    let mut sum = 0.0;

    for i in 0..size {
        for j in 0..size {
            let x = i as f64 - half as f64;
            let y = j as f64 - half as f64;
            let value = profile(x * x + y * y);
            kernel[[i, j]] = value;
            sum += value;
        }
    }

    kernel.mapv_inplace(|v| v / sum);
    kernel
}
