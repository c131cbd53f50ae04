//! Aperture geometry and the spatial bin grid.
//!
//! The grid is square with an odd or even number of bins per side, bin
//! centers symmetric about the optical axis. The footprint marks which
//! bins lie inside the aperture shape; everything outside is dead sky and
//! never receives flux. Physical coordinates couple to the grid through
//! the kpc-per-arcsec scale at the observation redshift.

use ndarray::Array2;
use thiserror::Error;

/// Aperture footprint shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApertureShape {
    /// Bins within a circle of diameter `fov`
    Circular,
    /// Bins within a regular hexagon of corner-to-corner diameter `fov`,
    /// flat edges top and bottom
    Hexagonal,
    /// Bins within a `fov` by `fov` square
    Square,
}

/// Errors raised while building an aperture grid
#[derive(Debug, Error)]
pub enum ApertureError {
    #[error(
        "aperture grid needs at least 2 bins per side; \
         {fov_arcsec} arcsec at {pixel_arcsec} arcsec per pixel gives {bins}"
    )]
    GridTooSmall {
        fov_arcsec: f64,
        pixel_arcsec: f64,
        bins: usize,
    },
}

/// Discretized aperture: bin grid, footprint and physical pixel scale.
#[derive(Debug, Clone)]
pub struct ApertureGrid {
    shape: ApertureShape,
    n_bins: usize,
    pixel_arcsec: f64,
    pixel_kpc: f64,
    half_extent_kpc: f64,
    centers_arcsec: Vec<f64>,
    footprint: Array2<bool>,
}

impl ApertureGrid {
    /// Build the grid for a field of view at a pixel scale.
    ///
    /// The bin count is the field of view divided by the pixel scale,
    /// rounded down; the grid therefore never extends past the field of
    /// view. `kpc_per_arcsec` is the angular scale at the observation
    /// redshift.
    pub fn new(
        shape: ApertureShape,
        fov_arcsec: f64,
        pixel_arcsec: f64,
        kpc_per_arcsec: f64,
    ) -> Result<Self, ApertureError> {
        let n_bins = (fov_arcsec / pixel_arcsec).floor() as usize;
        if n_bins < 2 {
            return Err(ApertureError::GridTooSmall {
                fov_arcsec,
                pixel_arcsec,
                bins: n_bins,
            });
        }

        let centers_arcsec: Vec<f64> = (0..n_bins)
            .map(|i| (i as f64 - (n_bins as f64 - 1.0) / 2.0) * pixel_arcsec)
            .collect();

        let radius = fov_arcsec / 2.0;
        let mut footprint = Array2::from_elem((n_bins, n_bins), false);
        for i in 0..n_bins {
            for j in 0..n_bins {
                footprint[[i, j]] =
                    inside_aperture(shape, centers_arcsec[i], centers_arcsec[j], radius);
            }
        }

        let pixel_kpc = pixel_arcsec * kpc_per_arcsec;
        Ok(Self {
            shape,
            n_bins,
            pixel_arcsec,
            pixel_kpc,
            half_extent_kpc: n_bins as f64 * pixel_kpc / 2.0,
            centers_arcsec,
            footprint,
        })
    }

    pub fn shape(&self) -> ApertureShape {
        self.shape
    }

    /// Bins per side.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn pixel_arcsec(&self) -> f64 {
        self.pixel_arcsec
    }

    /// Physical size of one pixel at the observation redshift.
    pub fn pixel_kpc(&self) -> f64 {
        self.pixel_kpc
    }

    /// Bin-center labels along either axis, arcsec.
    pub fn centers_arcsec(&self) -> &[f64] {
        &self.centers_arcsec
    }

    pub fn footprint(&self) -> &Array2<bool> {
        &self.footprint
    }

    /// Number of bins inside the aperture.
    pub fn n_inside(&self) -> usize {
        self.footprint.iter().filter(|&&inside| inside).count()
    }

    /// Spatial bin of a projected position, or `None` when the position
    /// falls off the grid or outside the footprint.
    pub fn bin_of(&self, x_kpc: f64, y_kpc: f64) -> Option<(usize, usize)> {
        let i = ((x_kpc + self.half_extent_kpc) / self.pixel_kpc).floor();
        let j = ((y_kpc + self.half_extent_kpc) / self.pixel_kpc).floor();
        if i < 0.0 || j < 0.0 {
            return None;
        }
        let (i, j) = (i as usize, j as usize);
        if i >= self.n_bins || j >= self.n_bins || !self.footprint[[i, j]] {
            return None;
        }
        Some((i, j))
    }
}

fn inside_aperture(shape: ApertureShape, x: f64, y: f64, radius: f64) -> bool {
    match shape {
        ApertureShape::Circular => x * x + y * y <= radius * radius,
        ApertureShape::Square => x.abs() <= radius && y.abs() <= radius,
        ApertureShape::Hexagonal => {
            // corners on the x axis, flat edges at the top and bottom
            let sqrt3 = 3.0_f64.sqrt();
            y.abs() <= sqrt3 * radius / 2.0 && y.abs() <= sqrt3 * (radius - x.abs())
        }
    }
}
