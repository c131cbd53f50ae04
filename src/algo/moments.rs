//! Flux-weighted moment calculation for galaxy shape analysis
//!
//! This module provides functionality for calculating weighted moments up to
//! second order, used for centroid determination and for fitting the
//! covariance ellipse that describes a projected flux distribution.

use nalgebra::Matrix2;
use ndarray::Array2;

/// Weighted moments up to second order.
///
/// Moments can be accumulated either from a 2D flux image (pixel index
/// coordinates) or from a weighted point set (physical coordinates). Both
/// feed the same centroid and covariance machinery.
#[derive(Debug, Clone)]
pub struct FluxMoments {
    /// Total weight (zeroth moment)
    pub m00: f64,
    /// First moment in x
    pub m10: f64,
    /// First moment in y
    pub m01: f64,
    /// Second cross moment xy
    pub m11: f64,
    /// Second moment in x
    pub m20: f64,
    /// Second moment in y
    pub m02: f64,
}

/// Shape of a flux distribution derived from its second-moment covariance.
///
/// The axis ratio is the square root of the eigenvalue ratio of the
/// covariance matrix, so a circularly symmetric distribution gives 1.0.
#[derive(Debug, Clone, Copy)]
pub struct CovarianceEllipse {
    /// Minor/major axis ratio in (0, 1]
    pub axis_ratio: f64,
    /// Major-axis position angle in radians, measured from +x, in [0, π)
    pub position_angle_rad: f64,
    /// RMS extent along the major axis, in the input coordinate unit
    pub sigma_major: f64,
    /// RMS extent along the minor axis, in the input coordinate unit
    pub sigma_minor: f64,
}

impl FluxMoments {
    /// Accumulate moments over an image, where x is the first array axis
    /// and y the second, both in pixel index coordinates.
    pub fn from_image(data: &Array2<f64>) -> Self {
        let mut moments = Self::empty();
        for ((x, y), &value) in data.indexed_iter() {
            if value > 0.0 {
                moments.push(x as f64, y as f64, value);
            }
        }
        moments
    }

    /// Accumulate moments over (x, y, weight) triples.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let mut moments = Self::empty();
        for (x, y, weight) in points {
            if weight > 0.0 {
                moments.push(x, y, weight);
            }
        }
        moments
    }

    fn empty() -> Self {
        Self {
            m00: 0.0,
            m10: 0.0,
            m01: 0.0,
            m11: 0.0,
            m20: 0.0,
            m02: 0.0,
        }
    }

    fn push(&mut self, x: f64, y: f64, weight: f64) {
        self.m00 += weight;
        self.m10 += x * weight;
        self.m01 += y * weight;
        self.m11 += x * y * weight;
        self.m20 += x * x * weight;
        self.m02 += y * y * weight;
    }

    /// Weighted centroid, or `None` if total weight is not positive.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 <= 0.0 {
            return None;
        }

        let x = self.m10 / self.m00;
        let y = self.m01 / self.m00;

        if x.is_finite() && y.is_finite() {
            Some((x, y))
        } else {
            None
        }
    }

    /// Central second-moment covariance matrix, normalized by total weight.
    pub fn covariance(&self) -> Option<Matrix2<f64>> {
        let (cx, cy) = self.centroid()?;
        let mu20 = self.m20 / self.m00 - cx * cx;
        let mu02 = self.m02 / self.m00 - cy * cy;
        let mu11 = self.m11 / self.m00 - cx * cy;
        Some(Matrix2::new(mu20, mu11, mu11, mu02))
    }

    /// Fit the covariance ellipse of the distribution.
    ///
    /// Returns `None` when the total weight is not positive or the
    /// distribution is degenerate (zero extent along its major axis).
    pub fn ellipse(&self) -> Option<CovarianceEllipse> {
        let cov = self.covariance()?;
        let eigen = cov.symmetric_eigen();

        // symmetric_eigen does not order eigenvalues
        let (major_idx, minor_idx) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };

        let var_major = eigen.eigenvalues[major_idx];
        // clamp tiny negative eigenvalues from floating-point cancellation
        let var_minor = eigen.eigenvalues[minor_idx].max(0.0);
        if var_major <= 0.0 {
            return None;
        }

        let axis = eigen.eigenvectors.column(major_idx);
        let mut angle = axis[1].atan2(axis[0]);
        if angle < 0.0 {
            angle += std::f64::consts::PI;
        }
        if angle >= std::f64::consts::PI {
            angle -= std::f64::consts::PI;
        }

        Some(CovarianceEllipse {
            axis_ratio: (var_minor / var_major).sqrt(),
            position_angle_rad: angle,
            sigma_major: var_major.sqrt(),
            sigma_minor: var_minor.sqrt(),
        })
    }
}
