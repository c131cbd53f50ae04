//! The observed spin statistic.
//!
//! λ_R compares ordered to total line-of-sight motion, flux-weighted and
//! radius-weighted over the measurement ellipse:
//!
//! λ_R = Σ F·R·|V| / Σ F·R·√(V² + σ²)
//!
//! Every denominator term dominates its numerator term, so the statistic
//! lands in [0, 1]: 1 for pure rotation, 0 for pure pressure support.

use ndarray::Array2;
use thiserror::Error;

use super::ellipse::MeasurementEllipse;
use super::images::KinematicMaps;

/// Errors raised by the spin estimator
#[derive(Debug, Error)]
pub enum SpinError {
    #[error("no flux inside the measurement ellipse; spin is undefined")]
    EmptyAperture,
}

/// The observed spin statistic and its ingredients.
#[derive(Debug, Clone, Copy)]
pub struct SpinMeasurement {
    /// Flux- and radius-weighted rotation measure in [0, 1]
    pub lambda_r: f64,
    /// Flux-weighted ratio sqrt(Σ F·V² / Σ F·σ²); `None` when the
    /// dispersion map is zero over the aperture
    pub v_over_sigma: Option<f64>,
    /// Spatial bins that contributed to the sums
    pub pixels_used: usize,
}

/// Integrate λ_R over the pixels inside the measurement ellipse.
///
/// Only bins inside both the ellipse and the aperture footprint count,
/// and only where the flux image is positive. The pixel radius is
/// measured from the ellipse centre.
///
/// # Errors
///
/// [`SpinError::EmptyAperture`] when the weighted denominator vanishes,
/// which happens when every candidate bin is masked or fluxless.
pub fn lambda_r(
    maps: &KinematicMaps,
    footprint: &Array2<bool>,
    ellipse: &MeasurementEllipse,
) -> Result<SpinMeasurement, SpinError> {
    let mut num = 0.0;
    let mut den = 0.0;
    let mut vs_num = 0.0;
    let mut vs_den = 0.0;
    let mut pixels_used = 0;

    for ((i, j), &f) in maps.flux.indexed_iter() {
        if f <= 0.0 || !footprint[[i, j]] || !ellipse.contains(i as f64, j as f64) {
            continue;
        }
        let v = maps.velocity_kms[[i, j]];
        let sigma = maps.dispersion_kms[[i, j]];
        let dx = i as f64 - ellipse.center_px.0;
        let dy = j as f64 - ellipse.center_px.1;
        let r = dx.hypot(dy);

        num += f * r * v.abs();
        den += f * r * (v * v + sigma * sigma).sqrt();
        vs_num += f * v * v;
        vs_den += f * sigma * sigma;
        pixels_used += 1;
    }

    if den <= 0.0 {
        return Err(SpinError::EmptyAperture);
    }

    let v_over_sigma = if vs_den > 0.0 {
        Some((vs_num / vs_den).sqrt())
    } else {
        None
    };

    Ok(SpinMeasurement {
        lambda_r: num / den,
        v_over_sigma,
        pixels_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn circle(center: f64, radius: f64) -> MeasurementEllipse {
        MeasurementEllipse {
            center_px: (center, center),
            semi_major_px: radius,
            semi_minor_px: radius,
            semi_major_kpc: radius,
            semi_minor_kpc: radius,
            position_angle_rad: 0.0,
            enclosed_fraction: 1.0,
            clipped: false,
        }
    }

    fn uniform_maps(n: usize, v: f64, sigma: f64) -> (KinematicMaps, Array2<bool>) {
        let maps = KinematicMaps {
            flux: Array2::from_elem((n, n), 1.0),
            velocity_kms: Array2::from_elem((n, n), v),
            dispersion_kms: Array2::from_elem((n, n), sigma),
        };
        (maps, Array2::from_elem((n, n), true))
    }

    #[test]
    fn test_pure_rotation_gives_unity() {
        let (maps, footprint) = uniform_maps(9, 120.0, 0.0);
        let spin = lambda_r(&maps, &footprint, &circle(4.0, 10.0)).unwrap();
        assert_relative_eq!(spin.lambda_r, 1.0, epsilon = 1e-12);
        assert!(spin.v_over_sigma.is_none());
        assert_eq!(spin.pixels_used, 81);
    }

    #[test]
    fn test_pure_dispersion_gives_zero() {
        let (maps, footprint) = uniform_maps(9, 0.0, 80.0);
        let spin = lambda_r(&maps, &footprint, &circle(4.0, 10.0)).unwrap();
        assert_relative_eq!(spin.lambda_r, 0.0, epsilon = 1e-12);
        assert_relative_eq!(spin.v_over_sigma.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hand_computed_mix() {
        let n = 5;
        let mut maps = KinematicMaps {
            flux: Array2::zeros((n, n)),
            velocity_kms: Array2::zeros((n, n)),
            dispersion_kms: Array2::zeros((n, n)),
        };
        let footprint = Array2::from_elem((n, n), true);
        // one pixel at R = 1 rotating, one at R = 2 dispersing
        maps.flux[[2, 3]] = 2.0;
        maps.velocity_kms[[2, 3]] = 3.0;
        maps.dispersion_kms[[2, 3]] = 4.0;
        maps.flux[[4, 2]] = 1.0;
        maps.dispersion_kms[[4, 2]] = 2.0;

        let spin = lambda_r(&maps, &footprint, &circle(2.0, 10.0)).unwrap();
        // num = 2*1*3 = 6; den = 2*1*5 + 1*2*2 = 14
        assert_relative_eq!(spin.lambda_r, 6.0 / 14.0, epsilon = 1e-12);
        // v/sigma = sqrt(2*9 / (2*16 + 1*4)) = sqrt(0.5)
        assert_relative_eq!(spin.v_over_sigma.unwrap(), 0.5_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(spin.pixels_used, 2);
    }

    #[test]
    fn test_bounded_for_mixed_fields() {
        let n = 11;
        let flux = Array2::from_shape_fn((n, n), |(i, j)| 1.0 + ((i * 7 + j * 3) % 5) as f64);
        let velocity_kms =
            Array2::from_shape_fn((n, n), |(i, _)| 150.0 * (i as f64 - 5.0) / 5.0);
        let dispersion_kms =
            Array2::from_shape_fn((n, n), |(_, j)| 40.0 + 10.0 * (j % 3) as f64);
        let maps = KinematicMaps {
            flux,
            velocity_kms,
            dispersion_kms,
        };
        let footprint = Array2::from_elem((n, n), true);

        let spin = lambda_r(&maps, &footprint, &circle(5.0, 8.0)).unwrap();
        assert!(spin.lambda_r > 0.0 && spin.lambda_r < 1.0);
    }

    #[test]
    fn test_empty_aperture_is_error() {
        let (maps, footprint) = uniform_maps(9, 100.0, 50.0);
        // ellipse entirely off the grid
        let far = MeasurementEllipse {
            center_px: (40.0, 40.0),
            ..circle(4.0, 2.0)
        };
        assert!(matches!(
            lambda_r(&maps, &footprint, &far),
            Err(SpinError::EmptyAperture)
        ));
    }

    #[test]
    fn test_masked_pixels_do_not_count() {
        let (maps, mut footprint) = uniform_maps(9, 100.0, 50.0);
        footprint.fill(false);
        assert!(matches!(
            lambda_r(&maps, &footprint, &circle(4.0, 10.0)),
            Err(SpinError::EmptyAperture)
        ));
    }
}
