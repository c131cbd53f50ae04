//! 2D convolution of cube planes with a seeing kernel.
//!
//! Pixels beyond the plane edge read as zero, so flux blurred past the
//! boundary is lost rather than wrapped. Parallelism is per output pixel
//! through rayon.

use ndarray::{Array2, ArrayView2, Zip};
use num_traits::Float;

/// Convolve a plane with a kernel, zero-padded at the edges.
///
/// The kernel center is its middle element; kernels built by
/// [`super::psf`] are odd-sized and normalized.
pub fn convolve_plane<T>(input: ArrayView2<'_, T>, kernel: &Array2<T>, parallel: bool) -> Array2<T>
where
    T: Float + Send + Sync,
{
    let (kernel_rows, kernel_cols) = kernel.dim();
    let kr = kernel_rows / 2;
    let kc = kernel_cols / 2;

    let mut output = Array2::zeros(input.dim());

    let stencil = |(i, j): (usize, usize), out: &mut T| {
        let (rows, cols) = input.dim();
        let mut sum = T::zero();
        for ki in 0..kernel_rows {
            for kj in 0..kernel_cols {
                let ii = i as isize + ki as isize - kr as isize;
                let jj = j as isize + kj as isize - kc as isize;
                if ii >= 0 && ii < rows as isize && jj >= 0 && jj < cols as isize {
                    sum = sum + input[[ii as usize, jj as usize]] * kernel[[ki, kj]];
                }
            }
        }
        *out = sum;
    };

    if parallel {
        Zip::indexed(&mut output).par_for_each(stencil);
    } else {
        Zip::indexed(&mut output).for_each(stencil);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_identity_kernel() {
        let input = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let kernel = arr2(&[[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);

        let output = convolve_plane(input.view(), &kernel, false);
        for (a, b) in output.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_interior_flux_is_conserved() {
        // a point source far from the edge keeps all its flux under a
        // normalized kernel
        let mut input = Array2::zeros((21, 21));
        input[[10, 10]] = 5.0;
        let kernel = crate::observation::psf::gaussian_kernel(2.0);

        let output = convolve_plane(input.view(), &kernel, false);
        let total: f64 = output.iter().sum();
        assert!((total - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_flux_leaks_out() {
        let mut input = Array2::zeros((9, 9));
        input[[0, 0]] = 1.0;
        let kernel = crate::observation::psf::gaussian_kernel(3.0);

        let output = convolve_plane(input.view(), &kernel, false);
        let total: f64 = output.iter().sum();
        assert!(total < 1.0);
        assert!(total > 0.2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut input = Array2::zeros((16, 16));
        for (idx, v) in input.iter_mut().enumerate() {
            *v = (idx % 7) as f64 + 0.25;
        }
        let kernel =
            crate::observation::psf::moffat_kernel(2.5, crate::observation::psf::MOFFAT_BETA);

        let seq = convolve_plane(input.view(), &kernel, false);
        let par = convolve_plane(input.view(), &kernel, true);
        for (a, b) in seq.iter().zip(par.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
