//! Algorithms shared across the observation pipeline
//!
//! This module provides flux-weighted image moments and the covariance
//! ellipse fit used to characterize projected galaxy shapes.

pub mod moments;

pub use moments::{CovarianceEllipse, FluxMoments};
