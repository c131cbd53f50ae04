//! Typed particle groups as delivered by a snapshot loader

use std::sync::Arc;

use nalgebra::Vector3;
use thiserror::Error;

use super::{Light, Particle, ParticleKind};

/// Errors raised when assembling a particle group from loader arrays
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("particle arrays must all have the same length")]
    LengthMismatch,

    #[error("particle masses must be non-negative")]
    NegativeMass,

    #[error("luminosity array must have one entry per particle")]
    LuminosityLengthMismatch,

    #[error("spectrum table must have one row per particle")]
    SpectrumRowMismatch,
}

/// Errors raised when building a luminosity spectrum table
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("wavelengths must be in ascending order")]
    NotAscending,

    #[error("each spectrum row must have one value per wavelength")]
    RowLengthMismatch,

    #[error("a spectrum table needs at least two wavelength samples")]
    TooFewSamples,
}

/// Per-particle luminosity sampled on a shared wavelength grid.
///
/// Loaders that carry spectra supply one wavelength array for the whole
/// group and one luminosity row per particle. Evaluation outside the
/// tabulated range returns zero, consistent with a band that has run out.
#[derive(Debug, Clone)]
pub struct SpectrumTable {
    /// Wavelengths in Angstroms, ascending
    wavelengths_aa: Vec<f64>,
    /// One luminosity row (solar luminosities per wavelength sample) per particle
    rows: Vec<Vec<f64>>,
}

impl SpectrumTable {
    /// Build a table from a shared wavelength grid and per-particle rows.
    pub fn from_rows(wavelengths_aa: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self, SpectrumError> {
        if wavelengths_aa.len() < 2 {
            return Err(SpectrumError::TooFewSamples);
        }
        for i in 1..wavelengths_aa.len() {
            if wavelengths_aa[i] <= wavelengths_aa[i - 1] {
                return Err(SpectrumError::NotAscending);
            }
        }
        for row in &rows {
            if row.len() != wavelengths_aa.len() {
                return Err(SpectrumError::RowLengthMismatch);
            }
        }

        Ok(Self {
            wavelengths_aa,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Linearly interpolated luminosity of one row at a wavelength.
    ///
    /// Returns 0.0 outside the tabulated wavelength range.
    pub fn at(&self, row: usize, wavelength_aa: f64) -> f64 {
        let grid = &self.wavelengths_aa;
        if wavelength_aa < grid[0] || wavelength_aa > *grid.last().unwrap() {
            return 0.0;
        }

        // index of the first grid point strictly above the target
        let hi = grid.partition_point(|&w| w <= wavelength_aa);
        if hi == grid.len() {
            return *self.rows[row].last().unwrap();
        }
        let lo = hi - 1;

        let t = (wavelength_aa - grid[lo]) / (grid[hi] - grid[lo]);
        self.rows[row][lo] * (1.0 - t) + self.rows[row][hi] * t
    }
}

/// Luminosity information attached to a whole group.
#[derive(Debug, Clone)]
enum GroupLight {
    /// No light: kind-default mass-to-light applies downstream
    None,
    /// One scalar luminosity (solar luminosities) per particle
    Scalars(Vec<f64>),
    /// Shared spectrum table, one row per particle
    Spectra(Arc<SpectrumTable>),
}

/// One particle type's worth of loader arrays, validated for consistency.
///
/// Positions are kpc, velocities km/s, masses 10^10 solar masses. The
/// loader interface is array-of-columns; this type normalizes it before
/// the catalog flattens it into [`Particle`](super::Particle) records.
#[derive(Debug, Clone)]
pub struct ParticleGroup {
    ids: Vec<u64>,
    positions_kpc: Vec<Vector3<f64>>,
    velocities_kms: Vec<Vector3<f64>>,
    masses_1e10: Vec<f64>,
    light: GroupLight,
}

impl ParticleGroup {
    /// Validate loader columns into a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays disagree in length or any mass is
    /// negative.
    #[allow(clippy::too_many_arguments)]
    pub fn from_arrays(
        ids: Vec<u64>,
        x_kpc: Vec<f64>,
        y_kpc: Vec<f64>,
        z_kpc: Vec<f64>,
        vx_kms: Vec<f64>,
        vy_kms: Vec<f64>,
        vz_kms: Vec<f64>,
        mass_1e10: Vec<f64>,
    ) -> Result<Self, GroupError> {
        let n = ids.len();
        if [
            x_kpc.len(),
            y_kpc.len(),
            z_kpc.len(),
            vx_kms.len(),
            vy_kms.len(),
            vz_kms.len(),
            mass_1e10.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(GroupError::LengthMismatch);
        }

        if mass_1e10.iter().any(|&m| m < 0.0) {
            return Err(GroupError::NegativeMass);
        }

        let positions_kpc = (0..n)
            .map(|i| Vector3::new(x_kpc[i], y_kpc[i], z_kpc[i]))
            .collect();
        let velocities_kms = (0..n)
            .map(|i| Vector3::new(vx_kms[i], vy_kms[i], vz_kms[i]))
            .collect();

        Ok(Self {
            ids,
            positions_kpc,
            velocities_kms,
            masses_1e10: mass_1e10,
            light: GroupLight::None,
        })
    }

    /// Attach one scalar luminosity per particle.
    pub fn with_luminosities(mut self, luminosities_lsun: Vec<f64>) -> Result<Self, GroupError> {
        if luminosities_lsun.len() != self.len() {
            return Err(GroupError::LuminosityLengthMismatch);
        }
        self.light = GroupLight::Scalars(luminosities_lsun);
        Ok(self)
    }

    /// Attach a spectrum table with one row per particle.
    pub fn with_spectra(mut self, table: SpectrumTable) -> Result<Self, GroupError> {
        if table.n_rows() != self.len() {
            return Err(GroupError::SpectrumRowMismatch);
        }
        self.light = GroupLight::Spectra(Arc::new(table));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flatten into particle records of the given kind.
    pub(super) fn emit(self, kind: ParticleKind, out: &mut Vec<Particle>) {
        for i in 0..self.ids.len() {
            let light = match &self.light {
                GroupLight::None => Light::Dark,
                GroupLight::Scalars(lums) => Light::Scalar(lums[i]),
                GroupLight::Spectra(table) => Light::Sampled {
                    table: Arc::clone(table),
                    row: i,
                },
            };
            out.push(Particle {
                id: self.ids[i],
                kind,
                position_kpc: self.positions_kpc[i],
                velocity_kms: self.velocities_kms[i],
                mass_1e10: self.masses_1e10[i],
                light,
            });
        }
    }
}
