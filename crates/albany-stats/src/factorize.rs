//! PSD square-root factorization
//!
//! Turns a symmetric covariance estimate into `F = V diag(sqrt(max(λ, 0)))`
//! so that `F Fᵀ` is the covariance with its negative eigenvalues clipped to
//! zero. Negative eigenvalues here come from pairwise-missing data and
//! floating-point noise, not from a genuinely indefinite population matrix.

use crate::eigen::{EigenConfig, symmetric_eigen};
use crate::error::Result;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

/// Clipped mass above this fraction of the trace is reported at `warn`
const MATERIAL_CLIP_RATIO: f64 = 1e-8;

/// Square-root factor of a symmetric matrix
#[derive(Debug, Clone)]
pub struct PsdFactorization {
    /// `F` with `F Fᵀ` equal to the cleaned matrix
    pub factor: Array2<f64>,
    /// Eigenvalues before clipping, descending
    pub eigenvalues: Array1<f64>,
    /// Sum of the magnitudes of the clipped negative eigenvalues
    pub clipped_mass: f64,
}

impl PsdFactorization {
    /// The cleaned matrix `F Fᵀ`
    pub fn reconstruct(&self) -> Array2<f64> {
        self.factor.dot(&self.factor.t())
    }

    /// Number of eigenvalues that were clipped to zero
    pub fn n_clipped(&self) -> usize {
        self.eigenvalues.iter().filter(|&&v| v < 0.0).count()
    }
}

/// Factorize with default solver settings.
///
/// # Errors
/// See [`factorize_with`].
pub fn factorize(sigma: &Array2<f64>) -> Result<PsdFactorization> {
    factorize_with(sigma, &EigenConfig::default())
}

/// Factorize a symmetric matrix, clipping negative eigenvalues to zero.
///
/// An all-zero matrix yields an all-zero factor.
///
/// # Errors
/// Whatever [`symmetric_eigen`] reports: `DimensionMismatch` for a non-square
/// matrix, `NonFiniteResult` when an entry of `sigma` is not finite,
/// `NotConverged` when the solver runs out of sweeps.
pub fn factorize_with(sigma: &Array2<f64>, config: &EigenConfig) -> Result<PsdFactorization> {
    let decomp = symmetric_eigen(sigma, config)?;
    let clipped = decomp.eigenvalues.mapv(|v| v.max(0.0));
    let clipped_mass: f64 = decomp
        .eigenvalues
        .iter()
        .filter(|&&v| v < 0.0)
        .map(|v| -v)
        .sum();

    if clipped_mass > 0.0 {
        let trace = sigma.diag().iter().map(|v| v.abs()).sum::<f64>();
        if clipped_mass > MATERIAL_CLIP_RATIO * trace {
            warn!(clipped_mass, trace, "clipped material negative eigenvalue mass");
        } else {
            debug!(clipped_mass, "clipped negative eigenvalues");
        }
    }

    let roots = clipped.mapv(f64::sqrt);
    let factor = &decomp.eigenvectors * &roots.insert_axis(Axis(0));

    Ok(PsdFactorization {
        factor,
        eigenvalues: decomp.eigenvalues,
        clipped_mass,
    })
}
