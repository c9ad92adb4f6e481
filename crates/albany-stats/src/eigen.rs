//! Symmetric eigendecomposition
//!
//! Cyclic Jacobi: sweep over every off-diagonal pair, annihilating each with
//! a plane rotation, until the off-diagonal mass is negligible relative to
//! the whole matrix. A matrix that is still not diagonal after `max_sweeps`
//! is an error, never a silently truncated decomposition.

use crate::error::{Result, StatsError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Settings of the Jacobi solver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenConfig {
    /// Maximum number of full sweeps (default: 100)
    pub max_sweeps: usize,

    /// Stop once ‖offdiag(A)‖ ≤ tolerance · ‖A‖ (default: 1e-15)
    pub tolerance: f64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            max_sweeps: 100,
            tolerance: 1e-15,
        }
    }
}

impl EigenConfig {
    /// Check the sweep budget and tolerance.
    ///
    /// # Errors
    /// `InvalidParameter` for zero sweeps or a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.max_sweeps == 0 {
            return Err(StatsError::InvalidParameter(
                "max_sweeps must be positive".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(StatsError::InvalidParameter(format!(
                "eigen tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Reconstruct V Λ Vᵀ
    pub fn reconstruct(&self) -> Array2<f64> {
        let scaled = &self.eigenvectors * &self.eigenvalues.view().insert_axis(Axis(0));
        scaled.dot(&self.eigenvectors.t())
    }
}

/// Eigendecomposition of a symmetric matrix.
///
/// Only symmetric input is meaningful; the rotations keep both triangles in
/// step.
///
/// # Errors
/// - `InvalidParameter` for a bad `config`
/// - `DimensionMismatch` for a non-square matrix
/// - `NonFiniteResult` naming the first NaN or infinite entry as `[i, j]`
/// - `NotConverged` when `max_sweeps` sweeps leave the off-diagonal above tolerance
pub fn symmetric_eigen(matrix: &Array2<f64>, config: &EigenConfig) -> Result<EigenDecomposition> {
    config.validate()?;
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    if let Some(((i, j), _)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(StatsError::non_finite(format!("[{i}, {j}]")));
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let threshold = config.tolerance * frobenius(&a);

    let mut sweeps = 0;
    loop {
        let off_diagonal = off_diagonal_norm(&a);
        if off_diagonal <= threshold {
            break;
        }
        if sweeps == config.max_sweeps {
            return Err(StatsError::NotConverged {
                sweeps,
                off_diagonal,
            });
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]] != 0.0 {
                    annihilate(&mut a, &mut v, p, q);
                }
            }
        }
        sweeps += 1;
    }

    // Sort eigenvalues and eigenvectors in descending order
    let diagonal = a.diag().to_owned();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| diagonal[j].total_cmp(&diagonal[i]));

    let eigenvalues = indices.iter().map(|&i| diagonal[i]).collect();
    let mut eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        eigenvectors.column_mut(new_idx).assign(&v.column(old_idx));
    }

    Ok(EigenDecomposition {
        eigenvalues,
        eigenvectors,
    })
}

/// Smallest eigenvalue of a symmetric matrix.
///
/// # Errors
/// `DimensionMismatch` for a non-square matrix.
pub fn min_eigenvalue(matrix: &Array2<f64>) -> Result<f64> {
    let decomp = symmetric_eigen(matrix, &EigenConfig::default())?;
    Ok(decomp
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min))
}

/// Whether every eigenvalue is at least `-tolerance`
pub fn is_positive_semidefinite(matrix: &Array2<f64>, tolerance: f64) -> bool {
    if matrix.nrows() != matrix.ncols() {
        return false;
    }
    match min_eigenvalue(matrix) {
        Ok(min) => min >= -tolerance,
        Err(_) => false,
    }
}

fn frobenius(a: &Array2<f64>) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    a.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, x)| x * x)
        .sum::<f64>()
        .sqrt()
}

/// Rotate rows and columns p, q of `a` so that `a[p, q]` becomes zero, and
/// fold the rotation into the eigenvector columns of `v`.
///
/// With θ = (a_qq − a_pp) / 2a_pq the tangent t is the smaller root of
/// t² + 2θt − 1 = 0, which keeps the rotation angle at most π/4.
fn annihilate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let apq = a[[p, q]];
    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
    let c = 1.0 / t.hypot(1.0);
    let s = t * c;

    a[[p, p]] -= t * apq;
    a[[q, q]] += t * apq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for k in (0..a.nrows()).filter(|&k| k != p && k != q) {
        let (akp, akq) = (a[[k, p]], a[[k, q]]);
        let kp = c * akp - s * akq;
        let kq = s * akp + c * akq;
        a[[k, p]] = kp;
        a[[p, k]] = kp;
        a[[k, q]] = kq;
        a[[q, k]] = kq;
    }

    for mut row in v.rows_mut() {
        let (vp, vq) = (row[p], row[q]);
        row[p] = c * vp - s * vq;
        row[q] = s * vp + c * vq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_diagonal_sorted_descending() {
        let matrix = array![[1.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 2.0]];
        let decomp = symmetric_eigen(&matrix, &EigenConfig::default()).unwrap();

        assert_abs_diff_eq!(decomp.eigenvalues[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reconstructs_dense_matrix() {
        let matrix = array![
            [2.0, 1.0, 1.0, 0.5],
            [1.0, 2.0, 1.0, -0.3],
            [1.0, 1.0, 2.0, 0.2],
            [0.5, -0.3, 0.2, 1.5]
        ];
        let decomp = symmetric_eigen(&matrix, &EigenConfig::default()).unwrap();
        let reconstructed = decomp.reconstruct();

        for (a, b) in matrix.iter().zip(reconstructed.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }

        // Columns are orthonormal
        let gram = decomp.eigenvectors.t().dot(&decomp.eigenvectors);
        for ((i, j), value) in gram.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_indefinite_matrix() {
        // [[1, 2], [2, 1]] has eigenvalues 3 and -1
        let matrix = array![[1.0, 2.0], [2.0, 1.0]];
        assert_abs_diff_eq!(min_eigenvalue(&matrix).unwrap(), -1.0, epsilon = 1e-12);
        assert!(!is_positive_semidefinite(&matrix, 1e-12));
        assert!(is_positive_semidefinite(&Array2::eye(3), 0.0));
    }

    #[test]
    fn test_zero_matrix() {
        let matrix = Array2::<f64>::zeros((3, 3));
        let decomp = symmetric_eigen(&matrix, &EigenConfig::default()).unwrap();
        assert!(decomp.eigenvalues.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(EigenConfig::default().validate().is_ok());
        for config in [
            EigenConfig {
                max_sweeps: 0,
                ..Default::default()
            },
            EigenConfig {
                tolerance: -1e-12,
                ..Default::default()
            },
            EigenConfig {
                tolerance: f64::NAN,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                symmetric_eigen(&Array2::eye(2), &config),
                Err(StatsError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_sweep_budget_exhausted() {
        let matrix = array![
            [2.0, 1.0, 1.0, 0.5],
            [1.0, 2.0, 1.0, -0.3],
            [1.0, 1.0, 2.0, 0.2],
            [0.5, -0.3, 0.2, 1.5]
        ];
        let config = EigenConfig {
            max_sweeps: 1,
            tolerance: 1e-15,
        };
        match symmetric_eigen(&matrix, &config) {
            Err(StatsError::NotConverged {
                sweeps,
                off_diagonal,
            }) => {
                assert_eq!(sweeps, 1);
                assert!(off_diagonal > 0.0);
            }
            other => panic!("expected NotConverged, got {other:?}"),
        }
    }

    #[test]
    fn test_larger_matrix_converges() {
        let n = 40;
        let raw = Array2::from_shape_fn((n, n), |(i, j)| {
            let diagonal = if i == j { 0.5 } else { 0.0 };
            1.0 / (1 + i + j) as f64 + diagonal + 0.01 * ((i * j + 1) as f64).sin()
        });
        let matrix = (&raw + &raw.t()) / 2.0;
        let decomp = symmetric_eigen(&matrix, &EigenConfig::default()).unwrap();
        for (a, b) in matrix.iter().zip(decomp.reconstruct().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_finite_entry_rejected() {
        let matrix = array![[1.0, 0.0], [0.0, f64::NAN]];
        match symmetric_eigen(&matrix, &EigenConfig::default()) {
            Err(StatsError::NonFiniteResult { asset }) => assert_eq!(asset, "[1, 1]"),
            other => panic!("expected NonFiniteResult, got {other:?}"),
        }
    }

    #[test]
    fn test_non_square_rejected() {
        let matrix = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            symmetric_eigen(&matrix, &EigenConfig::default()),
            Err(StatsError::DimensionMismatch { .. })
        ));
    }
}
