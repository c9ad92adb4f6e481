//! Error types for the statistics engines.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur while estimating statistics
#[derive(Debug, Error)]
pub enum StatsError {
    /// An asset, or a pair of assets, has no qualifying observation in the window
    #[error("Insufficient data for {asset}")]
    InsufficientData {
        /// Asset identifier, or `a/b` for a pair
        asset: String,
    },

    /// The checkpoint was not produced at the row preceding the newest one
    #[error("Checkpoint mismatch: checkpoint at {checkpoint}, previous row at {previous:?}")]
    CheckpointMismatch {
        /// Timestamp stored in the checkpoint
        checkpoint: NaiveDate,
        /// Timestamp of the row before the newest one, if any
        previous: Option<NaiveDate>,
    },

    /// A produced entry is NaN or infinite
    #[error("Non-finite result for {asset}")]
    NonFiniteResult {
        /// Asset identifier, or `a/b` for a pair
        asset: String,
    },

    /// The supplied history contains rows at or after the evaluation time
    #[error("Look-ahead: row at {last} is not before evaluation time {t}")]
    LookAhead {
        /// Evaluation time
        t: NaiveDate,
        /// Newest row supplied
        last: NaiveDate,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// The eigen solver ran out of sweeps before the off-diagonal mass vanished
    #[error("Eigen solver did not converge after {sweeps} sweeps (off-diagonal norm {off_diagonal:e})")]
    NotConverged {
        /// Sweeps performed
        sweeps: usize,
        /// Off-diagonal Frobenius norm left over
        off_diagonal: f64,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl StatsError {
    /// Whether the engine can recover by recomputing from scratch
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CheckpointMismatch { .. } | Self::DimensionMismatch { .. }
        )
    }

    pub(crate) fn insufficient(asset: impl Into<String>) -> Self {
        Self::InsufficientData {
            asset: asset.into(),
        }
    }

    pub(crate) fn non_finite(asset: impl Into<String>) -> Self {
        Self::NonFiniteResult {
            asset: asset.into(),
        }
    }
}
