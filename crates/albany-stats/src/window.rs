//! Window policies
//!
//! Which rows of the history an estimate is computed over, and with what
//! weight:
//! - `Expanding`: every row, unit weight
//! - `Rolling { size }`: the trailing `size` rows, unit weight
//! - `Exponential { halflife }`: every row, weight `d^age` with
//!   `d = 0.5^(1/halflife)` and `age = 0` for the newest row

use crate::error::{Result, StatsError};
use albany_data::PanelSlice;
use serde::{Deserialize, Serialize};

/// Window over the history supplied to an engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// All rows seen so far
    #[default]
    Expanding,

    /// The trailing `size` rows
    Rolling {
        /// Number of rows in the window
        size: usize,
    },

    /// Exponentially decaying weights
    Exponential {
        /// Number of rows after which a weight halves
        halflife: f64,
    },
}

impl WindowPolicy {
    /// Check the policy parameters
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Expanding => Ok(()),
            Self::Rolling { size } if size == 0 => Err(StatsError::InvalidParameter(
                "rolling window size must be positive".to_string(),
            )),
            Self::Rolling { .. } => Ok(()),
            Self::Exponential { halflife } if !(halflife.is_finite() && halflife > 0.0) => {
                Err(StatsError::InvalidParameter(format!(
                    "halflife must be positive and finite, got {halflife}"
                )))
            }
            Self::Exponential { .. } => Ok(()),
        }
    }

    /// Per-row decay factor; 1 for unweighted windows
    pub fn decay(&self) -> f64 {
        match *self {
            Self::Exponential { halflife } => 0.5_f64.powf(1.0 / halflife),
            Self::Expanding | Self::Rolling { .. } => 1.0,
        }
    }

    /// Rows covered by the window. Exponential windows keep every row and
    /// leave the weighting to the recurrence.
    pub fn rows<'a>(&self, past: &PanelSlice<'a>) -> PanelSlice<'a> {
        match *self {
            Self::Rolling { size } => past.tail(size),
            Self::Expanding | Self::Exponential { .. } => *past,
        }
    }
}
