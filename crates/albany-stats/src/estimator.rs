//! Estimator contract shared by the engines.

use crate::error::{Result, StatsError};
use crate::recurrence::{Checkpoint, SufficientStatistic};
use albany_data::PanelSlice;
use chrono::NaiveDate;
use ndarray::{Array1, Array2};

/// Value computed at one evaluation time, with the checkpoint for the next call
#[derive(Debug, Clone)]
pub struct Estimate<V, S> {
    /// Computed value
    pub value: V,
    /// Checkpoint to hand back on the next call
    pub checkpoint: Checkpoint<S>,
}

/// Engine evaluated once per step of a simulation or live loop
///
/// Implementations hold only their configuration. All state lives in the
/// checkpoint, which the caller owns and passes back on the next call.
pub trait IncrementalEstimator {
    /// Produced value (vector or matrix)
    type Output;

    /// Sufficient statistic carried in the checkpoint
    type Statistic: SufficientStatistic;

    /// Estimate at time `t` from every row of `past` (all strictly before `t`).
    ///
    /// # Errors
    /// `InsufficientData` when an asset has no observation in the window,
    /// `NonFiniteResult` when a produced entry is not finite, `LookAhead`
    /// when `past` reaches `t`.
    fn compute(
        &self,
        t: NaiveDate,
        past: &PanelSlice<'_>,
        checkpoint: Option<&Checkpoint<Self::Statistic>>,
    ) -> Result<Estimate<Self::Output, Self::Statistic>>;
}

/// Reject histories that reach the evaluation time
pub(crate) fn ensure_past(t: NaiveDate, past: &PanelSlice<'_>) -> Result<()> {
    match past.last_time() {
        Some(last) if last >= t => Err(StatsError::LookAhead { t, last }),
        _ => Ok(()),
    }
}

/// Fail on the first non-finite entry of a per-asset vector
pub(crate) fn ensure_finite_vector(values: &Array1<f64>, assets: &[String]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(StatsError::non_finite(assets[i].as_str())),
        None => Ok(()),
    }
}

/// Fail on the first non-finite entry of a matrix indexed by `assets`
pub(crate) fn ensure_finite_matrix(values: &Array2<f64>, assets: &[String]) -> Result<()> {
    for ((i, j), v) in values.indexed_iter() {
        if v.is_finite() {
            continue;
        }
        return Err(StatsError::non_finite(if i == j {
            assets[i].clone()
        } else {
            format!("{}/{}", assets[i], assets[j])
        }));
    }
    Ok(())
}
