//! Running mean
//!
//! Historical mean return per asset, over observed entries only:
//! mean_a = Σ w_t r_{t,a} / Σ w_t, both sums over rows where asset a is
//! observed. The statistic keeps the mean itself and updates it row by row. With the cash override the cash entry is the latest cash return
//! instead of its historical mean.

use crate::error::{Result, StatsError};
use crate::estimator::{Estimate, IncrementalEstimator, ensure_finite_vector, ensure_past};
use crate::recurrence::{Checkpoint, SufficientStatistic, advance};
use crate::window::WindowPolicy;
use albany_data::{PanelSlice, is_observed};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Per-asset observation weights and running means
///
/// Means are updated in place (Welford) rather than derived from running
/// sums, so removing a row in a rolling window does not cancel large sums.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanStatistic {
    counts: Array1<f64>,
    means: Array1<f64>,
}

impl MeanStatistic {
    /// Empty statistic over `n_assets`
    pub fn zeros(n_assets: usize) -> Self {
        Self {
            counts: Array1::zeros(n_assets),
            means: Array1::zeros(n_assets),
        }
    }

    /// Observation counts (decayed weights under an exponential window)
    pub const fn counts(&self) -> &Array1<f64> {
        &self.counts
    }

    /// Running means without the count check
    pub(crate) const fn raw_means(&self) -> &Array1<f64> {
        &self.means
    }

    /// Mean of every asset.
    ///
    /// # Errors
    /// `InsufficientData` naming the first asset without observations.
    pub fn means(&self, assets: &[String]) -> Result<Array1<f64>> {
        if let Some(i) = self.counts.iter().position(|&c| c <= 0.0) {
            return Err(StatsError::insufficient(assets[i].as_str()));
        }
        Ok(self.means.clone())
    }

    /// Fold `value` into asset `j`; returns the deviation from the previous
    /// mean and the new total weight.
    pub(crate) fn update(&mut self, j: usize, value: f64, weight: f64) -> (f64, f64) {
        let total = self.counts[j] + weight;
        let delta = value - self.means[j];
        if total <= 0.0 {
            self.counts[j] = 0.0;
            self.means[j] = 0.0;
        } else {
            let scale = weight / total;
            self.means[j] += scale * delta;
            self.counts[j] = total;
        }
        (delta, total)
    }
}

impl SufficientStatistic for MeanStatistic {
    fn empty(n_assets: usize) -> Self {
        Self::zeros(n_assets)
    }

    fn accumulate(&mut self, row: ArrayView1<'_, f64>, weight: f64) {
        for (j, &value) in row.iter().enumerate() {
            if is_observed(value) {
                self.update(j, value, weight);
            }
        }
    }

    fn decay(&mut self, factor: f64) {
        self.counts *= factor;
    }

    fn n_assets(&self) -> usize {
        self.counts.len()
    }
}

/// Configuration for the mean engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanConfig {
    /// Rows the mean is computed over (default: expanding)
    pub window: WindowPolicy,

    /// Report the latest cash return instead of the cash mean (default: true)
    pub treat_cash_as_override: bool,
}

impl Default for MeanConfig {
    fn default() -> Self {
        Self {
            window: WindowPolicy::Expanding,
            treat_cash_as_override: true,
        }
    }
}

/// Historical mean return engine
#[derive(Debug, Clone, Default)]
pub struct MeanEngine {
    config: MeanConfig,
}

impl MeanEngine {
    /// Create a new mean engine with the given configuration
    pub fn new(config: MeanConfig) -> Result<Self> {
        config.window.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration
    pub const fn config(&self) -> &MeanConfig {
        &self.config
    }
}

impl IncrementalEstimator for MeanEngine {
    type Output = Array1<f64>;
    type Statistic = MeanStatistic;

    fn compute(
        &self,
        t: NaiveDate,
        past: &PanelSlice<'_>,
        checkpoint: Option<&Checkpoint<MeanStatistic>>,
    ) -> Result<Estimate<Array1<f64>, MeanStatistic>> {
        ensure_past(t, past)?;
        let checkpoint = advance(&self.config.window, past, checkpoint)?;

        let mut value = checkpoint.statistic().means(past.assets())?;
        if self.config.treat_cash_as_override {
            if let Some(cash) = past.last_cash() {
                value[past.cash_index()] = cash;
            }
        }
        ensure_finite_vector(&value, past.assets())?;

        Ok(Estimate { value, checkpoint })
    }
}
