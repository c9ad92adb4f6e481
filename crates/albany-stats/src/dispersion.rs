//! Running dispersion
//!
//! Standard error of the mean and variance per asset, over observed entries.
//! Both come from one centered statistic, updated row by row (weighted
//! Welford):
//!
//! - W = Σw, mean, M2 = Σw·(r − mean)², V = Σw·|w|
//! - var₀ = M2/W
//! - var_ddof = var₀ · W² / (W² − ddof·V)
//! - n_eff = W² / V
//!
//! With unit weights V = W = n, so var_ddof = var₀ · n/(n − ddof) and
//! n_eff = n. The standard error is sqrt(var_ddof / n_eff).

use crate::error::{Result, StatsError};
use crate::estimator::{Estimate, IncrementalEstimator, ensure_finite_vector, ensure_past};
use crate::mean::MeanStatistic;
use crate::recurrence::{Checkpoint, SufficientStatistic, advance};
use crate::window::WindowPolicy;
use albany_data::{PanelSlice, is_observed};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Per-asset running mean, sum of squared deviations and squared weights
#[derive(Debug, Clone, PartialEq)]
pub struct MomentStatistic {
    mean: MeanStatistic,
    m2: Array1<f64>,
    weights_sq: Array1<f64>,
}

impl MomentStatistic {
    /// Empty statistic over `n_assets`
    pub fn zeros(n_assets: usize) -> Self {
        Self {
            mean: MeanStatistic::zeros(n_assets),
            m2: Array1::zeros(n_assets),
            weights_sq: Array1::zeros(n_assets),
        }
    }

    /// Observation counts (decayed weights under an exponential window)
    pub const fn counts(&self) -> &Array1<f64> {
        self.mean.counts()
    }

    fn checked_count(&self, i: usize, assets: &[String]) -> Result<f64> {
        let count = self.counts()[i];
        if count <= 0.0 {
            return Err(StatsError::insufficient(assets[i].as_str()));
        }
        Ok(count)
    }

    /// Biased variance M2/W. Rounding in a rolling removal can leave a tiny
    /// negative M2; it is floored at zero while NaN passes through.
    fn biased(&self, i: usize, assets: &[String]) -> Result<f64> {
        let biased = self.m2[i] / self.checked_count(i, assets)?;
        Ok(if biased < 0.0 { 0.0 } else { biased })
    }

    /// Means of every asset.
    ///
    /// # Errors
    /// `InsufficientData` for an asset without observations.
    pub fn means(&self, assets: &[String]) -> Result<Array1<f64>> {
        self.mean.means(assets)
    }

    /// Second moments var₀ + mean² of every asset.
    ///
    /// # Errors
    /// `InsufficientData` for an asset without observations.
    pub fn second_moments(&self, assets: &[String]) -> Result<Array1<f64>> {
        let means = self.mean.raw_means();
        (0..self.m2.len())
            .map(|i| -> Result<f64> { Ok(self.biased(i, assets)? + means[i] * means[i]) })
            .collect()
    }

    /// Variances with `ddof` delta degrees of freedom.
    ///
    /// # Errors
    /// `InsufficientData` when an asset's effective count does not exceed `ddof`.
    pub fn variances(&self, assets: &[String], ddof: usize) -> Result<Array1<f64>> {
        (0..self.m2.len())
            .map(|i| -> Result<f64> {
                let biased = self.biased(i, assets)?;
                if ddof == 0 {
                    return Ok(biased);
                }
                let w = self.counts()[i];
                let w2 = w * w;
                let denominator = w2 - ddof as f64 * self.weights_sq[i];
                if denominator <= 0.0 {
                    return Err(StatsError::insufficient(assets[i].as_str()));
                }
                Ok(biased * w2 / denominator)
            })
            .collect()
    }

    /// Effective number of observations W²/V of every asset.
    ///
    /// # Errors
    /// `InsufficientData` for an asset without observations.
    pub fn effective_counts(&self, assets: &[String]) -> Result<Array1<f64>> {
        (0..self.m2.len())
            .map(|i| -> Result<f64> {
                let w = self.checked_count(i, assets)?;
                Ok(w * w / self.weights_sq[i])
            })
            .collect()
    }
}

impl SufficientStatistic for MomentStatistic {
    fn empty(n_assets: usize) -> Self {
        Self::zeros(n_assets)
    }

    fn accumulate(&mut self, row: ArrayView1<'_, f64>, weight: f64) {
        for (j, &value) in row.iter().enumerate() {
            if !is_observed(value) {
                continue;
            }
            let (delta, total) = self.mean.update(j, value, weight);
            if total <= 0.0 {
                self.m2[j] = 0.0;
                self.weights_sq[j] = 0.0;
            } else {
                self.m2[j] += weight * delta * (value - self.mean.raw_means()[j]);
                self.weights_sq[j] += weight * weight.abs();
            }
        }
    }

    fn decay(&mut self, factor: f64) {
        self.mean.decay(factor);
        self.m2 *= factor;
        self.weights_sq *= factor * factor;
    }

    fn n_assets(&self) -> usize {
        self.m2.len()
    }
}

/// Which dispersion statistic to report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Dispersion {
    /// Standard deviation of the mean estimate, std / sqrt(n)
    #[default]
    MeanError,

    /// Variance with ddof = 0, or second moment when `add_mean_to_variance`
    Variance,
}

/// Configuration for the dispersion engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispersionConfig {
    /// Reported statistic (default: mean error)
    pub kind: Dispersion,

    /// Rows the statistic is computed over (default: expanding)
    pub window: WindowPolicy,

    /// Delta degrees of freedom of the standard deviation behind the mean
    /// error (default: 1)
    pub ddof: usize,

    /// Report E[r²] instead of the centered variance (default: false)
    pub add_mean_to_variance: bool,

    /// Force the cash entry to exactly zero (default: true)
    pub zero_cash: bool,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            kind: Dispersion::MeanError,
            window: WindowPolicy::Expanding,
            ddof: 1,
            add_mean_to_variance: false,
            zero_cash: true,
        }
    }
}

impl DispersionConfig {
    /// Largest accepted `ddof`
    pub const MAX_DDOF: usize = 1;

    /// Check the window and `ddof`.
    ///
    /// # Errors
    /// `InvalidParameter` for a bad window or a `ddof` above [`Self::MAX_DDOF`].
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        if self.ddof > Self::MAX_DDOF {
            return Err(StatsError::InvalidParameter(format!(
                "ddof must be at most {}, got {}",
                Self::MAX_DDOF,
                self.ddof
            )));
        }
        Ok(())
    }
}

/// Standard error of the mean and variance engine
#[derive(Debug, Clone, Default)]
pub struct DispersionEngine {
    config: DispersionConfig,
}

impl DispersionEngine {
    /// Create a new dispersion engine with the given configuration
    pub fn new(config: DispersionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration
    pub const fn config(&self) -> &DispersionConfig {
        &self.config
    }

    fn evaluate(&self, statistic: &MomentStatistic, assets: &[String]) -> Result<Array1<f64>> {
        match self.config.kind {
            Dispersion::MeanError => {
                let variances = statistic.variances(assets, self.config.ddof)?;
                let counts = statistic.effective_counts(assets)?;
                Ok((variances / counts).mapv(f64::sqrt))
            }
            Dispersion::Variance if self.config.add_mean_to_variance => {
                statistic.second_moments(assets)
            }
            Dispersion::Variance => statistic.variances(assets, 0),
        }
    }
}

impl IncrementalEstimator for DispersionEngine {
    type Output = Array1<f64>;
    type Statistic = MomentStatistic;

    fn compute(
        &self,
        t: NaiveDate,
        past: &PanelSlice<'_>,
        checkpoint: Option<&Checkpoint<MomentStatistic>>,
    ) -> Result<Estimate<Array1<f64>, MomentStatistic>> {
        ensure_past(t, past)?;
        let checkpoint = advance(&self.config.window, past, checkpoint)?;

        let mut value = self.evaluate(checkpoint.statistic(), past.assets())?;
        if self.config.zero_cash {
            value[past.cash_index()] = 0.0;
        }
        ensure_finite_vector(&value, past.assets())?;

        Ok(Estimate { value, checkpoint })
    }
}
