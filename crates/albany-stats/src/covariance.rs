//! Running covariance
//!
//! Pairwise covariance over jointly observed rows:
//!
//! Σ_ij = Σ_t w_t r_ti r_tj / C_ij − μ_i μ_j
//!
//! where the sum and the joint count C_ij run over rows where both assets are
//! observed and μ is the per-asset mean over that asset's own observations.
//! With `add_mean_to_variance` the second moment Σ_t w_t r_ti r_tj / C_ij is
//! reported instead.
//!
//! Raw products are never accumulated. For every pair the statistic keeps the
//! joint means a_ij, a_ji and the co-moment M_ij = Σ_t w_t (r_ti − a_ij)(r_tj − a_ji),
//! updated row by row, and the matrix is assembled as
//!
//! Σ_ij = M_ij / C_ij + (a_ij − μ_i) a_ji + μ_i (a_ji − μ_j)
//!
//! The cash column is carried in the statistic so that asset indices line up
//! with the panel, then either zeroed or dropped from the returned matrix.

use crate::eigen::EigenConfig;
use crate::error::{Result, StatsError};
use crate::estimator::{Estimate, IncrementalEstimator, ensure_finite_matrix, ensure_past};
use crate::factorize::factorize_with;
use crate::mean::MeanStatistic;
use crate::recurrence::{Checkpoint, SufficientStatistic, advance};
use crate::window::WindowPolicy;
use albany_data::{PanelSlice, is_observed};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Observation mask of a block of rows: 1 where observed, 0 where missing
fn observed_mask(values: ArrayView2<'_, f64>) -> Array2<f64> {
    values.mapv(|v| if is_observed(v) { 1.0 } else { 0.0 })
}

/// Number of rows at which each pair of assets is jointly observed.
///
/// Uses the identity C = N · (cov₀(M) + m mᵀ), where M is the 0/1
/// observation mask, m its column means and N the number of rows. The
/// identity is exact; the result is rounded to the integer it represents.
pub fn joint_count_matrix(values: ArrayView2<'_, f64>) -> Array2<f64> {
    let (n_rows, n_assets) = values.dim();
    let mask = observed_mask(values);
    let Some(rates) = mask.mean_axis(Axis(0)) else {
        return Array2::zeros((n_assets, n_assets));
    };

    let n = n_rows as f64;
    let centered = &mask - &rates.view().insert_axis(Axis(0));
    let cov = centered.t().dot(&centered) / n;
    let outer = outer(rates.view(), rates.view());

    ((cov + outer) * n).mapv(f64::round)
}

fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    a.insert_axis(Axis(1)).dot(&b.insert_axis(Axis(0)))
}

fn pair_name(assets: &[String], i: usize, j: usize) -> String {
    if i == j {
        assets[i].clone()
    } else {
        format!("{}/{}", assets[i], assets[j])
    }
}

/// Joint counts, joint means and co-moments, with the marginal mean statistic
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceStatistic {
    marginal: MeanStatistic,
    counts: Array2<f64>,
    pair_means: Array2<f64>,
    comoments: Array2<f64>,
}

impl CovarianceStatistic {
    /// Per-asset counts and means of the same window
    pub const fn marginal(&self) -> &MeanStatistic {
        &self.marginal
    }

    /// Joint observation counts (decayed weights under an exponential window)
    pub const fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    /// Entry `[i, j]` is the mean of asset i over rows where j is also observed
    pub const fn pair_means(&self) -> &Array2<f64> {
        &self.pair_means
    }

    /// Σ w (r_i − a_ij)(r_j − a_ji) over jointly observed rows
    pub const fn comoments(&self) -> &Array2<f64> {
        &self.comoments
    }

    fn clear_pair(&mut self, i: usize, j: usize) {
        for (p, q) in [(i, j), (j, i)] {
            self.counts[[p, q]] = 0.0;
            self.pair_means[[p, q]] = 0.0;
            self.comoments[[p, q]] = 0.0;
        }
    }

    fn update_pair(&mut self, i: usize, j: usize, ri: f64, rj: f64, weight: f64) {
        let total = self.counts[[i, j]] + weight;
        if total <= 0.0 {
            self.clear_pair(i, j);
            return;
        }
        let dx = ri - self.pair_means[[i, j]];
        let dy = rj - self.pair_means[[j, i]];
        let scale = weight / total;
        self.pair_means[[i, j]] += scale * dx;
        if i != j {
            self.pair_means[[j, i]] += scale * dy;
        }
        let comoment = self.comoments[[i, j]] + weight * dx * (rj - self.pair_means[[j, i]]);
        self.comoments[[i, j]] = comoment;
        self.comoments[[j, i]] = comoment;
        self.counts[[i, j]] = total;
        self.counts[[j, i]] = total;
    }
}

impl SufficientStatistic for CovarianceStatistic {
    fn empty(n_assets: usize) -> Self {
        Self {
            marginal: MeanStatistic::zeros(n_assets),
            counts: Array2::zeros((n_assets, n_assets)),
            pair_means: Array2::zeros((n_assets, n_assets)),
            comoments: Array2::zeros((n_assets, n_assets)),
        }
    }

    fn accumulate(&mut self, row: ArrayView1<'_, f64>, weight: f64) {
        self.marginal.accumulate(row, weight);
        let observed: Vec<usize> = (0..row.len()).filter(|&k| is_observed(row[k])).collect();
        for (n, &i) in observed.iter().enumerate() {
            for &j in &observed[n..] {
                self.update_pair(i, j, row[i], row[j], weight);
            }
        }
    }

    fn decay(&mut self, factor: f64) {
        self.marginal.decay(factor);
        self.counts *= factor;
        self.comoments *= factor;
    }

    fn n_assets(&self) -> usize {
        self.counts.nrows()
    }
}

/// Configuration for the covariance engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovarianceConfig {
    /// Rows the covariance is computed over (default: expanding)
    pub window: WindowPolicy,

    /// Report the uncentered second moment (default: false)
    pub add_mean_to_variance: bool,

    /// Keep the cash row and column, set to exactly zero; when false the
    /// cash asset is dropped from the matrix (default: true)
    pub zero_cash: bool,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self {
            window: WindowPolicy::Expanding,
            add_mean_to_variance: false,
            zero_cash: true,
        }
    }
}

/// Pairwise covariance engine
#[derive(Debug, Clone, Default)]
pub struct CovarianceEngine {
    config: CovarianceConfig,
}

impl CovarianceEngine {
    /// Create a new covariance engine with the given configuration
    pub fn new(config: CovarianceConfig) -> Result<Self> {
        config.window.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration
    pub const fn config(&self) -> &CovarianceConfig {
        &self.config
    }

    /// Assets indexing the rows and columns of the returned matrix
    pub fn domain<'a>(&self, assets: &'a [String]) -> &'a [String] {
        if self.config.zero_cash {
            assets
        } else {
            &assets[..assets.len() - 1]
        }
    }

    /// Covariance matrix from a sufficient statistic over `assets`.
    ///
    /// # Errors
    /// `InsufficientData` for an asset or pair with no joint observation,
    /// `NonFiniteResult` for any non-finite entry.
    pub fn covariance(
        &self,
        statistic: &CovarianceStatistic,
        assets: &[String],
    ) -> Result<Array2<f64>> {
        let cash = assets.len() - 1;
        let domain = self.domain(assets).len();
        let skip = |k: usize| self.config.zero_cash && k == cash;

        // Single assets first so that an empty column is reported by name
        for i in (0..domain).filter(|&i| !skip(i)) {
            if statistic.counts[[i, i]] <= 0.0 {
                return Err(StatsError::insufficient(assets[i].as_str()));
            }
        }

        let means: Option<Array1<f64>> = if self.config.add_mean_to_variance {
            None
        } else {
            Some(statistic.marginal.means(assets)?)
        };
        let joint = &statistic.pair_means;

        let mut sigma = Array2::<f64>::zeros((domain, domain));
        for i in (0..domain).filter(|&i| !skip(i)) {
            for j in (0..domain).filter(|&j| !skip(j)) {
                let count = statistic.counts[[i, j]];
                if count <= 0.0 {
                    return Err(StatsError::insufficient(pair_name(assets, i, j)));
                }
                let (a, b) = (joint[[i, j]], joint[[j, i]]);
                let centered = statistic.comoments[[i, j]] / count;
                sigma[[i, j]] = match &means {
                    Some(mu) => centered + (a - mu[i]) * b + mu[i] * (b - mu[j]),
                    None => centered + a * b,
                };
            }
        }

        // Exactly symmetric: both triangles receive the same sum
        let sigma = (&sigma + &sigma.t()) / 2.0;
        ensure_finite_matrix(&sigma, assets)?;
        Ok(sigma)
    }
}

impl IncrementalEstimator for CovarianceEngine {
    type Output = Array2<f64>;
    type Statistic = CovarianceStatistic;

    fn compute(
        &self,
        t: NaiveDate,
        past: &PanelSlice<'_>,
        checkpoint: Option<&Checkpoint<CovarianceStatistic>>,
    ) -> Result<Estimate<Array2<f64>, CovarianceStatistic>> {
        ensure_past(t, past)?;
        let checkpoint = advance(&self.config.window, past, checkpoint)?;
        let value = self.covariance(checkpoint.statistic(), past.assets())?;
        Ok(Estimate { value, checkpoint })
    }
}

/// Covariance followed by PSD square-root factorization
///
/// The output `F` satisfies `F Fᵀ ≈ Σ` with negative eigenvalues of `Σ`
/// clipped to zero.
#[derive(Debug, Clone, Default)]
pub struct FactorizedCovarianceEngine {
    covariance: CovarianceEngine,
    eigen: EigenConfig,
}

impl FactorizedCovarianceEngine {
    /// Create from a covariance configuration and eigen solver settings
    pub fn new(config: CovarianceConfig, eigen: EigenConfig) -> Result<Self> {
        eigen.validate()?;
        Ok(Self {
            covariance: CovarianceEngine::new(config)?,
            eigen,
        })
    }

    /// The underlying covariance engine
    pub const fn covariance(&self) -> &CovarianceEngine {
        &self.covariance
    }
}

impl IncrementalEstimator for FactorizedCovarianceEngine {
    type Output = Array2<f64>;
    type Statistic = CovarianceStatistic;

    fn compute(
        &self,
        t: NaiveDate,
        past: &PanelSlice<'_>,
        checkpoint: Option<&Checkpoint<CovarianceStatistic>>,
    ) -> Result<Estimate<Array2<f64>, CovarianceStatistic>> {
        let Estimate { value, checkpoint } = self.covariance.compute(t, past, checkpoint)?;
        let factorization = factorize_with(&value, &self.eigen)?;
        Ok(Estimate {
            value: factorization.factor,
            checkpoint,
        })
    }
}
