//! Forecast configuration
//!
//! One flat set of options shared by every engine, loadable from JSON.
//! Missing fields take their defaults:
//!
//! ```json
//! {
//!   "treat_cash_as_override": true,
//!   "add_mean_to_variance": false,
//!   "zero_cash_in_variance_or_covariance": true,
//!   "window": { "kind": "exponential", "halflife": 63.0 },
//!   "ddof": 1
//! }
//! ```

use crate::error::Result;
use albany_stats::{
    CovarianceConfig, CovarianceEngine, Dispersion, DispersionConfig, DispersionEngine,
    EigenConfig, FactorizedCovarianceEngine, MeanConfig, MeanEngine, WindowPolicy,
};
use serde::{Deserialize, Serialize};

/// Configuration shared by the forecast engines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Report the latest cash return as the cash mean (default: true)
    pub treat_cash_as_override: bool,

    /// Report second moments instead of centered (co)variances (default: false)
    pub add_mean_to_variance: bool,

    /// Zero the cash entry of dispersions and the cash row/column of
    /// covariances; a covariance without it drops cash (default: true)
    pub zero_cash_in_variance_or_covariance: bool,

    /// Rows each statistic is computed over (default: expanding)
    pub window: WindowPolicy,

    /// Delta degrees of freedom of the mean error (default: 1)
    pub ddof: usize,

    /// Eigen solver settings of the factorized covariance
    pub eigen: EigenConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            treat_cash_as_override: true,
            add_mean_to_variance: false,
            zero_cash_in_variance_or_covariance: true,
            window: WindowPolicy::Expanding,
            ddof: 1,
            eigen: EigenConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// `Config` when the JSON is malformed, `Stats` when a value is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option.
    ///
    /// # Errors
    /// `Stats(InvalidParameter)` for a bad window, `ddof` or eigen solver setting.
    pub fn validate(&self) -> Result<()> {
        self.dispersion_config(Dispersion::MeanError).validate()?;
        self.eigen.validate()?;
        Ok(())
    }

    /// Settings of the mean engine
    pub const fn mean_config(&self) -> MeanConfig {
        MeanConfig {
            window: self.window,
            treat_cash_as_override: self.treat_cash_as_override,
        }
    }

    /// Settings of a dispersion engine reporting `kind`
    pub const fn dispersion_config(&self, kind: Dispersion) -> DispersionConfig {
        DispersionConfig {
            kind,
            window: self.window,
            ddof: self.ddof,
            add_mean_to_variance: self.add_mean_to_variance,
            zero_cash: self.zero_cash_in_variance_or_covariance,
        }
    }

    /// Settings of the covariance engine
    pub const fn covariance_config(&self) -> CovarianceConfig {
        CovarianceConfig {
            window: self.window,
            add_mean_to_variance: self.add_mean_to_variance,
            zero_cash: self.zero_cash_in_variance_or_covariance,
        }
    }

    /// Build the mean engine.
    ///
    /// # Errors
    /// `Stats(InvalidParameter)` for a bad window.
    pub fn mean_engine(&self) -> Result<MeanEngine> {
        Ok(MeanEngine::new(self.mean_config())?)
    }

    /// Build a dispersion engine reporting `kind`.
    ///
    /// # Errors
    /// `Stats(InvalidParameter)` for a bad window or `ddof`.
    pub fn dispersion_engine(&self, kind: Dispersion) -> Result<DispersionEngine> {
        Ok(DispersionEngine::new(self.dispersion_config(kind))?)
    }

    /// Build the covariance engine.
    ///
    /// # Errors
    /// `Stats(InvalidParameter)` for a bad window.
    pub fn covariance_engine(&self) -> Result<CovarianceEngine> {
        Ok(CovarianceEngine::new(self.covariance_config())?)
    }

    /// Build the factorized covariance engine.
    ///
    /// # Errors
    /// `Stats(InvalidParameter)` for a bad window.
    pub fn factorized_covariance_engine(&self) -> Result<FactorizedCovarianceEngine> {
        Ok(FactorizedCovarianceEngine::new(
            self.covariance_config(),
            self.eigen.clone(),
        )?)
    }
}
