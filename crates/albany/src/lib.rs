#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/albany/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod forecast;

// Re-export main types from sub-crates
pub use albany_data as data;
pub use albany_stats as stats;

pub use config::ForecastConfig;
pub use error::{ForecastError, Result};
pub use forecast::{
    CovarianceForecast, DispersionForecast, FactorizedCovarianceForecast, Forecast, MeanForecast,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
