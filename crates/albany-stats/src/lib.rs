#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/albany/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod covariance;
pub mod dispersion;
pub mod eigen;
pub mod error;
pub mod estimator;
pub mod factorize;
pub mod mean;
pub mod recurrence;
pub mod window;

// Re-export main types
pub use covariance::{
    CovarianceConfig, CovarianceEngine, CovarianceStatistic, FactorizedCovarianceEngine,
    joint_count_matrix,
};
pub use dispersion::{Dispersion, DispersionConfig, DispersionEngine, MomentStatistic};
pub use eigen::{EigenConfig, EigenDecomposition, is_positive_semidefinite, symmetric_eigen};
pub use error::{Result, StatsError};
pub use estimator::{Estimate, IncrementalEstimator};
pub use factorize::{PsdFactorization, factorize, factorize_with};
pub use mean::{MeanConfig, MeanEngine, MeanStatistic};
pub use recurrence::{Checkpoint, SufficientStatistic};
pub use window::WindowPolicy;
