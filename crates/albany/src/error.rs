//! Error types for forecasts and their configuration.

use albany_data::DataError;
use albany_stats::StatsError;
use thiserror::Error;

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors surfaced by a forecast step or while loading its configuration
#[derive(Debug, Error)]
pub enum ForecastError {
    /// An engine could not produce a value for this step
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// The returns panel is malformed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
