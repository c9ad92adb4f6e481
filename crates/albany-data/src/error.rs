//! Error types for panel construction and loading.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while building a returns panel.
#[derive(Debug, Error)]
pub enum DataError {
    /// The panel has no columns, so there is no cash asset
    #[error("Panel needs at least one asset column (the cash column)")]
    NoAssets,

    /// Asset identifiers must be unique
    #[error("Duplicate asset identifier: {0}")]
    DuplicateAsset(String),

    /// Timestamps must be strictly increasing
    #[error("Index is not strictly increasing: {next} follows {previous}")]
    NonMonotonicIndex {
        /// Timestamp of the earlier row
        previous: NaiveDate,
        /// Timestamp of the offending row
        next: NaiveDate,
    },

    /// The cash column must be observed on every row
    #[error("Cash column {asset} is missing a value at {date}")]
    MissingCash {
        /// Cash asset identifier
        asset: String,
        /// Row timestamp
        date: NaiveDate,
    },

    /// Infinite values are never valid returns
    #[error("Non-finite return for {asset} at {date}")]
    NonFinite {
        /// Asset identifier
        asset: String,
        /// Row timestamp
        date: NaiveDate,
    },

    /// Shape of the supplied values does not match index and assets
    #[error("Shape mismatch for {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
        /// What was being checked
        context: &'static str,
    },

    /// Missing required column
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
