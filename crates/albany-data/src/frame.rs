//! Polars adapter
//!
//! Converts a wide `DataFrame` (one date column, one column per asset, cash
//! last) into a [`ReturnsPanel`]. Nulls become missing observations.

use crate::error::{DataError, Result};
use crate::panel::ReturnsPanel;
use chrono::NaiveDate;
use ndarray::Array2;
use polars::prelude::*;

impl ReturnsPanel {
    /// Build a panel from a wide frame.
    ///
    /// Every column other than `date_column` is an asset, in frame order, and
    /// the last of them is cash. Dates may be a `Date` column or `YYYY-MM-DD`
    /// strings.
    ///
    /// # Errors
    /// Fails when the date column is absent or unparsable, when an asset column
    /// cannot be cast to `f64`, or on any [`ReturnsPanel::new`] violation.
    pub fn from_dataframe(df: &DataFrame, date_column: &str) -> Result<Self> {
        let height = df.height();

        let dates = df
            .column(date_column)
            .map_err(|_| DataError::MissingColumn(date_column.to_string()))?
            .cast(&DataType::String)?;
        let dates = dates.str()?;

        let mut index = Vec::with_capacity(height);
        for i in 0..height {
            let raw = dates
                .get(i)
                .ok_or_else(|| DataError::Parse(format!("Missing date at row {i}")))?;
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("Invalid date {raw:?}: {e}")))?;
            index.push(date);
        }

        let assets: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != date_column)
            .map(|name| name.to_string())
            .collect();

        let mut values = Array2::from_elem((height, assets.len()), f64::NAN);
        for (j, asset) in assets.iter().enumerate() {
            let column = df.column(asset)?.cast(&DataType::Float64)?;
            let column = column.f64()?;
            for i in 0..height {
                if let Some(value) = column.get(i) {
                    values[[i, j]] = value;
                }
            }
        }

        Self::new(index, assets, values)
    }
}
