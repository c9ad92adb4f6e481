//! Returns panel
//!
//! An ordered, time-indexed table of per-asset returns. The last column is
//! the cash asset, which is always observed. Missing entries are `NaN`.
//!
//! Engines never see the panel itself: they receive a [`PanelSlice`] holding
//! every row strictly before the evaluation time.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};
use std::collections::HashSet;

/// Whether a panel entry is an observation (as opposed to missing).
#[inline]
pub fn is_observed(value: f64) -> bool {
    !value.is_nan()
}

/// Time-indexed returns panel with the cash asset in the last column
#[derive(Debug, Clone)]
pub struct ReturnsPanel {
    index: Vec<NaiveDate>,
    assets: Vec<String>,
    values: Array2<f64>,
}

impl ReturnsPanel {
    /// Build a panel from a (rows x assets) matrix where `NaN` marks a missing
    /// observation.
    ///
    /// # Errors
    /// Fails when the shape does not match, the index is not strictly
    /// increasing, asset names repeat, a value is infinite or the cash column
    /// has a gap.
    pub fn new(index: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if assets.is_empty() {
            return Err(DataError::NoAssets);
        }
        if values.nrows() != index.len() {
            return Err(DataError::ShapeMismatch {
                expected: index.len(),
                actual: values.nrows(),
                context: "rows",
            });
        }
        if values.ncols() != assets.len() {
            return Err(DataError::ShapeMismatch {
                expected: assets.len(),
                actual: values.ncols(),
                context: "asset columns",
            });
        }

        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(DataError::DuplicateAsset(asset.clone()));
            }
        }

        for pair in index.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataError::NonMonotonicIndex {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        let cash = assets.len() - 1;
        for (row, date) in values.rows().into_iter().zip(&index) {
            for (j, &value) in row.iter().enumerate() {
                if value.is_infinite() {
                    return Err(DataError::NonFinite {
                        asset: assets[j].clone(),
                        date: *date,
                    });
                }
            }
            if !is_observed(row[cash]) {
                return Err(DataError::MissingCash {
                    asset: assets[cash].clone(),
                    date: *date,
                });
            }
        }

        Ok(Self {
            index,
            assets,
            values,
        })
    }

    /// Build a panel from rows of optional returns.
    ///
    /// # Errors
    /// Same conditions as [`ReturnsPanel::new`], plus ragged rows.
    pub fn from_rows(
        index: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: &[Vec<Option<f64>>],
    ) -> Result<Self> {
        let n_assets = assets.len();
        let mut values = Array2::from_elem((rows.len(), n_assets), f64::NAN);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_assets {
                return Err(DataError::ShapeMismatch {
                    expected: n_assets,
                    actual: row.len(),
                    context: "row width",
                });
            }
            for (j, value) in row.iter().enumerate() {
                if let Some(v) = value {
                    values[[i, j]] = *v;
                }
            }
        }
        Self::new(index, assets, values)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the panel has no rows
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of assets, cash included
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Asset identifiers, cash last
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Row timestamps
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Whole panel as a slice
    pub fn full(&self) -> PanelSlice<'_> {
        PanelSlice {
            index: &self.index,
            assets: &self.assets,
            values: self.values.view(),
        }
    }

    /// Every row strictly before `t`
    pub fn past(&self, t: NaiveDate) -> PanelSlice<'_> {
        let end = self.index.partition_point(|date| *date < t);
        PanelSlice {
            index: &self.index[..end],
            assets: &self.assets,
            values: self.values.slice(s![..end, ..]),
        }
    }
}

/// Borrowed view over consecutive rows of a [`ReturnsPanel`]
#[derive(Debug, Clone, Copy)]
pub struct PanelSlice<'a> {
    index: &'a [NaiveDate],
    assets: &'a [String],
    values: ArrayView2<'a, f64>,
}

impl<'a> PanelSlice<'a> {
    /// Number of rows
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the slice has no rows
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of assets, cash included
    pub const fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Column of the cash asset
    pub const fn cash_index(&self) -> usize {
        self.assets.len() - 1
    }

    /// Asset identifiers, cash last
    pub const fn assets(&self) -> &'a [String] {
        self.assets
    }

    /// Identifier of asset `i`
    pub fn asset(&self, i: usize) -> &'a str {
        &self.assets[i]
    }

    /// Row timestamps
    pub const fn index(&self) -> &'a [NaiveDate] {
        self.index
    }

    /// Returns matrix (rows x assets), `NaN` where missing
    pub fn values(&self) -> ArrayView2<'a, f64> {
        self.values
    }

    /// Row `i` of the slice
    pub fn row(&self, i: usize) -> ArrayView1<'a, f64> {
        self.values.index_axis_move(Axis(0), i)
    }

    /// Newest row
    pub fn last_row(&self) -> Option<ArrayView1<'a, f64>> {
        self.len().checked_sub(1).map(|i| self.row(i))
    }

    /// Timestamp of the newest row
    pub fn last_time(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Timestamp of the row before the newest one
    pub fn previous_time(&self) -> Option<NaiveDate> {
        self.len().checked_sub(2).map(|i| self.index[i])
    }

    /// Most recent cash return
    pub fn last_cash(&self) -> Option<f64> {
        self.last_row().map(|row| row[self.cash_index()])
    }

    /// The trailing `n` rows (all of them when fewer are available)
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            index: &self.index[start..],
            assets: self.assets,
            values: self.values.slice_move(s![start.., ..]),
        }
    }
}
