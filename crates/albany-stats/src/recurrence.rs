//! Shared online recurrence
//!
//! Every engine folds panel rows into a sufficient statistic. The fold is the
//! same for all of them and depends only on the window policy:
//!
//! | policy | one new row |
//! |---|---|
//! | expanding | add `x` |
//! | rolling(w) | remove `x_{new-w}`, add `x_new` |
//! | exponential | scale weights by `d`, add `x` |
//!
//! [`advance`] applies it when the checkpoint sits exactly one row behind the
//! history. Otherwise [`rebuild`] replays the same fold over the window rows,
//! so both paths run identical arithmetic for expanding and exponential
//! windows.

use crate::error::{Result, StatsError};
use crate::window::WindowPolicy;
use albany_data::PanelSlice;
use chrono::NaiveDate;
use ndarray::ArrayView1;
use tracing::debug;

/// Sufficient statistic folded row by row
pub trait SufficientStatistic: Clone {
    /// Statistic with nothing folded in
    fn empty(n_assets: usize) -> Self;

    /// Fold one row in; a negative weight removes a previously added row.
    /// Missing entries contribute nothing.
    fn accumulate(&mut self, row: ArrayView1<'_, f64>, weight: f64);

    /// Scale every accumulated weight by `factor`
    fn decay(&mut self, factor: f64);

    /// Number of assets the statistic covers
    fn n_assets(&self) -> usize;
}

/// Sufficient statistic together with the timestamp of the newest row folded in
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<S> {
    statistic: S,
    last_time: NaiveDate,
}

impl<S: SufficientStatistic> Checkpoint<S> {
    /// Timestamp of the newest row folded into the statistic
    pub const fn last_time(&self) -> NaiveDate {
        self.last_time
    }

    /// The sufficient statistic
    pub const fn statistic(&self) -> &S {
        &self.statistic
    }

    /// Check that `past` holds exactly one row more than this checkpoint
    pub fn check_successor(&self, past: &PanelSlice<'_>) -> Result<()> {
        if self.statistic.n_assets() != past.n_assets() {
            return Err(StatsError::DimensionMismatch {
                expected: self.statistic.n_assets(),
                actual: past.n_assets(),
            });
        }
        let previous = past.previous_time();
        if previous != Some(self.last_time) {
            return Err(StatsError::CheckpointMismatch {
                checkpoint: self.last_time,
                previous,
            });
        }
        Ok(())
    }
}

/// Produce the checkpoint for `past`, incrementally when `checkpoint` allows it.
///
/// # Errors
/// Fails with `InsufficientData` when `past` is empty.
pub fn advance<S: SufficientStatistic>(
    policy: &WindowPolicy,
    past: &PanelSlice<'_>,
    checkpoint: Option<&Checkpoint<S>>,
) -> Result<Checkpoint<S>> {
    let Some(last_time) = past.last_time() else {
        return Err(StatsError::insufficient(past.asset(0)));
    };

    if let Some(previous) = checkpoint {
        match previous.check_successor(past) {
            Ok(()) => {
                let mut statistic = previous.statistic.clone();
                fold_newest(policy, past, &mut statistic);
                debug!(%last_time, rows = past.len(), "incremental update");
                return Ok(Checkpoint {
                    statistic,
                    last_time,
                });
            }
            Err(err) => {
                debug!(%last_time, error = %err, "checkpoint unusable, recomputing");
            }
        }
    }

    Ok(Checkpoint {
        statistic: rebuild(policy, past),
        last_time,
    })
}

/// Build the statistic over the whole window of `past`
pub fn rebuild<S: SufficientStatistic>(policy: &WindowPolicy, past: &PanelSlice<'_>) -> S {
    let mut statistic = S::empty(past.n_assets());
    let decay = policy.decay();
    for row in policy.rows(past).values().rows() {
        if decay != 1.0 {
            statistic.decay(decay);
        }
        statistic.accumulate(row, 1.0);
    }
    statistic
}

fn fold_newest<S: SufficientStatistic>(
    policy: &WindowPolicy,
    past: &PanelSlice<'_>,
    statistic: &mut S,
) {
    let n = past.len();
    let newest = past.row(n - 1);
    match *policy {
        WindowPolicy::Expanding => statistic.accumulate(newest, 1.0),
        WindowPolicy::Rolling { size } => {
            if n > size {
                statistic.accumulate(past.row(n - 1 - size), -1.0);
            }
            statistic.accumulate(newest, 1.0);
        }
        WindowPolicy::Exponential { .. } => {
            statistic.decay(policy.decay());
            statistic.accumulate(newest, 1.0);
        }
    }
}
