//! Cache/dispatch shim around an incremental estimator
//!
//! A [`Forecast`] owns the checkpoint of one call stream. Each call hands the
//! engine the stored checkpoint; the engine decides between the single-row
//! update and a full recompute. A repeated request for the same time is
//! answered from the cached value without calling the engine.

use crate::error::Result;
use albany_data::PanelSlice;
use albany_stats::{
    Checkpoint, CovarianceEngine, DispersionEngine, Estimate, FactorizedCovarianceEngine,
    IncrementalEstimator, MeanEngine,
};
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

/// Forecast of historical mean returns
pub type MeanForecast = Forecast<MeanEngine>;

/// Forecast of mean errors or variances
pub type DispersionForecast = Forecast<DispersionEngine>;

/// Forecast of the covariance matrix
pub type CovarianceForecast = Forecast<CovarianceEngine>;

/// Forecast of the PSD square-root factor of the covariance matrix
pub type FactorizedCovarianceForecast = Forecast<FactorizedCovarianceEngine>;

/// An engine together with the state carried between its calls
pub struct Forecast<E: IncrementalEstimator> {
    engine: E,
    checkpoint: Option<Checkpoint<E::Statistic>>,
    current: Option<(NaiveDate, E::Output)>,
}

impl<E: IncrementalEstimator> Forecast<E> {
    /// Wrap an engine with no stored state
    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            checkpoint: None,
            current: None,
        }
    }

    /// The wrapped engine
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Stored checkpoint, if any call has succeeded since the last reset
    pub const fn checkpoint(&self) -> Option<&Checkpoint<E::Statistic>> {
        self.checkpoint.as_ref()
    }

    /// Time and value of the last successful evaluation
    pub fn current(&self) -> Option<(NaiveDate, &E::Output)> {
        self.current.as_ref().map(|(t, value)| (*t, value))
    }

    /// Value at `t` given every row of `past` strictly before `t`.
    ///
    /// A failed step drops the cached value but keeps the checkpoint; the
    /// next step recomputes if the checkpoint no longer lines up.
    ///
    /// # Errors
    /// Any engine error for this step.
    pub fn evaluate(&mut self, t: NaiveDate, past: &PanelSlice<'_>) -> Result<&E::Output> {
        let current = match self.current.take() {
            Some((time, value)) if time == t => {
                debug!(%t, "serving cached value");
                (time, value)
            }
            _ => {
                let Estimate { value, checkpoint } =
                    self.engine.compute(t, past, self.checkpoint.as_ref())?;
                self.checkpoint = Some(checkpoint);
                (t, value)
            }
        };
        let (_, value) = self.current.insert(current);
        Ok(&*value)
    }

    /// Forget the checkpoint and cached value
    pub fn reset(&mut self) {
        self.checkpoint = None;
        self.current = None;
    }
}

impl<E> fmt::Debug for Forecast<E>
where
    E: IncrementalEstimator + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forecast")
            .field("engine", &self.engine)
            .field("checkpoint_time", &self.checkpoint.as_ref().map(|c| c.last_time()))
            .field("current_time", &self.current.as_ref().map(|(t, _)| *t))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use albany_data::ReturnsPanel;
    use albany_stats::{MeanConfig, StatsError, WindowPolicy};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn panel() -> ReturnsPanel {
        ReturnsPanel::new(
            (1..=4).map(date).collect(),
            vec!["AAA".into(), "BBB".into(), "CASH".into()],
            array![
                [0.010, 0.020, 0.001],
                [0.020, f64::NAN, 0.001],
                [-0.010, 0.005, 0.002],
                [0.030, 0.015, 0.002],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_steps_carry_checkpoint() {
        let panel = panel();
        let mut forecast = MeanForecast::new(MeanEngine::default());
        assert!(forecast.checkpoint().is_none());

        for day in 2..=5 {
            let t = date(day);
            forecast.evaluate(t, &panel.past(t)).unwrap();
            assert_eq!(forecast.checkpoint().unwrap().last_time(), date(day - 1));
        }

        let (t, value) = forecast.current().unwrap();
        assert_eq!(t, date(5));
        assert_relative_eq!(value[0], 0.05 / 4.0, max_relative = 1e-12);
        assert_relative_eq!(value[1], 0.04 / 3.0, max_relative = 1e-12);
        assert_eq!(value[2], 0.002);
    }

    #[test]
    fn test_repeated_time_is_cached() {
        let panel = panel();
        let mut forecast = MeanForecast::new(MeanEngine::default());
        let first = forecast.evaluate(date(4), &panel.past(date(4))).unwrap().clone();

        // The cached value is returned even for a different slice
        let second = forecast.evaluate(date(4), &panel.full()).unwrap();
        assert_eq!(&first, second);
        assert_eq!(forecast.checkpoint().unwrap().last_time(), date(3));
    }

    #[test]
    fn test_failed_step_keeps_checkpoint() {
        let panel = panel();
        let mut forecast = MeanForecast::new(MeanEngine::default());
        forecast.evaluate(date(3), &panel.past(date(3))).unwrap();

        let result = forecast.evaluate(date(2), &panel.past(date(3)));
        assert!(matches!(
            result,
            Err(ForecastError::Stats(StatsError::LookAhead { .. }))
        ));
        assert!(forecast.current().is_none());
        assert_eq!(forecast.checkpoint().unwrap().last_time(), date(2));

        forecast.evaluate(date(4), &panel.past(date(4))).unwrap();
        assert_eq!(forecast.checkpoint().unwrap().last_time(), date(3));
    }

    #[test]
    fn test_reset() {
        let panel = panel();
        let engine = MeanEngine::new(MeanConfig {
            window: WindowPolicy::Rolling { size: 2 },
            ..Default::default()
        })
        .unwrap();
        let mut forecast = MeanForecast::new(engine);
        forecast.evaluate(date(5), &panel.past(date(5))).unwrap();

        forecast.reset();
        assert!(forecast.checkpoint().is_none());
        assert!(forecast.current().is_none());

        let value = forecast.evaluate(date(5), &panel.past(date(5))).unwrap();
        assert_relative_eq!(value[0], 0.01, max_relative = 1e-12);
        assert!(format!("{forecast:?}").contains("Rolling"));
    }
}
