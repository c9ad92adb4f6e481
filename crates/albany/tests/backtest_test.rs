//! Integration tests driving the forecasts through a simulated backtest.

use albany::data::ReturnsPanel;
use albany::stats::{
    Dispersion, IncrementalEstimator, StatsError, WindowPolicy, is_positive_semidefinite,
};
use albany::{
    CovarianceForecast, DispersionForecast, FactorizedCovarianceForecast, ForecastConfig,
    ForecastError, MeanForecast,
};
use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use ndarray::Array2;
use rstest::rstest;
use tracing_subscriber::EnvFilter;

const N_ROWS: usize = 80;
const WARMUP: usize = 10;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn time_at(k: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 6, 1).unwrap() + Days::new(k as u64)
}

/// Deterministic returns for three risky assets and cash, with gaps
fn panel() -> ReturnsPanel {
    let values = Array2::from_shape_fn((N_ROWS, 4), |(i, j)| {
        let x = i as f64;
        match j {
            0 => 0.01 * (0.7 * x).sin() + 0.002,
            1 if i % 7 == 3 => f64::NAN,
            1 => 0.015 * (0.3 * x + 1.0).cos() - 0.5 * 0.01 * (0.7 * x).sin(),
            2 if i % 11 == 5 || i % 13 == 8 => f64::NAN,
            2 => 0.02 * (1.3 * x).sin() * (0.1 * x).cos(),
            _ => 0.0001 * (1.0 + 0.1 * (0.5 * x).sin()),
        }
    });
    ReturnsPanel::new(
        (0..N_ROWS).map(time_at).collect(),
        vec!["AAA".into(), "BBB".into(), "CCC".into(), "CASH".into()],
        values,
    )
    .unwrap()
}

fn assert_all_close<'a>(
    a: impl IntoIterator<Item = &'a f64>,
    b: impl IntoIterator<Item = &'a f64>,
) {
    for (x, y) in a.into_iter().zip(b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-14, max_relative = 1e-10);
    }
}

#[rstest]
#[case::expanding(r#"{}"#)]
#[case::rolling(r#"{"window": {"kind": "rolling", "size": 20}}"#)]
#[case::exponential(r#"{"window": {"kind": "exponential", "halflife": 15.0}}"#)]
#[case::second_moments(r#"{"add_mean_to_variance": true, "zero_cash_in_variance_or_covariance": false}"#)]
fn test_backtest_matches_fresh_recompute(#[case] json: &str) {
    init_tracing();
    let config = ForecastConfig::from_json(json).unwrap();
    let panel = panel();

    let mut mean = MeanForecast::new(config.mean_engine().unwrap());
    let mut error =
        DispersionForecast::new(config.dispersion_engine(Dispersion::MeanError).unwrap());
    let mut variance =
        DispersionForecast::new(config.dispersion_engine(Dispersion::Variance).unwrap());
    let mut covariance = CovarianceForecast::new(config.covariance_engine().unwrap());
    let mut factor =
        FactorizedCovarianceForecast::new(config.factorized_covariance_engine().unwrap());

    for k in WARMUP..=N_ROWS {
        let t = time_at(k);
        let past = panel.past(t);

        let fresh = mean.engine().compute(t, &past, None).unwrap().value;
        let value = mean.evaluate(t, &past).unwrap();
        assert_all_close(value, &fresh);

        let fresh = error.engine().compute(t, &past, None).unwrap().value;
        let value = error.evaluate(t, &past).unwrap();
        assert_all_close(value, &fresh);
        assert!(value.iter().all(|&v| v >= 0.0));

        let fresh = variance.engine().compute(t, &past, None).unwrap().value;
        let value = variance.evaluate(t, &past).unwrap();
        assert_all_close(value, &fresh);

        let sigma = covariance.evaluate(t, &past).unwrap().clone();
        let fresh = covariance.engine().compute(t, &past, None).unwrap().value;
        assert_all_close(&sigma, &fresh);
        assert_eq!(sigma, sigma.t());

        let f = factor.evaluate(t, &past).unwrap();
        let cleaned = f.dot(&f.t());
        assert!(is_positive_semidefinite(&cleaned, 1e-12));
        assert_eq!(cleaned.dim(), sigma.dim());

        assert_eq!(covariance.checkpoint().unwrap().last_time(), time_at(k - 1));
    }

    let expected_dim = if config.zero_cash_in_variance_or_covariance { 4 } else { 3 };
    let (_, sigma) = covariance.current().unwrap();
    assert_eq!(sigma.dim(), (expected_dim, expected_dim));
}

#[test]
fn test_skipped_steps_fall_back_to_recompute() {
    init_tracing();
    let config = ForecastConfig {
        window: WindowPolicy::Rolling { size: 12 },
        ..Default::default()
    };
    let panel = panel();
    let mut covariance = CovarianceForecast::new(config.covariance_engine().unwrap());

    // Every third row only: the checkpoint never lines up with the new slice
    for k in (WARMUP..=N_ROWS).step_by(3) {
        let t = time_at(k);
        let past = panel.past(t);
        let value = covariance.evaluate(t, &past).unwrap().clone();
        let fresh = covariance.engine().compute(t, &past, None).unwrap().value;
        assert_eq!(value, fresh);
    }
}

#[test]
fn test_insufficient_history_is_an_error() {
    init_tracing();
    let panel = panel();
    let mut variance = DispersionForecast::new(
        ForecastConfig::default()
            .dispersion_engine(Dispersion::MeanError)
            .unwrap(),
    );
    // A single row cannot give a sample standard error
    let t = time_at(1);
    let result = variance.evaluate(t, &panel.past(t));
    assert!(matches!(
        result,
        Err(ForecastError::Stats(StatsError::InsufficientData { .. }))
    ));
}
