//! Short-horizon GCS forecast.
//!
//! An ordinary least-squares line over the sample index gives the next value
//! and a trend label. When the line slopes downward, an exponential decay
//! rate `λ ≈ −slope / mean` estimates how many samples remain before the score
//! crosses the degradation floor.

use cogfield_core::{ForecastResult, Trend, round_to};

/// Forecast returned when there is too little history for a fit.
pub const DEFAULT_NEXT: f64 = 50.0;
/// GCS level treated as "degraded" by the decay estimate.
pub const DEGRADATION_FLOOR: f64 = 40.0;
/// `|slope|` below which the trend is reported as stable.
pub const STABLE_SLOPE: f64 = 0.3;

const MIN_FIT_SAMPLES: usize = 3;
const MEAN_EPSILON: f64 = 1e-9;

/// Fit a trend line to `history` (oldest → newest) and project one step ahead.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn predict(history: &[f64]) -> ForecastResult {
    if history.len() < MIN_FIT_SAMPLES {
        return ForecastResult {
            next: history.last().copied().unwrap_or(DEFAULT_NEXT),
            slope: 0.0,
            intercept: 0.0,
            trend: Trend::Stable,
            decay_lambda: 0.0,
            time_to_threshold: None,
        };
    }

    let n = history.len() as f64;
    let (slope, intercept) = least_squares(history);
    let next = slope.mul_add(n, intercept).clamp(0.0, 100.0);
    let trend = classify(slope);

    let mean = history.iter().sum::<f64>() / n;
    let last = history[history.len() - 1];
    let (decay_lambda, time_to_threshold) = decay_estimate(slope, mean, last);

    ForecastResult {
        next: round_to(next, 2),
        slope: round_to(slope, 4),
        intercept: round_to(intercept, 4),
        trend,
        decay_lambda: round_to(decay_lambda, 4),
        time_to_threshold: time_to_threshold.map(|t| round_to(t, 2)),
    }
}

/// Trend label for a fitted slope.
#[must_use]
pub fn classify(slope: f64) -> Trend {
    if slope.abs() < STABLE_SLOPE {
        Trend::Stable
    } else if slope > 0.0 {
        Trend::Improving
    } else {
        Trend::Degrading
    }
}

/// `(slope, intercept)` of the OLS line through `(i, y[i])`.
#[allow(clippy::cast_precision_loss)]
fn least_squares(y: &[f64]) -> (f64, f64) {
    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;
    let (sxy, sxx) = y
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &yi)| {
            let dx = i as f64 - x_mean;
            (dx.mul_add(yi - y_mean, sxy), dx.mul_add(dx, sxx))
        });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, slope.mul_add(-x_mean, y_mean))
}

/// Decay rate and samples-to-floor for a falling series.
fn decay_estimate(slope: f64, mean: f64, last: f64) -> (f64, Option<f64>) {
    if slope >= 0.0 || mean <= 0.0 {
        return (0.0, None);
    }
    let lambda = -slope / (mean + MEAN_EPSILON);
    if last <= DEGRADATION_FLOOR {
        return (lambda, Some(0.0));
    }
    (lambda, Some((last / DEGRADATION_FLOOR).ln() / lambda))
}
