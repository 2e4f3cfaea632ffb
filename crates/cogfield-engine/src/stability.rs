//! Cognitive Stability Index (CSI) and Global Cognitive Score (GCS).
//!
//! ```text
//!   CSI_raw = (SignalStrength × StabilityFactor × TimeConsistency)
//!             / (Noise + Entropy + Variance + ε')
//!   CSI     = CSI_raw / (CSI_raw + 1)
//!   GCS     = 100 × Σ wᵢ · CSIᵢ
//! ```
//!
//! The operation order and both epsilons are load-bearing: the anomaly
//! thresholds downstream are tuned against exactly this formula.

use serde::{Deserialize, Serialize};

use cogfield_core::{CandidateWeights, Channel, ChannelScores, round_to};

/// Added to the standard deviation before inverting it.
const STD_EPSILON: f64 = 1e-9;
/// Added to the CSI denominator.
const DENOMINATOR_EPSILON: f64 = 1e-6;
/// Added to the histogram sample count when forming bin probabilities.
const COUNT_EPSILON: f64 = 1e-9;
/// Added inside the entropy logarithm.
const LOG_EPSILON: f64 = 1e-12;
/// Number of equal-width entropy bins over `[0, 1]`.
const ENTROPY_BINS: usize = 10;
/// Latency (ms) at which the latency noise term alone saturates.
const LATENCY_NOISE_SCALE_MS: f64 = 500.0;

/// Noise and smoothing inputs for [`compute_csi`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CsiParams {
    /// Packet loss ratio contributing to noise.
    pub noise_ratio: f64,
    /// Latency contributing to noise.
    pub latency_ms: f64,
    /// Moving-average window for the time-consistency term.
    pub window: usize,
}

impl Default for CsiParams {
    fn default() -> Self {
        Self {
            noise_ratio: 0.0,
            latency_ms: 20.0,
            window: 10,
        }
    }
}

impl CsiParams {
    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub const fn with_noise(mut self, noise_ratio: f64, latency_ms: f64) -> Self {
        self.noise_ratio = noise_ratio;
        self.latency_ms = latency_ms;
        self
    }
}

/// Compute the CSI of a channel history (oldest → newest).
///
/// Returns `0.0` for an empty history. The result is always within `[0, 1]`;
/// non-finite intermediate values (from non-finite samples) collapse to `0.0`.
#[must_use]
pub fn compute_csi(history: &[f64], params: CsiParams) -> f64 {
    if history.is_empty() {
        return 0.0;
    }

    let mean_signal = mean(history);
    let variance = population_variance(history, mean_signal);
    let std_signal = variance.sqrt() + STD_EPSILON;

    let signal_strength = mean_signal;
    let stability_factor = 1.0 / std_signal;
    let time_consistency = moving_average(history, params.window);

    let entropy = shannon_entropy(history);
    let noise = (params.noise_ratio + params.latency_ms / LATENCY_NOISE_SCALE_MS).min(1.0);

    let numerator = signal_strength * stability_factor * time_consistency;
    let denominator = noise + entropy + variance + DENOMINATOR_EPSILON;

    let raw = numerator / denominator;
    let csi = raw / (raw + 1.0);
    if csi.is_finite() {
        csi.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted combination of channel CSIs on the `0–100` scale.
///
/// Weights missing from a partial vector fall back to their channel defaults.
/// The result is clipped to `[0, 100]` and rounded to 2 decimals.
#[must_use]
pub fn compute_gcs(csi: &ChannelScores, weights: impl Into<CandidateWeights>) -> f64 {
    let weights = weights.into();
    let weight = |channel: Channel| weights.get(channel).unwrap_or(channel.default_weight());
    let raw = weight(Channel::Wifi) * csi.wifi
        + weight(Channel::Bt) * csi.bt
        + weight(Channel::Net) * csi.net
        + weight(Channel::Sys) * csi.sys;
    round_to((raw * 100.0).clamp(0.0, 100.0), 2)
}

/// Normalized Shannon entropy of samples discretized into 10 bins over `[0, 1]`.
///
/// Samples are clamped into `[0, 1]` first. The result lies in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut counts = [0_usize; ENTROPY_BINS];
    for &sample in samples {
        counts[histogram_bin(sample.clamp(0.0, 1.0))] += 1;
    }

    let total = samples.len() as f64 + COUNT_EPSILON;
    let h: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            p * (p + LOG_EPSILON).log2()
        })
        .sum();
    let max_h = (ENTROPY_BINS as f64).log2();
    -h / max_h
}

/// Bin index of a value in `[0, 1]`, with the last bin closed on the right.
///
/// The initial guess `⌊10·v⌋` is corrected against the actual bin edges
/// (`i · 0.1`) so values that sit exactly on a rounded edge land in the same
/// bin as a floating-point edge comparison would put them.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn histogram_bin(value: f64) -> usize {
    let last = ENTROPY_BINS - 1;
    let mut index = ((value * ENTROPY_BINS as f64) as usize).min(last);
    if index > 0 && value < bin_edge(index) {
        index -= 1;
    }
    if index < last && value >= bin_edge(index + 1) {
        index += 1;
    }
    index
}

#[allow(clippy::cast_precision_loss)]
fn bin_edge(index: usize) -> f64 {
    if index >= ENTROPY_BINS {
        1.0
    } else {
        index as f64 * (1.0 / ENTROPY_BINS as f64)
    }
}

/// Arithmetic mean; `0.0` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population variance around a precomputed mean; `0.0` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn population_variance(samples: &[f64], mean: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples
        .iter()
        .map(|&x| {
            let delta = x - mean;
            delta * delta
        })
        .sum::<f64>()
        / samples.len() as f64
}

/// Population variance of `samples`.
#[must_use]
pub fn signal_variance(samples: &[f64]) -> f64 {
    population_variance(samples, mean(samples))
}

/// Mean of the most recent `window` samples, or of all samples when fewer.
#[must_use]
pub fn moving_average(samples: &[f64], window: usize) -> f64 {
    if window > 0 && samples.len() >= window {
        mean(&samples[samples.len() - window..])
    } else {
        mean(samples)
    }
}
