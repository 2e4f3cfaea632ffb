//! Anomaly detection over the GCS history.
//!
//! Three signals are computed per request:
//!
//! - **Rolling z-score** of the newest sample against all earlier samples.
//! - **High-frequency energy** of the last 16 samples. This is a DCT-II style
//!   projection onto the upper half of the basis, reduced to a single energy
//!   figure (`sqrt(Σ c_k²) / 16`). The exact formula is kept because the
//!   oscillation threshold is calibrated against it.
//! - **Bayesian confidence** that the score is stable, the posterior mean of
//!   a Beta distribution with a uniform prior.
//!
//! Threshold crossings become [`AnomalyEvent`]s in a bounded [`AnomalyLog`].

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cogfield_core::{
    AnalyzerConfig, AnomalyEvent, AnomalyKind, AnomalySeverity, AnomalySummary, round_to,
};

use crate::stability::{mean, population_variance};

/// Samples analyzed by the high-frequency energy check.
pub const OSCILLATION_WINDOW: usize = 16;
/// First basis index counted as "high frequency".
pub const HIGH_FREQUENCY_START: usize = 8;
/// Minimum history length for a z-score.
pub const MIN_ZSCORE_SAMPLES: usize = 3;
/// Default anomaly log capacity.
pub const DEFAULT_ANOMALY_LOG_CAPACITY: usize = 50;

const Z_SIGMA_EPSILON: f64 = 1e-9;
const Z_MEDIUM: f64 = 3.0;
const Z_HIGH: f64 = 4.0;

// ─── Statistics ─────────────────────────────────────────────────────────────

/// `|z|` of the last sample against the mean and population standard
/// deviation of all preceding samples. Returns `0.0` below three samples.
#[must_use]
pub fn rolling_zscore(samples: &[f64]) -> f64 {
    let Some((&last, prefix)) = samples.split_last() else {
        return 0.0;
    };
    if samples.len() < MIN_ZSCORE_SAMPLES {
        return 0.0;
    }
    let mu = mean(prefix);
    let sigma = population_variance(prefix, mu).sqrt() + Z_SIGMA_EPSILON;
    ((last - mu) / sigma).abs()
}

/// High-frequency energy of the most recent [`OSCILLATION_WINDOW`] samples.
///
/// ```text
///   c_k = Σ_{i<16} s[i] · cos(π · k · (2i + 1) / 32)     k ∈ 8..16
///   E   = sqrt(Σ c_k²) / 16
/// ```
///
/// Returns `0.0` when fewer than 16 samples are available.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn high_frequency_energy(samples: &[f64]) -> f64 {
    let n = OSCILLATION_WINDOW;
    if samples.len() < n {
        return 0.0;
    }
    let segment = &samples[samples.len() - n..];
    let energy: f64 = (HIGH_FREQUENCY_START..n)
        .map(|k| {
            let c: f64 = segment
                .iter()
                .enumerate()
                .map(|(i, &s)| {
                    let phase = PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64;
                    s * phase.cos()
                })
                .sum();
            c * c
        })
        .sum();
    energy.sqrt() / n as f64
}

/// Posterior mean `(s + 1) / (n + 2)` where `s` counts samples at or above
/// `threshold`. An empty history yields `0.5`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bayesian_confidence(samples: &[f64], threshold: f64) -> f64 {
    let successes = samples.iter().filter(|&&v| v >= threshold).count();
    let failures = samples.len() - successes;
    (successes as f64 + 1.0) / (successes as f64 + failures as f64 + 2.0)
}

/// Severity of a z-score event from its magnitude.
#[must_use]
pub fn zscore_severity(z: f64) -> AnomalySeverity {
    if z > Z_HIGH {
        AnomalySeverity::High
    } else if z > Z_MEDIUM {
        AnomalySeverity::Medium
    } else {
        AnomalySeverity::Low
    }
}

// ─── Thresholds ─────────────────────────────────────────────────────────────

/// Detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// `|z|` strictly above this emits a z-score event.
    pub z_score: f64,
    /// Energy strictly above this emits an oscillation event.
    pub oscillation: f64,
    /// GCS counted as a stable sample by [`bayesian_confidence`].
    pub confidence: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            z_score: 2.5,
            oscillation: 15.0,
            confidence: 60.0,
        }
    }
}

impl From<&AnalyzerConfig> for AnomalyThresholds {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            z_score: config.z_threshold,
            oscillation: config.oscillation_threshold,
            confidence: config.confidence_threshold,
        }
    }
}

// ─── Event log ──────────────────────────────────────────────────────────────

/// Bounded FIFO of anomaly events.
#[derive(Debug, Clone)]
pub struct AnomalyLog {
    events: VecDeque<AnomalyEvent>,
    capacity: usize,
}

impl Default for AnomalyLog {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_LOG_CAPACITY)
    }
}

impl AnomalyLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: AnomalyEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The `n` most recent events, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<AnomalyEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ─── Detector ───────────────────────────────────────────────────────────────

/// Statistics and events produced for one GCS history.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Unrounded statistics.
    pub summary: AnomalySummary,
    /// Events raised, z-score first.
    pub events: Vec<AnomalyEvent>,
}

impl Detection {
    /// Summary rounded to 3 decimals for reporting.
    #[must_use]
    pub fn rounded_summary(&self) -> AnomalySummary {
        AnomalySummary {
            z_score: round_to(self.summary.z_score, 3),
            oscillation_energy: round_to(self.summary.oscillation_energy, 3),
            bayesian_confidence: round_to(self.summary.bayesian_confidence, 3),
        }
    }
}

/// Stateless evaluator; the event log lives with the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    #[must_use]
    pub const fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub const fn thresholds(&self) -> AnomalyThresholds {
        self.thresholds
    }

    /// Evaluate a GCS history (oldest → newest), timestamping events now.
    #[must_use]
    pub fn evaluate(&self, gcs_history: &[f64]) -> Detection {
        self.evaluate_at(gcs_history, now_ms())
    }

    /// Evaluate with an explicit event timestamp.
    #[must_use]
    pub fn evaluate_at(&self, gcs_history: &[f64], timestamp_ms: u64) -> Detection {
        let z = rolling_zscore(gcs_history);
        let energy = high_frequency_energy(gcs_history);
        let confidence = bayesian_confidence(gcs_history, self.thresholds.confidence);
        let gcs = gcs_history.last().copied().unwrap_or_default();

        let mut events = Vec::new();
        if z > self.thresholds.z_score {
            let severity = zscore_severity(z);
            let event = AnomalyEvent {
                kind: AnomalyKind::ZScore,
                component: "GCS".to_owned(),
                magnitude: round_to(z, 2),
                value: round_to(gcs, 1),
                severity,
                message: format!("GCS z-score {z:.2} detected (value={gcs:.1})"),
                timestamp_ms,
            };
            warn!(z_score = z, gcs, ?severity, "z-score anomaly");
            events.push(event);
        }
        if energy > self.thresholds.oscillation {
            let event = AnomalyEvent {
                kind: AnomalyKind::Oscillation,
                component: "Signal".to_owned(),
                magnitude: round_to(energy, 2),
                value: round_to(gcs, 1),
                severity: AnomalySeverity::Medium,
                message: format!("High-frequency oscillation detected (energy={energy:.2})"),
                timestamp_ms,
            };
            info!(energy, gcs, "oscillation anomaly");
            events.push(event);
        }

        Detection {
            summary: AnomalySummary {
                z_score: z,
                oscillation_energy: energy,
                bayesian_confidence: confidence,
            },
            events,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(len: usize, low: f64, high: f64) -> Vec<f64> {
        (0..len)
            .map(|i| if i % 2 == 0 { low } else { high })
            .collect()
    }

    #[test]
    fn zscore_needs_three_samples() {
        assert!(rolling_zscore(&[]).abs() < f64::EPSILON);
        assert!(rolling_zscore(&[10.0]).abs() < f64::EPSILON);
        assert!(rolling_zscore(&[10.0, 90.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn zscore_of_constant_history_is_zero() {
        assert!(rolling_zscore(&[50.0; 10]).abs() < 1e-9);
    }

    #[test]
    fn zscore_matches_hand_computation() {
        // prefix [40, 60]: μ = 50, σ = 10.
        let z = rolling_zscore(&[40.0, 60.0, 80.0]);
        assert!((z - 3.0).abs() < 1e-6, "got {z}");
        let z = rolling_zscore(&[40.0, 60.0, 20.0]);
        assert!((z - 3.0).abs() < 1e-6, "negative deviations report |z|");
    }

    #[test]
    fn zscore_spike_after_flat_history_is_huge() {
        let mut history = vec![50.0; 10];
        history.push(51.0);
        assert!(rolling_zscore(&history) > 1e6);
    }

    #[test]
    fn energy_needs_sixteen_samples() {
        assert!(high_frequency_energy(&alternating(15, 0.0, 100.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn energy_of_constant_signal_is_near_zero() {
        let energy = high_frequency_energy(&[80.0; 16]);
        assert!(energy < 1e-9, "got {energy}");
    }

    #[test]
    fn alternating_signal_has_high_energy() {
        let energy = high_frequency_energy(&alternating(16, 0.0, 100.0));
        assert!(energy > 15.0, "got {energy}");
    }

    #[test]
    fn energy_uses_only_last_window() {
        let mut history = alternating(16, 0.0, 100.0);
        history.extend(std::iter::repeat_n(80.0, 16));
        assert!(high_frequency_energy(&history) < 1e-9);
    }

    #[test]
    fn bayesian_confidence_counts_threshold_inclusive() {
        assert!((bayesian_confidence(&[], 60.0) - 0.5).abs() < f64::EPSILON);
        let samples = [60.0, 70.0, 10.0];
        assert!((bayesian_confidence(&samples, 60.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(zscore_severity(2.6), AnomalySeverity::Low);
        assert_eq!(zscore_severity(3.0), AnomalySeverity::Low);
        assert_eq!(zscore_severity(3.5), AnomalySeverity::Medium);
        assert_eq!(zscore_severity(4.5), AnomalySeverity::High);
    }

    #[test]
    fn detector_emits_zscore_event() {
        let detector = AnomalyDetector::default();
        let mut history = vec![50.0, 52.0, 48.0, 50.0, 51.0, 49.0];
        history.push(10.0);
        let detection = detector.evaluate_at(&history, 1_700_000_000_000);
        assert_eq!(detection.events.len(), 1);
        let event = &detection.events[0];
        assert_eq!(event.kind, AnomalyKind::ZScore);
        assert_eq!(event.component, "GCS");
        assert_eq!(event.severity, AnomalySeverity::High);
        assert!((event.value - 10.0).abs() < f64::EPSILON);
        assert_eq!(event.timestamp_ms, 1_700_000_000_000);
        assert!(event.message.contains("z-score"));
    }

    #[test]
    fn detector_emits_oscillation_event() {
        let detector = AnomalyDetector::default();
        let history = alternating(16, 20.0, 90.0);
        let detection = detector.evaluate_at(&history, 0);
        let kinds: Vec<_> = detection.events.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&AnomalyKind::Oscillation));
        let oscillation = detection
            .events
            .iter()
            .find(|e| e.kind == AnomalyKind::Oscillation)
            .unwrap();
        assert_eq!(oscillation.component, "Signal");
        assert_eq!(oscillation.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn quiet_history_raises_nothing() {
        let detector = AnomalyDetector::default();
        let detection = detector.evaluate(&[70.0; 20]);
        assert!(detection.events.is_empty());
        assert!((detection.summary.bayesian_confidence - 21.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn thresholds_follow_config() {
        let config = AnalyzerConfig {
            z_threshold: 1.5,
            ..AnalyzerConfig::default()
        };
        let thresholds = AnomalyThresholds::from(&config);
        assert!((thresholds.z_score - 1.5).abs() < f64::EPSILON);
        assert!((thresholds.oscillation - 15.0).abs() < f64::EPSILON);

        // prefix [40, 60] → z = 2 for 70.
        let strict = AnomalyDetector::new(thresholds).evaluate_at(&[40.0, 60.0, 70.0], 0);
        assert_eq!(strict.events.len(), 1);
        let lenient = AnomalyDetector::default().evaluate_at(&[40.0, 60.0, 70.0], 0);
        assert!(lenient.events.is_empty());
    }

    #[test]
    fn rounded_summary_has_three_decimals() {
        let detection = Detection {
            summary: AnomalySummary {
                z_score: 1.234_56,
                oscillation_energy: 0.000_4,
                bayesian_confidence: 0.666_666,
            },
            events: Vec::new(),
        };
        let rounded = detection.rounded_summary();
        assert!((rounded.z_score - 1.235).abs() < 1e-12);
        assert!(rounded.oscillation_energy.abs() < 1e-12);
        assert!((rounded.bayesian_confidence - 0.667).abs() < 1e-12);
    }

    fn event(n: u64) -> AnomalyEvent {
        AnomalyEvent {
            kind: AnomalyKind::ZScore,
            component: "GCS".into(),
            magnitude: 3.0,
            value: 40.0,
            severity: AnomalySeverity::Low,
            message: String::new(),
            timestamp_ms: n,
        }
    }

    #[test]
    fn log_is_bounded_fifo() {
        let mut log = AnomalyLog::new(3);
        for n in 0..5 {
            log.push(event(n));
        }
        assert_eq!(log.len(), 3);
        let stamps: Vec<_> = log.recent(10).iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
        let stamps: Vec<_> = log.recent(2).iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![3, 4]);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn default_log_capacity() {
        assert_eq!(AnomalyLog::default().capacity(), 50);
        assert_eq!(AnomalyLog::new(0).capacity(), 1);
    }
}
