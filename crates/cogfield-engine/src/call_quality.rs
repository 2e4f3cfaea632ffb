//! Short-horizon call-quality check.
//!
//! Grades whether the current link is fit for a real-time call from the last
//! ten wifi/net samples plus the caller's latency and packet loss. The check
//! only reads histories; it never appends to them.

use serde::{Deserialize, Serialize};

use cogfield_core::{TelemetrySnapshot, round_to};

use crate::stability::signal_variance;

/// Minimum wifi history required before grading.
pub const MIN_CALL_SAMPLES: usize = 5;
/// Number of most recent samples examined.
pub const CALL_WINDOW: usize = 10;

const STABILITY_POINTS: f64 = 40.0;
const JITTER_POINTS: f64 = 30.0;
const LATENCY_POINTS: f64 = 20.0;
const LOSS_POINTS: f64 = 10.0;
const LATENCY_CEILING_MS: f64 = 200.0;

/// Quality band for a call-quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallVerdict {
    Optimal,
    Stable,
    Caution,
    Unstable,
}

impl CallVerdict {
    /// Band for a `0–100` score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 85.0 {
            Self::Optimal
        } else if score > 65.0 {
            Self::Stable
        } else if score > 40.0 {
            Self::Caution
        } else {
            Self::Unstable
        }
    }

    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL: Safe for 4K video and screen sharing.",
            Self::Stable => "STABLE: Good for HD video calls.",
            Self::Caution => "CAUTION: Audio-only recommended.",
            Self::Unstable => "UNSTABLE: Connection risk high.",
        }
    }

    #[must_use]
    pub const fn details(self) -> &'static str {
        match self {
            Self::Optimal => "Signal is extremely stable with negligible jitter.",
            Self::Stable => "Minor signal fluctuations detected, but within safe margins.",
            Self::Caution => "High signal entropy detected. Video may stutter or disconnect.",
            Self::Unstable => "Critical packet loss or latency jitter. Move closer to the router.",
        }
    }
}

/// Inputs behind a graded score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallMetrics {
    /// `1 − var(wifi)`, 2 decimals.
    pub stability: f64,
    /// `var(net)`, 3 decimals.
    pub jitter: f64,
    pub latency_ms: f64,
    pub packet_loss: f64,
}

/// Result of a call-quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallQualityReport {
    /// `false` until enough history has accumulated.
    pub ready: bool,
    /// `0–100`, 1 decimal.
    pub score: f64,
    pub verdict: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<CallVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CallMetrics>,
}

impl CallQualityReport {
    /// Report returned while history is still too short.
    #[must_use]
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            score: 0.0,
            verdict: "Insufficient data. Please wait for signal stabilization.".to_owned(),
            details: "Collecting environmental telemetry...".to_owned(),
            grade: None,
            metrics: None,
        }
    }
}

/// Grade call quality from channel histories (oldest → newest).
#[must_use]
pub fn assess_call_quality(
    wifi_history: &[f64],
    net_history: &[f64],
    snapshot: &TelemetrySnapshot,
) -> CallQualityReport {
    if wifi_history.len() < MIN_CALL_SAMPLES {
        return CallQualityReport::not_ready();
    }

    let stability = 1.0 - signal_variance(tail(wifi_history, CALL_WINDOW));
    let jitter = signal_variance(tail(net_history, CALL_WINDOW));
    let latency = snapshot.latency_ms;
    let loss = snapshot.packet_loss_ratio;

    let raw = stability * STABILITY_POINTS
        + (1.0 - jitter).max(0.0) * JITTER_POINTS
        + (1.0 - latency / LATENCY_CEILING_MS).max(0.0) * LATENCY_POINTS
        + (1.0 - loss).max(0.0) * LOSS_POINTS;
    let score = round_to(raw.clamp(0.0, 100.0), 1);
    let grade = CallVerdict::from_score(score);

    CallQualityReport {
        ready: true,
        score,
        verdict: grade.headline().to_owned(),
        details: grade.details().to_owned(),
        grade: Some(grade),
        metrics: Some(CallMetrics {
            stability: round_to(stability, 2),
            jitter: round_to(jitter, 3),
            latency_ms: latency,
            packet_loss: loss,
        }),
    }
}

fn tail(samples: &[f64], n: usize) -> &[f64] {
    &samples[samples.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_five_wifi_samples() {
        let report = assess_call_quality(&[0.8; 4], &[0.8; 4], &TelemetrySnapshot::default());
        assert!(!report.ready);
        assert!(report.score.abs() < f64::EPSILON);
        assert_eq!(
            report.verdict,
            "Insufficient data. Please wait for signal stabilization."
        );
        assert!(report.metrics.is_none());
    }

    #[test]
    fn steady_link_is_optimal() {
        // 40 + 30 + 0.9·20 + 10 = 98.
        let report = assess_call_quality(&[0.8; 12], &[0.7; 12], &TelemetrySnapshot::default());
        assert!(report.ready);
        assert!((report.score - 98.0).abs() < 1e-9);
        assert_eq!(report.grade, Some(CallVerdict::Optimal));
        assert_eq!(report.verdict, CallVerdict::Optimal.headline());
        let metrics = report.metrics.unwrap();
        assert!((metrics.stability - 1.0).abs() < f64::EPSILON);
        assert!(metrics.jitter.abs() < f64::EPSILON);
    }

    #[test]
    fn bad_network_is_unstable() {
        let snapshot = TelemetrySnapshot::default()
            .with_latency(400.0)
            .with_packet_loss(1.0);
        let wifi: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        // stability 0.75 → 30, jitter 0 → 30, latency 0, loss 0 = 60 → CAUTION.
        let report = assess_call_quality(&wifi, &[0.5; 10], &snapshot);
        assert!((report.score - 60.0).abs() < 1e-9);
        assert_eq!(report.grade, Some(CallVerdict::Caution));
    }

    #[test]
    fn only_last_ten_samples_count() {
        let mut wifi = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        wifi.extend([0.6; 10]);
        let report = assess_call_quality(&wifi, &[0.6; 16], &TelemetrySnapshot::default());
        let metrics = report.metrics.unwrap();
        assert!((metrics.stability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(CallVerdict::from_score(85.1), CallVerdict::Optimal);
        assert_eq!(CallVerdict::from_score(85.0), CallVerdict::Stable);
        assert_eq!(CallVerdict::from_score(65.0), CallVerdict::Caution);
        assert_eq!(CallVerdict::from_score(40.0), CallVerdict::Unstable);
    }

    #[test]
    fn not_ready_report_omits_metrics_in_json() {
        let json = serde_json::to_value(CallQualityReport::not_ready()).unwrap();
        assert_eq!(json["ready"], serde_json::json!(false));
        assert!(json.get("metrics").is_none());
    }
}
