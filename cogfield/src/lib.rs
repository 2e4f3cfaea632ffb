//! # cogfield
//!
//! Turns noisy environmental telemetry (radio signal, bandwidth, latency,
//! packet loss, host load, nearby Bluetooth devices) into one bounded
//! stability score, then tracks it, flags anomalies, forecasts its trend, and
//! adapts its channel weighting from an external advisor's feedback.
//!
//! # Quick Start
//!
//! ```rust
//! use cogfield::prelude::*;
//!
//! let analyzer = Analyzer::new(AnalyzerConfig::default());
//! let snapshot = TelemetrySnapshot::default().with_rssi(-52.0).with_latency(18.0);
//! let report = analyzer.analyze(&snapshot);
//!
//! assert!((0.0..=100.0).contains(&report.gcs));
//! assert_eq!(report.sequence, 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//!  TelemetrySnapshot ─► normalize ─► wifi/bt/net/sys histories ─► CSI per channel
//!                                                                      │
//!                                           WeightOptimizer ◄──┐   weights
//!                                                 ▲            │       ▼
//!                                     AdvisorGateway (every Nth)   GCS ─► gcs history
//!                                                                      │
//!                                                     AnomalyDetector ◄┤
//!                                                          Forecaster ◄┘
//! ```
//!
//! ## Crate Layout
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`cogfield-core`](core) | Types, normalizer, bounded histories, advisor trait, config, errors |
//! | [`cogfield-engine`](engine) | CSI/GCS, weight optimizer, anomaly detector, forecaster, [`Analyzer`] |
//! | `cogfield-cli` | NDJSON command-line driver |
//!
//! ## Plugging in an advisor
//!
//! Implement [`WeightAdvisor`] (typically over an HTTP client for a hosted
//! language model, using [`build_analysis_prompt`] and
//! [`parse_advisor_response`]) and pass it to [`Analyzer::with_advisor`].
//! Consults run under a deadline; failures never reach the caller and are
//! reported through [`Provenance`].

pub use cogfield_core as core;
pub use cogfield_engine as engine;

pub use cogfield_core::{
    AdvisorContext, AdvisorError, AdvisorProposal, AnalyzerConfig, AnomalyEvent, AnomalyKind,
    AnomalySeverity, AnomalySummary, CandidateWeights, Channel, ChannelHistory, ChannelScores,
    FieldError, FieldResult, ForecastResult, HealthStatus, NormalizedSignal, Provenance,
    RiskFactor, StabilityReport, TelemetrySnapshot, Trend, WeightAdvisor, WeightVector,
    WeightsView, normalize, normalize_inverted, normalize_snapshot,
};
pub use cogfield_engine::{
    AdvisorGateway, AdvisorOutcome, Analyzer, AnomalyDetector, AnomalyLog, AnomalyThresholds,
    CallMetrics, CallQualityReport, CallVerdict, ConsultPolicy, CsiParams, OfflineAdvisor,
    WeightOptimizer, assess_call_quality, bayesian_confidence, build_analysis_prompt,
    compute_csi, compute_gcs, high_frequency_energy, parse_advisor_response, predict,
    rolling_zscore, shannon_entropy,
};

/// Common imports for typical usage.
pub mod prelude {
    pub use crate::{
        AdvisorContext, AdvisorError, AdvisorProposal, Analyzer, AnalyzerConfig, CallQualityReport,
        Channel, FieldError, FieldResult, Provenance, StabilityReport, TelemetrySnapshot,
        WeightAdvisor, WeightVector,
    };
}
