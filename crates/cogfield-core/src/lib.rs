//! Core types, normalization, and interfaces for the cogfield telemetry analyzer.
//!
//! This crate defines the data model (`TelemetrySnapshot`, `WeightVector`,
//! `StabilityReport`, ...), the telemetry normalizer, bounded channel
//! histories, the `WeightAdvisor` contract, configuration, and error types
//! shared by every other crate in the workspace.

pub mod advisor;
pub mod config;
pub mod error;
pub mod history;
pub mod normalize;
pub mod tracing_config;
pub mod types;

pub use advisor::{AdvisorContext, AdvisorError, AdvisorProposal, WeightAdvisor, next_request_id};
pub use config::AnalyzerConfig;
pub use error::{FieldError, FieldResult};
pub use history::{ChannelHistory, DEFAULT_HISTORY_CAPACITY};
pub use normalize::{normalize, normalize_inverted, normalize_snapshot};
pub use types::{
    AnomalyEvent, AnomalyKind, AnomalySeverity, AnomalySummary, CandidateWeights, Channel,
    ChannelScores, ForecastResult, HealthStatus, NormalizedSignal, Provenance, RiskFactor,
    StabilityReport, TelemetrySnapshot, Trend, WeightVector, WeightsView, round_to,
};
