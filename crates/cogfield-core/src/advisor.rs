//! Weight-advisor abstraction.
//!
//! The advisor is an external oracle (typically a hosted language model) that
//! occasionally proposes a new channel weight vector. This module defines the
//! transport-agnostic contract; concrete clients are implemented by host
//! applications, and the engine wraps them with a timeout and fallback.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{
    AnomalyEvent, CandidateWeights, ChannelScores, RiskFactor, TelemetrySnapshot, WeightVector,
};

/// Everything the advisor is shown for one consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorContext {
    /// Correlation id for tracing; see [`next_request_id`].
    pub request_id: String,
    pub telemetry: TelemetrySnapshot,
    /// Channel CSI on the `0–100` scale.
    pub csi: ChannelScores,
    /// Current GCS.
    pub gcs: f64,
    /// Most recent anomaly events, oldest first.
    pub anomalies: Vec<AnomalyEvent>,
    /// Weights to fall back to if the advisor cannot answer.
    pub fallback_weights: WeightVector,
}

/// A successful advisor answer. The weights are untrusted until the weight
/// optimizer validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorProposal {
    pub weights: CandidateWeights,
    pub insight: String,
    pub risk_factor: RiskFactor,
    pub confidence: f64,
}

/// Advisor request failure details.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    /// No advisor is configured or it reports itself unreachable.
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
    /// The consult exceeded its time budget.
    #[error("advisor timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    /// Transport or service error.
    #[error("advisor failed: {0}")]
    Failed(String),
    /// The advisor answered, but not in the expected shape.
    #[error("advisor response malformed: {0}")]
    Malformed(String),
}

impl AdvisorError {
    /// Short machine-readable reason, used as a tracing field.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Failed(_) => "error",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Abstract weight advisor.
///
/// The engine calls `advise` on a worker thread and stops waiting after a
/// deadline, but it cannot interrupt the call. Until a blocked call returns,
/// further consults fall back without reaching the advisor, so network-backed
/// implementations should still bound their own I/O.
#[allow(clippy::missing_errors_doc)]
pub trait WeightAdvisor: Send + Sync {
    fn id(&self) -> &str;
    fn is_available(&self) -> bool;

    fn advise(&self, context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError>;
}

/// Generate a process-unique advisor request id.
#[must_use]
pub fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("advisor-{id}")
}
