//! Scoring engine for cogfield.
//!
//! - [`stability`]: per-channel CSI and the weighted GCS.
//! - [`weights`]: exponentially smoothed, validated weight updates.
//! - [`anomaly`]: z-score, high-frequency energy and Bayesian confidence.
//! - [`forecast`]: OLS trend and decay estimate.
//! - [`advisor`]: deadline-bounded advisor consults and prompt/response helpers.
//! - [`call_quality`]: real-time call fitness grade.
//! - [`analyzer`]: the stateful orchestrator tying it all together.

pub mod advisor;
pub mod analyzer;
pub mod anomaly;
pub mod call_quality;
pub mod forecast;
pub mod stability;
pub mod weights;

pub use advisor::{
    AdvisorGateway, AdvisorOutcome, OfflineAdvisor, SYSTEM_PROMPT, build_analysis_prompt,
    parse_advisor_response,
};
pub use analyzer::{Analyzer, CACHED_INSIGHT, ConsultPolicy};
pub use anomaly::{
    AnomalyDetector, AnomalyLog, AnomalyThresholds, Detection, bayesian_confidence,
    high_frequency_energy, rolling_zscore,
};
pub use call_quality::{CallMetrics, CallQualityReport, CallVerdict, assess_call_quality};
pub use forecast::predict;
pub use stability::{CsiParams, compute_csi, compute_gcs, shannon_entropy, signal_variance};
pub use weights::{Rejection, SMOOTHING_ALPHA, WeightOptimizer};
