//! Pipeline orchestrator.
//!
//! [`Analyzer`] owns every piece of cross-request state (channel histories,
//! anomaly log, weight optimizer and request counter) behind one mutex, and
//! runs the full pipeline for each snapshot:
//!
//! ```text
//! snapshot ─► normalize ─► push histories ─► CSI per channel ─► GCS
//!          ─► anomaly detection ─► forecast ─► (every Nth call) advisor
//!          ─► weight update ─► StabilityReport
//! ```
//!
//! The lock is held for the whole request, including a bounded advisor wait,
//! so concurrent callers observe requests as if they ran one at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use cogfield_core::{
    AdvisorContext, AnalyzerConfig, AnomalyEvent, Channel, ChannelHistory, ChannelScores,
    HealthStatus, Provenance, RiskFactor, StabilityReport, TelemetrySnapshot, WeightAdvisor,
    WeightsView, next_request_id, normalize_snapshot,
};

use crate::advisor::{ADVISOR_ANOMALY_WINDOW, AdvisorGateway, DEGRADED_CONFIDENCE};
use crate::anomaly::{AnomalyDetector, AnomalyLog, AnomalyThresholds};
use crate::call_quality::{CallQualityReport, assess_call_quality};
use crate::forecast::predict;
use crate::stability::{CsiParams, compute_csi, compute_gcs};
use crate::weights::WeightOptimizer;

/// Insight reported on requests that do not consult the advisor.
pub const CACHED_INSIGHT: &str = "Collecting data...";

/// Number of weight history entries exposed by [`Analyzer::weights_view`].
pub const WEIGHTS_VIEW_HISTORY: usize = 5;

// ─── Consult policy ─────────────────────────────────────────────────────────

/// Decides which requests consult the advisor.
///
/// With `every = N > 0`, requests `1, N+1, 2N+1, …` consult. `every = 0`
/// disables consults entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultPolicy {
    every: u64,
}

impl ConsultPolicy {
    #[must_use]
    pub const fn every(every: u64) -> Self {
        Self { every }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { every: 0 }
    }

    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.every
    }

    /// Whether the request with 1-based sequence number `counter` consults.
    #[must_use]
    pub const fn should_consult(&self, counter: u64) -> bool {
        self.every != 0 && counter % self.every == 1 % self.every
    }
}

impl Default for ConsultPolicy {
    fn default() -> Self {
        Self::every(5)
    }
}

// ─── State ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct AnalyzerState {
    wifi: ChannelHistory,
    bt: ChannelHistory,
    net: ChannelHistory,
    sys: ChannelHistory,
    gcs: ChannelHistory,
    anomalies: AnomalyLog,
    optimizer: WeightOptimizer,
    calls: u64,
}

impl AnalyzerState {
    fn new(config: &AnalyzerConfig) -> Self {
        let history = || ChannelHistory::new(config.history_capacity);
        Self {
            wifi: history(),
            bt: history(),
            net: history(),
            sys: history(),
            gcs: history(),
            anomalies: AnomalyLog::new(config.anomaly_log_capacity),
            optimizer: WeightOptimizer::new(config.weight_history_capacity),
            calls: 0,
        }
    }

    const fn channel(&self, channel: Channel) -> &ChannelHistory {
        match channel {
            Channel::Wifi => &self.wifi,
            Channel::Bt => &self.bt,
            Channel::Net => &self.net,
            Channel::Sys => &self.sys,
        }
    }

    const fn channel_mut(&mut self, channel: Channel) -> &mut ChannelHistory {
        match channel {
            Channel::Wifi => &mut self.wifi,
            Channel::Bt => &mut self.bt,
            Channel::Net => &mut self.net,
            Channel::Sys => &mut self.sys,
        }
    }
}

fn lock_state(state: &Mutex<AnalyzerState>) -> MutexGuard<'_, AnalyzerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Analyzer ───────────────────────────────────────────────────────────────

/// Stateful telemetry analyzer. Shareable across threads.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    policy: ConsultPolicy,
    detector: AnomalyDetector,
    gateway: AdvisorGateway,
    state: Mutex<AnalyzerState>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    /// Analyzer with no advisor configured (every consult reports `offline`).
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        let gateway = AdvisorGateway::new(
            Arc::new(crate::advisor::OfflineAdvisor::default()),
            config.advisor_timeout(),
        );
        Self::with_gateway(config, gateway)
    }

    /// Analyzer consulting `advisor` under the configured deadline.
    #[must_use]
    pub fn with_advisor(config: AnalyzerConfig, advisor: Arc<dyn WeightAdvisor>) -> Self {
        let gateway = AdvisorGateway::new(advisor, config.advisor_timeout());
        Self::with_gateway(config, gateway)
    }

    #[must_use]
    pub fn with_gateway(config: AnalyzerConfig, gateway: AdvisorGateway) -> Self {
        Self {
            policy: ConsultPolicy::every(config.consult_every),
            detector: AnomalyDetector::new(AnomalyThresholds::from(&config)),
            state: Mutex::new(AnalyzerState::new(&config)),
            gateway,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[must_use]
    pub const fn consult_policy(&self) -> ConsultPolicy {
        self.policy
    }

    /// Run the full pipeline for one snapshot.
    #[instrument(name = "cogfield::analyze", skip_all, fields(sequence, gcs))]
    pub fn analyze(&self, snapshot: &TelemetrySnapshot) -> StabilityReport {
        let mut state = lock_state(&self.state);

        let normalized = normalize_snapshot(snapshot);
        for channel in Channel::ALL {
            state
                .channel_mut(channel)
                .push(normalized.channel_signal(channel));
        }

        let weights = state.optimizer.current();
        let unit_csi = ChannelScores::from_fn(|channel| {
            compute_csi(
                &state.channel(channel).snapshot(),
                self.csi_params(channel, snapshot),
            )
        });
        let csi = unit_csi.to_percent();
        let gcs = compute_gcs(&unit_csi, weights);
        state.gcs.push(gcs);

        let gcs_history = state.gcs.snapshot();
        let detection = self.detect(&gcs_history);
        for event in &detection.events {
            state.anomalies.push(event.clone());
        }
        let forecast = predict(&gcs_history);

        state.calls += 1;
        let sequence = state.calls;
        tracing::Span::current()
            .record("sequence", sequence)
            .record("gcs", gcs);

        let (provenance, insight, risk_factor, advisor_confidence) =
            if self.policy.should_consult(sequence) {
                let context = AdvisorContext {
                    request_id: next_request_id(),
                    telemetry: *snapshot,
                    csi,
                    gcs,
                    anomalies: state.anomalies.recent(ADVISOR_ANOMALY_WINDOW),
                    fallback_weights: weights,
                };
                let outcome = self.gateway.consult(context);
                let updated = state.optimizer.update(&outcome.candidate());
                debug!(
                    provenance = %outcome.provenance(),
                    wifi = updated.wifi,
                    bt = updated.bt,
                    net = updated.net,
                    sys = updated.sys,
                    "weights after consult"
                );
                (
                    outcome.provenance(),
                    outcome.insight().to_owned(),
                    outcome.risk_factor(),
                    outcome.confidence(),
                )
            } else {
                (
                    Provenance::Cached,
                    CACHED_INSIGHT.to_owned(),
                    RiskFactor::None,
                    DEGRADED_CONFIDENCE,
                )
            };

        info!(
            sequence,
            gcs,
            trend = %forecast.trend,
            provenance = %provenance,
            events = detection.events.len(),
            "analysis complete"
        );

        StabilityReport {
            sequence,
            gcs,
            csi,
            weights: state.optimizer.current(),
            forecast,
            anomaly: detection.rounded_summary(),
            events: detection.events,
            insight,
            risk_factor,
            advisor_confidence,
            provenance,
            telemetry: *snapshot,
            normalized,
        }
    }

    #[instrument(name = "cogfield::detect", skip_all, fields(samples = gcs_history.len()))]
    fn detect(&self, gcs_history: &[f64]) -> crate::anomaly::Detection {
        self.detector.evaluate(gcs_history)
    }

    /// Wifi and net see the request's loss and latency as noise; bt and sys
    /// use the default noise inputs.
    fn csi_params(&self, channel: Channel, snapshot: &TelemetrySnapshot) -> CsiParams {
        let params = CsiParams::default().with_window(self.config.csi_window);
        match channel {
            Channel::Wifi | Channel::Net => {
                params.with_noise(snapshot.packet_loss_ratio, snapshot.latency_ms)
            }
            Channel::Bt | Channel::Sys => params,
        }
    }

    /// Grade call quality from current histories without modifying them.
    #[instrument(name = "cogfield::call_quality", skip_all)]
    pub fn call_quality(&self, snapshot: &TelemetrySnapshot) -> CallQualityReport {
        let state = lock_state(&self.state);
        let report = assess_call_quality(&state.wifi.snapshot(), &state.net.snapshot(), snapshot);
        debug!(ready = report.ready, score = report.score, "call quality graded");
        report
    }

    /// Current weights plus the most recent history entries.
    #[must_use]
    pub fn weights_view(&self) -> WeightsView {
        let state = lock_state(&self.state);
        WeightsView {
            current: state.optimizer.current(),
            history: state.optimizer.recent_history(WEIGHTS_VIEW_HISTORY),
        }
    }

    /// The `n` most recent anomaly events, oldest first.
    #[must_use]
    pub fn recent_anomalies(&self, n: usize) -> Vec<AnomalyEvent> {
        lock_state(&self.state).anomalies.recent(n)
    }

    /// Copy of one channel history, oldest first.
    #[must_use]
    pub fn channel_history(&self, channel: Channel) -> Vec<f64> {
        lock_state(&self.state).channel(channel).snapshot()
    }

    /// Copy of the GCS history, oldest first.
    #[must_use]
    pub fn gcs_history(&self) -> Vec<f64> {
        lock_state(&self.state).gcs.snapshot()
    }

    /// Number of completed `analyze` calls.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        lock_state(&self.state).calls
    }

    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus::ok()
    }

    /// Drop all accumulated state.
    pub fn reset(&self) {
        let mut state = lock_state(&self.state);
        *state = AnalyzerState::new(&self.config);
        debug!("analyzer state reset");
    }
}
