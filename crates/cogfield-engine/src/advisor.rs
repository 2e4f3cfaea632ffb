//! Advisor gateway: deadline-bounded consults with graceful degradation.
//!
//! [`AdvisorGateway`] runs a [`WeightAdvisor`] on a worker thread and waits
//! for its answer with a deadline. At most one worker exists per gateway: while
//! a timed-out worker is still blocked inside the advisor, later consults fail
//! fast instead of spawning another thread. Every result (success, timeout, error,
//! panic, malformed output or an advisor that is simply not configured)
//! is folded into an [`AdvisorOutcome`], so the pipeline never sees an error.
//!
//! The module also carries the prompt/response helpers used by language-model
//! advisors implemented in host applications.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use cogfield_core::{
    AdvisorContext, AdvisorError, AdvisorProposal, CandidateWeights, Channel, Provenance,
    RiskFactor, WeightAdvisor, WeightVector, round_to,
};

/// Confidence reported when the advisor did not answer.
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// Number of anomaly events shown to the advisor.
pub const ADVISOR_ANOMALY_WINDOW: usize = 5;

const OFFLINE_INSIGHT: &str = "Advisor offline: operating with static weights. \
     Configure an advisor to enable adaptive scoring.";

// ─── Offline advisor ────────────────────────────────────────────────────────

/// Advisor used when none is configured. Always unavailable.
#[derive(Debug, Clone)]
pub struct OfflineAdvisor {
    id: String,
}

impl OfflineAdvisor {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for OfflineAdvisor {
    fn default() -> Self {
        Self::new("offline")
    }
}

impl WeightAdvisor for OfflineAdvisor {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        false
    }

    fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
        Err(AdvisorError::Unavailable("advisor not configured".to_owned()))
    }
}

// ─── Outcome ────────────────────────────────────────────────────────────────

/// Result of one consult, as seen by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisorOutcome {
    /// The advisor answered with a well-formed proposal.
    Proposed(AdvisorProposal),
    /// The advisor could not be used; the fallback weights stand.
    Degraded {
        error: AdvisorError,
        provenance: Provenance,
        weights: WeightVector,
        insight: String,
    },
}

impl AdvisorOutcome {
    fn degraded(error: AdvisorError, fallback: WeightVector) -> Self {
        let (provenance, insight) = match &error {
            AdvisorError::Unavailable(_) => (Provenance::Offline, OFFLINE_INSIGHT.to_owned()),
            other => (
                Provenance::Fallback,
                format!(
                    "Advisor error: falling back to current weights. ({})",
                    other.reason()
                ),
            ),
        };
        Self::Degraded {
            error,
            provenance,
            weights: fallback,
            insight,
        }
    }

    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Proposed(_) => Provenance::Gemini,
            Self::Degraded { provenance, .. } => *provenance,
        }
    }

    /// Weights to feed to the optimizer.
    #[must_use]
    pub fn candidate(&self) -> CandidateWeights {
        match self {
            Self::Proposed(proposal) => proposal.weights,
            Self::Degraded { weights, .. } => CandidateWeights::from(*weights),
        }
    }

    #[must_use]
    pub fn insight(&self) -> &str {
        match self {
            Self::Proposed(proposal) => &proposal.insight,
            Self::Degraded { insight, .. } => insight,
        }
    }

    #[must_use]
    pub const fn risk_factor(&self) -> RiskFactor {
        match self {
            Self::Proposed(proposal) => proposal.risk_factor,
            Self::Degraded { .. } => RiskFactor::None,
        }
    }

    /// Advisor confidence, sanitized to a finite value.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Proposed(proposal) if proposal.confidence.is_finite() => proposal.confidence,
            _ => DEGRADED_CONFIDENCE,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&AdvisorError> {
        match self {
            Self::Proposed(_) => None,
            Self::Degraded { error, .. } => Some(error),
        }
    }
}

// ─── Gateway ────────────────────────────────────────────────────────────────

/// Wraps an advisor with a deadline and fallback.
#[derive(Clone)]
pub struct AdvisorGateway {
    advisor: Arc<dyn WeightAdvisor>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl std::fmt::Debug for AdvisorGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorGateway")
            .field("advisor", &self.advisor.id())
            .field("timeout", &self.timeout)
            .field("in_flight", &self.is_busy())
            .finish()
    }
}

impl AdvisorGateway {
    #[must_use]
    pub fn new(advisor: Arc<dyn WeightAdvisor>, timeout: Duration) -> Self {
        Self {
            advisor,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gateway around [`OfflineAdvisor`].
    #[must_use]
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineAdvisor::default()), Duration::from_secs(5))
    }

    #[must_use]
    pub fn advisor_id(&self) -> &str {
        self.advisor.id()
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a worker from an earlier consult is still inside the advisor.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Consult the advisor, waiting at most the configured deadline.
    ///
    /// A timed-out worker is abandoned; its late answer is dropped.
    #[must_use]
    #[instrument(
        name = "cogfield::advisor_consult",
        skip_all,
        fields(advisor_id = self.advisor.id(), request_id = %context.request_id)
    )]
    pub fn consult(&self, context: AdvisorContext) -> AdvisorOutcome {
        let fallback = context.fallback_weights;
        if !self.advisor.is_available() {
            debug!("advisor unavailable; keeping current weights");
            return AdvisorOutcome::degraded(
                AdvisorError::Unavailable("advisor not available".to_owned()),
                fallback,
            );
        }

        let started = Instant::now();
        let outcome = match self.run_with_deadline(context) {
            Ok(proposal) => {
                debug!(elapsed_ms = elapsed_ms(started), "advisor proposal received");
                return AdvisorOutcome::Proposed(proposal);
            }
            Err(error) => AdvisorOutcome::degraded(error, fallback),
        };
        if let Some(error) = outcome.error() {
            warn!(
                reason = error.reason(),
                provenance = %outcome.provenance(),
                elapsed_ms = elapsed_ms(started),
                error = %error,
                "advisor consult failed; using fallback weights"
            );
        }
        outcome
    }

    fn run_with_deadline(&self, context: AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AdvisorError::Failed(
                "previous advisor consult is still running".to_owned(),
            ));
        }

        let (tx, rx) = mpsc::channel();
        let advisor = Arc::clone(&self.advisor);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        thread::Builder::new()
            .name("cogfield-advisor".to_owned())
            .spawn(move || {
                // Idle again before the caller can receive.
                let busy = guard;
                let result = advisor.advise(&context);
                drop(busy);
                // Receiver is gone after a timeout.
                let _ = tx.send(result);
            })
            .map_err(|err| AdvisorError::Failed(format!("failed to spawn advisor worker: {err}")))?;

        let started = Instant::now();
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(AdvisorError::Timeout {
                elapsed_ms: elapsed_ms(started),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(AdvisorError::Failed(
                "advisor worker exited without a response".to_owned(),
            )),
        }
    }
}

/// Clears the gateway's busy flag when the worker finishes or panics.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ─── Prompt and response helpers ────────────────────────────────────────────

/// Instructions prepended to every analysis prompt.
pub const SYSTEM_PROMPT: &str = "You are a systems engineer and mathematical physicist \
specializing in signal processing and environmental intelligence modeling. You will analyze \
telemetry data from a cognitive field analyzer and optimize the weighted scoring for real-time \
environmental fluctuation detection. Always respond with valid JSON only, no markdown, no \
explanation.";

/// Render the analysis prompt for a language-model advisor.
#[must_use]
pub fn build_analysis_prompt(context: &AdvisorContext) -> String {
    let t = &context.telemetry;
    let csi = &context.csi;
    let skip = context
        .anomalies
        .len()
        .saturating_sub(ADVISOR_ANOMALY_WINDOW);
    let anomalies: Vec<String> = context
        .anomalies
        .iter()
        .skip(skip)
        .map(|event| format!("{}({})", event.kind, event.component))
        .collect();
    let anomaly_summary = if anomalies.is_empty() {
        "None".to_owned()
    } else {
        anomalies.join(", ")
    };

    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "Analyze the following signal stability patterns. Detect anomalies and optimize the \
         weighted scoring for real-time environmental fluctuation detection.\n\n",
    );
    let _ = writeln!(prompt, "TELEMETRY:");
    let _ = writeln!(prompt, "- WiFi RSSI: {:.1} dBm", t.rssi);
    let _ = writeln!(prompt, "- Latency: {:.1} ms", t.latency_ms);
    let _ = writeln!(prompt, "- Packet Loss: {:.3}", t.packet_loss_ratio);
    let _ = writeln!(prompt, "- CPU: {:.1}%", t.cpu_pct);
    let _ = writeln!(prompt, "- Memory: {:.1}%", t.mem_pct);
    let _ = writeln!(prompt, "- Bluetooth Devices: {}", t.bt_count);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "CSI SCORES (0-100 scale):");
    for channel in Channel::ALL {
        let _ = writeln!(prompt, "- {} CSI: {:.1}", channel.label(), csi.get(channel));
    }
    let _ = writeln!(prompt, "- Global Score (GCS): {:.1}", context.gcs);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "RECENT ANOMALIES: {anomaly_summary}");
    let _ = writeln!(prompt);
    prompt.push_str(
        "Based on this data:\n\
         1. Determine optimized component weights (must sum to exactly 1.0)\n\
         2. Provide a brief scientific insight about the current system state\n\
         3. Identify the dominant stability risk factor\n\n\
         Respond ONLY with JSON in this exact format:\n\
         {\n  \"weights\": {\"wifi\": 0.30, \"bt\": 0.15, \"net\": 0.35, \"sys\": 0.20},\n  \
         \"insight\": \"Brief scientific analysis in 1-2 sentences\",\n  \
         \"risk_factor\": \"WiFi|Bluetooth|Network|System|None\",\n  \
         \"confidence\": 0.85\n}",
    );
    prompt
}

/// Parse a language-model reply into a proposal.
///
/// Markdown code fences are stripped. Weights are renormalized to sum to one
/// and rounded to 4 decimals; non-numeric weight entries are dropped, which
/// later causes the optimizer to reject the vector.
///
/// # Errors
///
/// Returns [`AdvisorError::Malformed`] when the text is not a JSON object or
/// the weights are missing or do not have a positive total.
pub fn parse_advisor_response(text: &str) -> Result<AdvisorProposal, AdvisorError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|err| AdvisorError::Malformed(format!("invalid JSON: {err}")))?;
    let Value::Object(object) = value else {
        return Err(AdvisorError::Malformed("expected a JSON object".to_owned()));
    };

    let raw_weights = object
        .get("weights")
        .and_then(Value::as_object)
        .ok_or_else(|| AdvisorError::Malformed("missing \"weights\" object".to_owned()))?;
    let weights = normalized_weights(raw_weights)?;

    let insight = object
        .get("insight")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let risk_factor = object
        .get("risk_factor")
        .and_then(Value::as_str)
        .map_or(RiskFactor::None, RiskFactor::parse_lenient);
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map_or(DEGRADED_CONFIDENCE, |c| c.clamp(0.0, 1.0));

    Ok(AdvisorProposal {
        weights,
        insight,
        risk_factor,
        confidence,
    })
}

fn normalized_weights(raw: &Map<String, Value>) -> Result<CandidateWeights, AdvisorError> {
    let read = |channel: Channel| {
        raw.get(channel.key())
            .and_then(Value::as_f64)
            .filter(|w| w.is_finite())
    };
    let candidate = CandidateWeights {
        wifi: read(Channel::Wifi),
        bt: read(Channel::Bt),
        net: read(Channel::Net),
        sys: read(Channel::Sys),
    };
    let total: f64 = Channel::ALL
        .iter()
        .filter_map(|channel| candidate.get(*channel))
        .sum();
    if total <= 0.0 {
        return Err(AdvisorError::Malformed(format!(
            "weights must have a positive total, got {total}"
        )));
    }
    let scale = |w: Option<f64>| w.map(|w| round_to(w / total, 4));
    Ok(CandidateWeights {
        wifi: scale(candidate.wifi),
        bt: scale(candidate.bt),
        net: scale(candidate.net),
        sys: scale(candidate.sys),
    })
}

fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.strip_prefix("json").unwrap_or(rest);
    }
    cleaned.trim().trim_end_matches('`').trim()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use cogfield_core::{
        AnomalyEvent, AnomalyKind, AnomalySeverity, ChannelScores, TelemetrySnapshot,
        next_request_id,
    };

    fn context() -> AdvisorContext {
        AdvisorContext {
            request_id: next_request_id(),
            telemetry: TelemetrySnapshot::default().with_latency(42.0),
            csi: ChannelScores {
                wifi: 81.25,
                bt: 40.0,
                net: 66.6,
                sys: 90.0,
            },
            gcs: 71.3,
            anomalies: Vec::new(),
            fallback_weights: WeightVector::DEFAULT,
        }
    }

    fn proposal() -> AdvisorProposal {
        AdvisorProposal {
            weights: CandidateWeights::from(WeightVector {
                wifi: 0.4,
                bt: 0.1,
                net: 0.4,
                sys: 0.1,
            }),
            insight: "Network jitter dominates.".to_owned(),
            risk_factor: RiskFactor::Network,
            confidence: 0.9,
        }
    }

    struct FixedAdvisor(Result<AdvisorProposal, AdvisorError>);

    impl WeightAdvisor for FixedAdvisor {
        fn id(&self) -> &str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
            self.0.clone()
        }
    }

    struct SlowAdvisor(Duration);

    impl WeightAdvisor for SlowAdvisor {
        fn id(&self) -> &str {
            "slow"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
            thread::sleep(self.0);
            Ok(proposal())
        }
    }

    struct PanickingAdvisor;

    impl WeightAdvisor for PanickingAdvisor {
        fn id(&self) -> &str {
            "panicking"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
            panic!("advisor bug");
        }
    }

    struct CountingAdvisor(AtomicUsize);

    impl WeightAdvisor for CountingAdvisor {
        fn id(&self) -> &str {
            "counting"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(proposal())
        }
    }

    fn gateway(advisor: impl WeightAdvisor + 'static) -> AdvisorGateway {
        AdvisorGateway::new(Arc::new(advisor), Duration::from_millis(200))
    }

    #[test]
    fn offline_gateway_degrades_to_offline() {
        let outcome = AdvisorGateway::offline().consult(context());
        assert_eq!(outcome.provenance(), Provenance::Offline);
        assert_eq!(outcome.candidate(), CandidateWeights::from(WeightVector::DEFAULT));
        assert_eq!(outcome.risk_factor(), RiskFactor::None);
        assert!((outcome.confidence() - 0.5).abs() < f64::EPSILON);
        assert!(outcome.insight().contains("offline"));
    }

    #[test]
    fn unavailable_advisor_is_never_called() {
        let advisor = Arc::new(CountingAdvisor(AtomicUsize::new(0)));
        let gateway = AdvisorGateway::new(advisor.clone(), Duration::from_millis(50));
        let outcome = gateway.consult(context());
        assert_eq!(outcome.provenance(), Provenance::Offline);
        assert_eq!(advisor.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn proposal_passes_through() {
        let outcome = gateway(FixedAdvisor(Ok(proposal()))).consult(context());
        assert_eq!(outcome.provenance(), Provenance::Gemini);
        assert_eq!(outcome, AdvisorOutcome::Proposed(proposal()));
        assert_eq!(outcome.risk_factor(), RiskFactor::Network);
        assert!((outcome.confidence() - 0.9).abs() < f64::EPSILON);
        assert!(outcome.error().is_none());
    }

    #[test]
    fn advisor_errors_degrade_to_fallback() {
        let errors = [
            AdvisorError::Failed("503".into()),
            AdvisorError::Malformed("no json".into()),
            AdvisorError::Timeout { elapsed_ms: 9 },
        ];
        for error in errors {
            let outcome = gateway(FixedAdvisor(Err(error.clone()))).consult(context());
            assert_eq!(outcome.provenance(), Provenance::Fallback);
            assert_eq!(outcome.error(), Some(&error));
            assert!(outcome.insight().contains(error.reason()));
        }
    }

    #[test]
    fn advisor_reporting_unavailable_is_offline() {
        let outcome = gateway(FixedAdvisor(Err(AdvisorError::Unavailable("down".into()))))
            .consult(context());
        assert_eq!(outcome.provenance(), Provenance::Offline);
    }

    #[test]
    fn slow_advisor_times_out() {
        let gateway = AdvisorGateway::new(
            Arc::new(SlowAdvisor(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        let started = Instant::now();
        let outcome = gateway.consult(context());
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(outcome.provenance(), Provenance::Fallback);
        assert!(matches!(outcome.error(), Some(AdvisorError::Timeout { .. })));
    }

    struct GatedAdvisor {
        calls: AtomicUsize,
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl WeightAdvisor for GatedAdvisor {
        fn id(&self) -> &str {
            "gated"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn advise(&self, _context: &AdvisorContext) -> Result<AdvisorProposal, AdvisorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Blocks until the test drops the sender.
            let _ = self.gate.lock().unwrap().recv();
            Ok(proposal())
        }
    }

    #[test]
    fn hung_advisor_holds_a_single_worker() {
        let (release, gate) = mpsc::channel::<()>();
        let advisor = Arc::new(GatedAdvisor {
            calls: AtomicUsize::new(0),
            gate: std::sync::Mutex::new(gate),
        });
        let gateway = AdvisorGateway::new(advisor.clone(), Duration::from_millis(10));

        let first = gateway.consult(context());
        assert!(matches!(first.error(), Some(AdvisorError::Timeout { .. })));
        for _ in 0..20 {
            let outcome = gateway.consult(context());
            assert_eq!(outcome.provenance(), Provenance::Fallback);
            assert!(matches!(outcome.error(), Some(AdvisorError::Failed(_))));
        }
        assert!(gateway.is_busy());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);

        drop(release);
        let deadline = Instant::now() + Duration::from_secs(5);
        while gateway.is_busy() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!gateway.is_busy());

        let recovered = gateway.consult(context());
        assert_eq!(recovered.provenance(), Provenance::Gemini);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_advisor_is_contained() {
        let gateway = gateway(PanickingAdvisor);
        let outcome = gateway.consult(context());
        assert_eq!(outcome.provenance(), Provenance::Fallback);
        assert!(matches!(outcome.error(), Some(AdvisorError::Failed(_))));
        assert!(!gateway.is_busy());
    }

    #[test]
    fn non_finite_confidence_is_sanitized() {
        let mut odd = proposal();
        odd.confidence = f64::NAN;
        let outcome = AdvisorOutcome::Proposed(odd);
        assert!((outcome.confidence() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn prompt_lists_telemetry_and_recent_anomalies() {
        let mut ctx = context();
        ctx.anomalies = (0..7)
            .map(|i| AnomalyEvent {
                kind: if i == 6 {
                    AnomalyKind::Oscillation
                } else {
                    AnomalyKind::ZScore
                },
                component: if i == 6 { "Signal" } else { "GCS" }.to_owned(),
                magnitude: 3.0,
                value: 50.0,
                severity: AnomalySeverity::Low,
                message: String::new(),
                timestamp_ms: i,
            })
            .collect();
        let prompt = build_analysis_prompt(&ctx);
        assert!(prompt.contains("- Latency: 42.0 ms"));
        assert!(prompt.contains("- WiFi CSI: 81.2") || prompt.contains("- WiFi CSI: 81.3"));
        assert!(prompt.contains("- Global Score (GCS): 71.3"));
        assert!(prompt.contains("WiFi|Bluetooth|Network|System|None"));
        assert_eq!(prompt.matches("Z_SCORE(GCS)").count(), 4);
        assert!(prompt.contains("OSCILLATION(Signal)"));
    }

    #[test]
    fn prompt_without_anomalies_says_none() {
        assert!(build_analysis_prompt(&context()).contains("RECENT ANOMALIES: None"));
    }

    #[test]
    fn parse_plain_json() {
        let text = r#"{"weights": {"wifi": 2, "bt": 1, "net": 1, "sys": 0},
            "insight": "ok", "risk_factor": "WiFi", "confidence": 0.8}"#;
        let parsed = parse_advisor_response(text).unwrap();
        assert_eq!(parsed.weights.wifi, Some(0.5));
        assert_eq!(parsed.weights.bt, Some(0.25));
        assert_eq!(parsed.weights.sys, Some(0.0));
        assert_eq!(parsed.risk_factor, RiskFactor::Wifi);
        assert_eq!(parsed.insight, "ok");
        assert!((parsed.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_strips_code_fences() {
        let text = "```json\n{\"weights\": {\"wifi\": 0.3, \"bt\": 0.15, \"net\": 0.35, \"sys\": 0.2}}\n```";
        let parsed = parse_advisor_response(text).unwrap();
        assert_eq!(parsed.weights.net, Some(0.35));
        assert_eq!(parsed.risk_factor, RiskFactor::None);
        assert!((parsed.confidence - 0.5).abs() < f64::EPSILON);

        let bare = "```\n{\"weights\": {\"wifi\": 1}}\n```";
        let parsed = parse_advisor_response(bare).unwrap();
        assert_eq!(parsed.weights.wifi, Some(1.0));
        assert_eq!(parsed.weights.bt, None);
    }

    #[test]
    fn parse_rejects_malformed_replies() {
        let cases = [
            "not json at all",
            "[1, 2, 3]",
            r#"{"insight": "no weights"}"#,
            r#"{"weights": {"wifi": 0, "bt": 0, "net": 0, "sys": 0}}"#,
            r#"{"weights": {"wifi": "high"}}"#,
        ];
        for text in cases {
            let err = parse_advisor_response(text).unwrap_err();
            assert!(matches!(err, AdvisorError::Malformed(_)), "{text}: {err:?}");
        }
    }
}
