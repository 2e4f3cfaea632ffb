//! Data model shared by every cogfield crate.
//!
//! Raw input ([`TelemetrySnapshot`]), its normalized form
//! ([`NormalizedSignal`]), the weight vectors used to combine channel scores,
//! anomaly events, forecasts, and the aggregate [`StabilityReport`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FieldError, FieldResult};

// ─── Channels ───────────────────────────────────────────────────────────────

/// One of the four monitored subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Primary wireless link (signal level + bandwidth).
    Wifi,
    /// Secondary radio (Bluetooth signal + device presence).
    Bt,
    /// Network path quality (latency + packet loss).
    Net,
    /// Host resources (CPU + memory load).
    Sys,
}

impl Channel {
    /// All channels in canonical order.
    pub const ALL: [Self; 4] = [Self::Wifi, Self::Bt, Self::Net, Self::Sys];

    /// Wire key used in weight vectors and score maps.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Bt => "bt",
            Self::Net => "net",
            Self::Sys => "sys",
        }
    }

    /// Human-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Wifi => "WiFi",
            Self::Bt => "Bluetooth",
            Self::Net => "Network",
            Self::Sys => "System",
        }
    }

    /// Default weight used when a vector is missing this channel.
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::Wifi => 0.30,
            Self::Bt => 0.15,
            Self::Net => 0.35,
            Self::Sys => 0.20,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────────────

const DEFAULT_RSSI_DBM: f64 = -70.0;
const DEFAULT_BANDWIDTH_MBPS: f64 = 54.0;
const DEFAULT_LATENCY_MS: f64 = 20.0;
const DEFAULT_PACKET_LOSS: f64 = 0.0;
const DEFAULT_CPU_PCT: f64 = 30.0;
const DEFAULT_MEM_PCT: f64 = 50.0;
const DEFAULT_BT_RSSI_DBM: f64 = -70.0;
const DEFAULT_BT_COUNT: u32 = 0;

/// One raw telemetry measurement.
///
/// Every field has a documented default that applies when the field is absent
/// or unusable:
///
/// | Field               | Unit  | Default |
/// |---------------------|-------|---------|
/// | `rssi`              | dBm   | `-70`   |
/// | `bandwidth_mbps`    | Mbps  | `54`    |
/// | `latency_ms`        | ms    | `20`    |
/// | `packet_loss_ratio` | 0..1  | `0`     |
/// | `cpu_pct`           | %     | `30`    |
/// | `mem_pct`           | %     | `50`    |
/// | `bt_rssi`           | dBm   | `-70`   |
/// | `bt_count`          | count | `0`     |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    /// Primary radio signal level.
    #[serde(alias = "wifi_rssi")]
    pub rssi: f64,
    /// Link bandwidth.
    pub bandwidth_mbps: f64,
    /// Round-trip latency.
    pub latency_ms: f64,
    /// Fraction of packets lost.
    pub packet_loss_ratio: f64,
    /// CPU load percentage.
    pub cpu_pct: f64,
    /// Memory load percentage.
    pub mem_pct: f64,
    /// Secondary radio signal level.
    pub bt_rssi: f64,
    /// Number of secondary-radio devices in range.
    pub bt_count: u32,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            rssi: DEFAULT_RSSI_DBM,
            bandwidth_mbps: DEFAULT_BANDWIDTH_MBPS,
            latency_ms: DEFAULT_LATENCY_MS,
            packet_loss_ratio: DEFAULT_PACKET_LOSS,
            cpu_pct: DEFAULT_CPU_PCT,
            mem_pct: DEFAULT_MEM_PCT,
            bt_rssi: DEFAULT_BT_RSSI_DBM,
            bt_count: DEFAULT_BT_COUNT,
        }
    }
}

impl TelemetrySnapshot {
    /// Build a snapshot from an arbitrary JSON value.
    ///
    /// Missing fields, non-numeric values and non-finite numbers fall back to
    /// the documented defaults. Numeric strings (`"42.5"`) are accepted. A
    /// value that is not a JSON object yields the all-default snapshot.
    #[must_use]
    pub fn from_json_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(object) = value.as_object() else {
            return defaults;
        };
        let number = |keys: &[&str], fallback: f64| {
            keys.iter()
                .find_map(|key| object.get(*key).and_then(lenient_f64))
                .unwrap_or(fallback)
        };

        Self {
            rssi: number(&["rssi", "wifi_rssi"], defaults.rssi),
            bandwidth_mbps: number(&["bandwidth_mbps"], defaults.bandwidth_mbps),
            latency_ms: number(&["latency_ms"], defaults.latency_ms),
            packet_loss_ratio: number(&["packet_loss_ratio"], defaults.packet_loss_ratio),
            cpu_pct: number(&["cpu_pct"], defaults.cpu_pct),
            mem_pct: number(&["mem_pct"], defaults.mem_pct),
            bt_rssi: number(&["bt_rssi"], defaults.bt_rssi),
            bt_count: object
                .get("bt_count")
                .and_then(lenient_f64)
                .map_or(defaults.bt_count, device_count),
        }
    }

    /// Decode a snapshot from a JSON document, applying defaults leniently.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Serialization`] when `text` is not JSON, and
    /// [`FieldError::InvalidTelemetry`] when it is JSON but not an object.
    pub fn from_json_str(text: &str) -> FieldResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(FieldError::InvalidTelemetry {
                detail: format!("expected a JSON object, found {}", json_kind(&value)),
            });
        }
        Ok(Self::from_json_value(&value))
    }

    #[must_use]
    pub const fn with_rssi(mut self, dbm: f64) -> Self {
        self.rssi = dbm;
        self
    }

    #[must_use]
    pub const fn with_bandwidth(mut self, mbps: f64) -> Self {
        self.bandwidth_mbps = mbps;
        self
    }

    #[must_use]
    pub const fn with_latency(mut self, ms: f64) -> Self {
        self.latency_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_packet_loss(mut self, ratio: f64) -> Self {
        self.packet_loss_ratio = ratio;
        self
    }

    #[must_use]
    pub const fn with_cpu(mut self, pct: f64) -> Self {
        self.cpu_pct = pct;
        self
    }

    #[must_use]
    pub const fn with_memory(mut self, pct: f64) -> Self {
        self.mem_pct = pct;
        self
    }

    #[must_use]
    pub const fn with_bt(mut self, dbm: f64, devices: u32) -> Self {
        self.bt_rssi = dbm;
        self.bt_count = devices;
        self
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_count(raw: f64) -> u32 {
    raw.trunc().clamp(0.0, f64::from(u32::MAX)) as u32
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Telemetry mapped onto `[0, 1]` quality scores where `1.0` always means good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSignal {
    pub wifi_signal: f64,
    pub wifi_bandwidth: f64,
    /// Inverted: low latency scores high.
    pub latency_score: f64,
    /// Inverted packet loss.
    pub net_quality: f64,
    /// Inverted CPU load.
    pub cpu_score: f64,
    /// Inverted memory load.
    pub mem_score: f64,
    pub bt_signal: f64,
    /// Secondary-radio activity, `min(1, devices / 5)`.
    pub bt_active: f64,
}

// ─── Weights ────────────────────────────────────────────────────────────────

/// Non-negative per-channel weights summing to `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub wifi: f64,
    pub bt: f64,
    pub net: f64,
    pub sys: f64,
}

impl WeightVector {
    /// The documented default vector.
    pub const DEFAULT: Self = Self {
        wifi: 0.30,
        bt: 0.15,
        net: 0.35,
        sys: 0.20,
    };

    #[must_use]
    pub const fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Wifi => self.wifi,
            Channel::Bt => self.bt,
            Channel::Net => self.net,
            Channel::Sys => self.sys,
        }
    }

    pub const fn set(&mut self, channel: Channel, weight: f64) {
        match channel {
            Channel::Wifi => self.wifi = weight,
            Channel::Bt => self.bt = weight,
            Channel::Net => self.net = weight,
            Channel::Sys => self.sys = weight,
        }
    }

    /// Build a vector channel-by-channel.
    #[must_use]
    pub fn from_fn(mut f: impl FnMut(Channel) -> f64) -> Self {
        Self {
            wifi: f(Channel::Wifi),
            bt: f(Channel::Bt),
            net: f(Channel::Net),
            sys: f(Channel::Sys),
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.wifi + self.bt + self.net + self.sys
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A weight proposal whose entries may be missing.
///
/// Advisor output is untrusted; this type carries it until the weight
/// optimizer validates it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateWeights {
    pub wifi: Option<f64>,
    pub bt: Option<f64>,
    pub net: Option<f64>,
    pub sys: Option<f64>,
}

impl CandidateWeights {
    #[must_use]
    pub const fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Wifi => self.wifi,
            Channel::Bt => self.bt,
            Channel::Net => self.net,
            Channel::Sys => self.sys,
        }
    }

    /// Return a copy with `channel` removed.
    #[must_use]
    pub const fn without(mut self, channel: Channel) -> Self {
        match channel {
            Channel::Wifi => self.wifi = None,
            Channel::Bt => self.bt = None,
            Channel::Net => self.net = None,
            Channel::Sys => self.sys = None,
        }
        self
    }
}

impl From<WeightVector> for CandidateWeights {
    fn from(weights: WeightVector) -> Self {
        Self {
            wifi: Some(weights.wifi),
            bt: Some(weights.bt),
            net: Some(weights.net),
            sys: Some(weights.sys),
        }
    }
}

/// One score per channel. Used for CSI both on the `[0, 1]` scale and on the
/// `0–100` reporting scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelScores {
    pub wifi: f64,
    pub bt: f64,
    pub net: f64,
    pub sys: f64,
}

impl ChannelScores {
    #[must_use]
    pub const fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Wifi => self.wifi,
            Channel::Bt => self.bt,
            Channel::Net => self.net,
            Channel::Sys => self.sys,
        }
    }

    #[must_use]
    pub fn from_fn(mut f: impl FnMut(Channel) -> f64) -> Self {
        Self {
            wifi: f(Channel::Wifi),
            bt: f(Channel::Bt),
            net: f(Channel::Net),
            sys: f(Channel::Sys),
        }
    }

    /// Rescale unit-interval scores to `0–100`, rounded to 2 decimals.
    #[must_use]
    pub fn to_percent(&self) -> Self {
        Self::from_fn(|channel| round_to(self.get(channel) * 100.0, 2))
    }
}

// ─── Anomalies ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Latest sample is a statistical outlier against its predecessors.
    ZScore,
    /// High-frequency energy in the recent window exceeds its threshold.
    Oscillation,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ZScore => "Z_SCORE",
            Self::Oscillation => "OSCILLATION",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

/// A threshold crossing recorded in the anomaly log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub kind: AnomalyKind,
    /// Component the event concerns (`"GCS"` or `"Signal"`).
    pub component: String,
    /// `|z|` for z-score events, energy for oscillation events.
    pub magnitude: f64,
    /// GCS value at detection time.
    pub value: f64,
    pub severity: AnomalySeverity,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// Per-request anomaly statistics reported alongside the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub z_score: f64,
    pub oscillation_energy: f64,
    pub bayesian_confidence: f64,
}

// ─── Forecast ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Stable,
    Improving,
    Degrading,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stable => "STABLE",
            Self::Improving => "IMPROVING",
            Self::Degrading => "DEGRADING",
        })
    }
}

/// Linear trend fitted over recent GCS history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Predicted next GCS, clipped to `[0, 100]`.
    pub next: f64,
    pub slope: f64,
    pub intercept: f64,
    pub trend: Trend,
    /// Exponential decay rate; `0` unless the trend is falling.
    pub decay_lambda: f64,
    /// Samples until GCS reaches the degradation floor, when falling.
    pub time_to_threshold: Option<f64>,
}

// ─── Advisor commentary ─────────────────────────────────────────────────────

/// Dominant stability risk named by the advisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFactor {
    #[serde(rename = "WiFi")]
    Wifi,
    Bluetooth,
    Network,
    System,
    #[default]
    None,
}

impl RiskFactor {
    /// Parse an advisor label. Unknown labels map to [`RiskFactor::None`].
    #[must_use]
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "wifi" | "wi-fi" => Self::Wifi,
            "bluetooth" | "bt" => Self::Bluetooth,
            "network" | "net" => Self::Network,
            "system" | "sys" => Self::System,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wifi => "WiFi",
            Self::Bluetooth => "Bluetooth",
            Self::Network => "Network",
            Self::System => "System",
            Self::None => "None",
        }
    }
}

/// Where the weights and commentary of a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// No consult this request; cached weights reused.
    Cached,
    /// Fresh proposal from the remote advisor.
    Gemini,
    /// Advisor reached but failed, timed out, or answered malformed.
    Fallback,
    /// No advisor available.
    Offline,
}

impl Provenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Gemini => "gemini",
            Self::Fallback => "fallback",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Reports ────────────────────────────────────────────────────────────────

/// Aggregate result of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// 1-based request sequence number.
    pub sequence: u64,
    /// Global Cognitive Score, `0–100`.
    pub gcs: f64,
    /// Per-channel CSI on the `0–100` scale.
    pub csi: ChannelScores,
    pub weights: WeightVector,
    pub forecast: ForecastResult,
    pub anomaly: AnomalySummary,
    /// Events raised by this request.
    pub events: Vec<AnomalyEvent>,
    pub insight: String,
    pub risk_factor: RiskFactor,
    pub advisor_confidence: f64,
    pub provenance: Provenance,
    pub telemetry: TelemetrySnapshot,
    pub normalized: NormalizedSignal,
}

/// Read-only view of the adaptive weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsView {
    pub current: WeightVector,
    /// Most recent history entries, oldest first.
    pub history: Vec<WeightVector>,
}

/// Liveness summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
            service: "cogfield".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Round `value` to `decimals` places.
///
/// Exact ties go to the even neighbour (`0.125 → 0.12`, `0.375 → 0.38`).
/// Decimal literals that only look like ties (`2.675`) round by their stored
/// binary value.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
