//! Configuration for the analysis pipeline.
//!
//! [`AnalyzerConfig`] holds every tuning knob of the analyzer: buffer sizes,
//! the CSI moving-average window, the advisor cadence and deadline, and the
//! anomaly thresholds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Configuration for the telemetry analyzer.
///
/// All fields have defaults matching the documented pipeline behavior.
/// Override selectively from a TOML file or from environment variables.
///
/// # Environment Variable Overrides
///
/// | Variable                          | Field                   | Default |
/// |-----------------------------------|-------------------------|---------|
/// | `COGFIELD_HISTORY_CAPACITY`       | `history_capacity`      | `60`    |
/// | `COGFIELD_CONSULT_EVERY`          | `consult_every`         | `5`     |
/// | `COGFIELD_ADVISOR_TIMEOUT_MS`     | `advisor_timeout_ms`    | `5000`  |
/// | `COGFIELD_Z_THRESHOLD`            | `z_threshold`           | `2.5`   |
/// | `COGFIELD_OSCILLATION_THRESHOLD`  | `oscillation_threshold` | `15.0`  |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Capacity of each channel history (wifi, bt, net, sys, gcs).
    /// Default: 60.
    pub history_capacity: usize,

    /// Capacity of the anomaly event log.
    /// Default: 50.
    pub anomaly_log_capacity: usize,

    /// Number of past weight vectors retained for observability.
    /// Default: 20.
    pub weight_history_capacity: usize,

    /// Moving-average window used by the CSI time-consistency term.
    /// Default: 10.
    pub csi_window: usize,

    /// Consult the advisor on every Nth request (0 disables consults).
    /// Default: 5.
    pub consult_every: u64,

    /// Deadline for a single advisor consult, in milliseconds.
    /// Default: 5000.
    pub advisor_timeout_ms: u64,

    /// `|z|` above which a z-score anomaly is recorded.
    /// Default: 2.5.
    pub z_threshold: f64,

    /// High-frequency energy above which an oscillation anomaly is recorded.
    /// Default: 15.0.
    pub oscillation_threshold: f64,

    /// GCS level counted as a "stable" sample by the Bayesian confidence.
    /// Default: 60.0.
    pub confidence_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            anomaly_log_capacity: 50,
            weight_history_capacity: 20,
            csi_window: 10,
            consult_every: 5,
            advisor_timeout_ms: 5_000,
            z_threshold: 2.5,
            oscillation_threshold: 15.0,
            confidence_threshold: 60.0,
        }
    }
}

impl AnalyzerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::ConfigParse`] for invalid TOML and
    /// [`FieldError::InvalidConfig`] if the parsed values fail [`Self::validate`].
    pub fn from_toml_str(contents: &str) -> FieldResult<Self> {
        Self::parse_at(contents, Path::new("<inline>"))
    }

    /// Load a config file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Io`] if the file exists but cannot be read, and
    /// the same errors as [`Self::from_toml_str`] for its contents.
    pub fn load(path: &Path) -> FieldResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_at(&contents, path),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn parse_at(contents: &str, path: &Path) -> FieldResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|source| FieldError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load overrides from environment variables.
    ///
    /// Only overrides fields for which environment variables are set.
    /// Invalid values are silently ignored (defaults are kept).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("COGFIELD_HISTORY_CAPACITY")
            && let Ok(capacity) = val.parse::<usize>()
            && capacity > 0
        {
            self.history_capacity = capacity;
        }
        if let Ok(val) = std::env::var("COGFIELD_CONSULT_EVERY")
            && let Ok(every) = val.parse::<u64>()
        {
            self.consult_every = every;
        }
        if let Ok(val) = std::env::var("COGFIELD_ADVISOR_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
            && ms > 0
        {
            self.advisor_timeout_ms = ms;
        }
        if let Ok(val) = std::env::var("COGFIELD_Z_THRESHOLD")
            && let Ok(z) = val.parse::<f64>()
            && z.is_finite()
            && z > 0.0
        {
            self.z_threshold = z;
        }
        if let Ok(val) = std::env::var("COGFIELD_OSCILLATION_THRESHOLD")
            && let Ok(energy) = val.parse::<f64>()
            && energy.is_finite()
            && energy > 0.0
        {
            self.oscillation_threshold = energy;
        }
        self
    }

    /// Check invariants the analyzer relies on.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> FieldResult<()> {
        let capacities = [
            ("history_capacity", self.history_capacity),
            ("anomaly_log_capacity", self.anomaly_log_capacity),
            ("weight_history_capacity", self.weight_history_capacity),
            ("csi_window", self.csi_window),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(invalid(field, value, "must be at least 1"));
            }
        }
        if self.advisor_timeout_ms == 0 {
            return Err(invalid(
                "advisor_timeout_ms",
                self.advisor_timeout_ms,
                "must be at least 1",
            ));
        }
        let thresholds = [
            ("z_threshold", self.z_threshold),
            ("oscillation_threshold", self.oscillation_threshold),
            ("confidence_threshold", self.confidence_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, value, "must be a positive finite number"));
            }
        }
        Ok(())
    }

    /// Advisor deadline as a `Duration`.
    #[must_use]
    pub const fn advisor_timeout(&self) -> Duration {
        Duration::from_millis(self.advisor_timeout_ms)
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> FieldError {
    FieldError::InvalidConfig {
        field: field.to_owned(),
        value: value.to_string(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.history_capacity, 60);
        assert_eq!(config.anomaly_log_capacity, 50);
        assert_eq!(config.weight_history_capacity, 20);
        assert_eq!(config.csi_window, 10);
        assert_eq!(config.consult_every, 5);
        assert_eq!(config.advisor_timeout_ms, 5_000);
        assert!((config.z_threshold - 2.5).abs() < 1e-10);
        assert!((config.oscillation_threshold - 15.0).abs() < 1e-10);
        assert!((config.confidence_threshold - 60.0).abs() < 1e-10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let config = AnalyzerConfig::from_toml_str("consult_every = 3\nz_threshold = 3.0\n")
            .expect("parse partial config");
        assert_eq!(config.consult_every, 3);
        assert!((config.z_threshold - 3.0).abs() < 1e-12);
        assert_eq!(config.history_capacity, 60);
    }

    #[test]
    fn toml_roundtrip() {
        let expected = AnalyzerConfig {
            history_capacity: 30,
            advisor_timeout_ms: 250,
            oscillation_threshold: 9.5,
            ..AnalyzerConfig::default()
        };
        let text = toml::to_string(&expected).expect("serialize config");
        let decoded = AnalyzerConfig::from_toml_str(&text).expect("parse config");
        assert_eq!(decoded, expected);
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let err = AnalyzerConfig::from_toml_str("history_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, FieldError::ConfigParse { .. }));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = AnalyzerConfig::from_toml_str("history_capacity = 0").unwrap_err();
        match err {
            FieldError::InvalidConfig { field, .. } => assert_eq!(field, "history_capacity"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let config = AnalyzerConfig {
            z_threshold: -1.0,
            ..AnalyzerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("z_threshold"));
    }

    #[test]
    fn load_reads_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cogfield.toml");
        std::fs::write(&path, "csi_window = 12\n").expect("write config");
        let loaded = AnalyzerConfig::load(&path).expect("load config");
        assert_eq!(loaded.csi_window, 12);

        let missing = AnalyzerConfig::load(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(missing, AnalyzerConfig::default());
    }

    #[test]
    fn env_override_keeps_defaults_when_unset() {
        let config = AnalyzerConfig::default().with_env_overrides();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn advisor_timeout_as_duration() {
        let config = AnalyzerConfig {
            advisor_timeout_ms: 1_500,
            ..AnalyzerConfig::default()
        };
        assert_eq!(config.advisor_timeout(), Duration::from_millis(1_500));
    }
}
