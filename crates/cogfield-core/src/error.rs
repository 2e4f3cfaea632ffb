use std::path::PathBuf;

/// Unified error type for the fallible edges of cogfield: configuration
/// loading, telemetry decoding, and report serialization.
///
/// The analysis pipeline itself never returns an error. Malformed telemetry is
/// defaulted, invalid weight proposals are ignored, and advisor failures are
/// converted into provenance tags. Only the surfaces that touch files or
/// streams surface a `FieldError`.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// A configuration value is invalid.
    #[error("Invalid config: {field} = \"{value}\" — {reason}")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A configuration file exists but is not valid TOML for `AnalyzerConfig`.
    #[error("Failed to parse config at {path}: {source}. Fix the file or remove it to use defaults.")]
    ConfigParse {
        /// Path that was attempted.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The effective configuration could not be rendered as TOML.
    #[error("Failed to render config as TOML: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// A telemetry payload could not be decoded at all (not even as JSON).
    #[error("Invalid telemetry payload: {detail}")]
    InvalidTelemetry {
        /// What went wrong.
        detail: String,
    },

    /// Wraps `std::io::Error` for file and stream operations.
    #[error("I/O error: {0}. Check file permissions and that the stream is still open.")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the cogfield crates.
pub type FieldResult<T> = Result<T, FieldError>;
