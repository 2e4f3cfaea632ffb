//! Shared tracing vocabulary for cogfield.
//!
//! Installing a subscriber is left to the binary (see the `cogfield` CLI);
//! library consumers may bring their own and filter on [`TARGET_PREFIX`].

use tracing::Level;

/// Target prefix shared by every cogfield span and event.
///
/// ```text
/// COGFIELD_LOG=cogfield=debug,warn
/// ```
pub const TARGET_PREFIX: &str = "cogfield";

/// Environment variable holding a bare fallback level.
pub const LEVEL_ENV: &str = "COGFIELD_LOG_LEVEL";

/// Span names emitted by the pipeline.
///
/// `#[instrument]` needs literal names, so the engine spells these out at the
/// attribute sites; the constants exist for subscribers and for spans built
/// with the `*_span!` macros.
pub mod span_names {
    pub const ANALYZE: &str = "cogfield::analyze";
    pub const DETECT: &str = "cogfield::detect";
    /// Advisor consult, including the deadline wait.
    pub const ADVISOR_CONSULT: &str = "cogfield::advisor_consult";
    pub const WEIGHT_UPDATE: &str = "cogfield::weight_update";
    pub const CALL_QUALITY: &str = "cogfield::call_quality";

    pub const ALL: [&str; 5] = [
        ANALYZE,
        DETECT,
        ADVISOR_CONSULT,
        WEIGHT_UPDATE,
        CALL_QUALITY,
    ];
}

/// Parse a bare level name. Surrounding whitespace and case are ignored;
/// `warning` is accepted as an alias for `warn`.
#[must_use]
pub fn parse_level(raw: &str) -> Option<Level> {
    let level = match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => return None,
    };
    Some(level)
}

/// Level named by [`LEVEL_ENV`], or `default` when unset or unparseable.
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var(LEVEL_ENV)
        .ok()
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(default)
}
