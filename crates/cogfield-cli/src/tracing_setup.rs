//! Subscriber installation for the `cogfield` binary.
//!
//! stdout carries NDJSON reports, so every log line goes to stderr. The
//! filter comes from the first source that yields valid directives:
//!
//! 1. `COGFIELD_LOG` (full directives, e.g. `cogfield=debug,warn`)
//! 2. `RUST_LOG`
//! 3. `COGFIELD_LOG_LEVEL` (a bare level), combined with the CLI flags

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use cogfield_core::tracing_config::{self, TARGET_PREFIX};

const DIRECTIVES_ENV: &str = "COGFIELD_LOG";

/// How chatty the CLI should be, from `-v` / `-q`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// `-v` overrides `-q`.
    #[must_use]
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    /// Level applied to every target when no environment filter is set.
    #[must_use]
    pub const fn base_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Where the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    CogfieldLog,
    RustLog,
    Flags,
}

/// Install the global stderr subscriber.
///
/// A second call is a no-op; the first subscriber stays in place.
pub fn init_subscriber(verbosity: Verbosity, no_color: bool) {
    let (filter, source) = resolve_filter(verbosity);
    let ansi = !no_color && std::io::stderr().is_terminal();
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(true);

    // Timestamps only help when reading a debug trace.
    let result = match verbosity {
        Verbosity::Verbose => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_timer(fmt::time::uptime()))
            .try_init(),
        Verbosity::Quiet | Verbosity::Normal => tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time().compact())
            .try_init(),
    };

    match result {
        Ok(()) => tracing::debug!(?source, ?verbosity, "logging initialized"),
        Err(_) => tracing::debug!("subscriber already installed, keeping it"),
    }
}

fn resolve_filter(verbosity: Verbosity) -> (EnvFilter, FilterSource) {
    if let Ok(directives) = std::env::var(DIRECTIVES_ENV)
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return (filter, FilterSource::CogfieldLog);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, FilterSource::RustLog);
    }

    let level = tracing_config::level_from_env(verbosity.base_level());
    let filter = EnvFilter::try_new(flag_directives(verbosity, level))
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    (filter, FilterSource::Flags)
}

/// Directives for the flag-driven fallback. Verbose mode always opens the
/// cogfield targets to `debug`, even when the base level is stricter.
fn flag_directives(verbosity: Verbosity, level: Level) -> String {
    let base = level.as_str().to_ascii_lowercase();
    if verbosity == Verbosity::Verbose {
        format!("{base},{TARGET_PREFIX}=debug")
    } else {
        base
    }
}
