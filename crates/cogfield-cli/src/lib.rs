//! Command-line driver for the cogfield analyzer.
//!
//! Reads newline-delimited JSON telemetry on stdin and writes one JSON
//! [`StabilityReport`](cogfield_core::StabilityReport) per line on stdout.
//! Logs go to stderr.

pub mod cli;
pub mod runner;
pub mod tracing_setup;

pub use cli::{CliCommand, CliInput, USAGE, parse_cli_args};
pub use runner::{RunSummary, load_config, render_config, run_analyze};
pub use tracing_setup::{Verbosity, init_subscriber};
