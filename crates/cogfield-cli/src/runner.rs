//! Command execution for the `cogfield` binary.

use std::io::{BufRead, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use cogfield_core::{AnalyzerConfig, FieldError, FieldResult, TelemetrySnapshot};
use cogfield_engine::{Analyzer, CallQualityReport};

/// Counts reported after an `analyze` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub skipped: u64,
}

#[derive(Serialize)]
struct CallQualityLine<'a> {
    sequence: u64,
    call_quality: &'a CallQualityReport,
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Without one, defaults apply. Environment
/// overrides are layered on top and the result is validated.
///
/// # Errors
///
/// Returns [`FieldError::InvalidConfig`] for a missing explicit file or
/// invalid values, and parse/IO errors from reading the file.
pub fn load_config(path: Option<&Path>) -> FieldResult<AnalyzerConfig> {
    let base = match path {
        Some(path) => {
            if !path.exists() {
                return Err(FieldError::InvalidConfig {
                    field: "config_file".to_owned(),
                    value: path.display().to_string(),
                    reason: "explicitly provided --config path does not exist".to_owned(),
                });
            }
            AnalyzerConfig::load(path)?
        }
        None => AnalyzerConfig::default(),
    };
    let config = base.with_env_overrides();
    config.validate()?;
    debug!(?config, "configuration resolved");
    Ok(config)
}

/// Render a configuration as TOML.
///
/// # Errors
///
/// Returns [`FieldError::ConfigRender`] if serialization fails.
pub fn render_config(config: &AnalyzerConfig) -> FieldResult<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Read NDJSON snapshots from `input` and write one report per line.
///
/// Blank lines are ignored. Lines that do not decode to a JSON object are
/// skipped with a warning. With `call_quality`, each report line is followed
/// by a `{"sequence", "call_quality"}` line.
///
/// # Errors
///
/// Returns [`FieldError::Io`] when reading or writing fails and
/// [`FieldError::Serialization`] if a report cannot be encoded.
pub fn run_analyze<R, W>(
    analyzer: &Analyzer,
    input: R,
    output: &mut W,
    call_quality: bool,
) -> FieldResult<RunSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = RunSummary::default();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let snapshot = match TelemetrySnapshot::from_json_str(trimmed) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(line = index + 1, %error, "skipping malformed telemetry line");
                summary.skipped += 1;
                continue;
            }
        };

        let report = analyzer.analyze(&snapshot);
        serde_json::to_writer(&mut *output, &report)?;
        writeln!(output)?;

        if call_quality {
            let quality = analyzer.call_quality(&snapshot);
            let line = CallQualityLine {
                sequence: report.sequence,
                call_quality: &quality,
            };
            serde_json::to_writer(&mut *output, &line)?;
            writeln!(output)?;
        }
        summary.processed += 1;
    }
    output.flush()?;
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        "analyze run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use serde_json::Value;

    fn quiet_analyzer() -> Analyzer {
        Analyzer::new(AnalyzerConfig {
            consult_every: 0,
            ..AnalyzerConfig::default()
        })
    }

    #[test]
    fn analyze_writes_one_report_per_line() {
        let input = "{\"rssi\": -50}\n\n{\"latency_ms\": \"35\"}\n";
        let mut output = Vec::new();
        let summary =
            run_analyze(&quiet_analyzer(), Cursor::new(input), &mut output, false).unwrap();
        assert_eq!(summary, RunSummary { processed: 2, skipped: 0 });

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["sequence"], 1);
        assert_eq!(lines[1]["sequence"], 2);
        assert_eq!(lines[1]["telemetry"]["latency_ms"], 35.0);
        assert_eq!(lines[0]["provenance"], "cached");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let input = "not json\n[1,2]\n{\"cpu_pct\": 75}\n";
        let mut output = Vec::new();
        let summary =
            run_analyze(&quiet_analyzer(), Cursor::new(input), &mut output, false).unwrap();
        assert_eq!(summary, RunSummary { processed: 1, skipped: 2 });
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
    }

    #[test]
    fn call_quality_lines_follow_reports() {
        let input = "{}\n".repeat(6);
        let mut output = Vec::new();
        run_analyze(&quiet_analyzer(), Cursor::new(input), &mut output, true).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[1]["call_quality"]["ready"], false);
        assert_eq!(lines[11]["sequence"], 6);
        assert_eq!(lines[11]["call_quality"]["ready"], true);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, FieldError::InvalidConfig { .. }));
    }

    #[test]
    fn config_file_is_loaded_and_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cogfield.toml");
        std::fs::write(&path, "csi_window = 7\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.csi_window, 7);

        let rendered = render_config(&config).unwrap();
        assert!(rendered.contains("csi_window = 7"));
        let reparsed = AnalyzerConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.csi_window, 7);
    }

    #[test]
    fn defaults_without_path() {
        let config = load_config(None).unwrap();
        assert!(config.validate().is_ok());
    }
}
