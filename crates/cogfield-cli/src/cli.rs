//! Command-line argument parsing.

use std::path::PathBuf;

use cogfield_core::{FieldError, FieldResult};

/// Usage text printed by `cogfield help`.
pub const USAGE: &str = "\
usage: cogfield [COMMAND] [FLAGS]

commands:
  analyze   read NDJSON telemetry from stdin, write one JSON report per line (default)
  config    print the effective configuration as TOML
  health    print the health object
  version   print the version
  help      print this message

flags:
  --config PATH     load configuration from PATH
  --call-quality    also emit a call-quality line per snapshot (analyze)
  -v, --verbose     debug logging
  -q, --quiet       errors only
  --no-color        disable ANSI colors in logs";

/// Top-level subcommand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CliCommand {
    #[default]
    Analyze,
    Config,
    Health,
    Version,
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliInput {
    pub command: CliCommand,
    pub config_path: Option<PathBuf>,
    pub call_quality: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
}

/// Parse arguments (without the program name).
///
/// # Errors
///
/// Returns [`FieldError::InvalidConfig`] for unknown commands or flags and for
/// flags missing their value.
pub fn parse_cli_args<I, S>(args: I) -> FieldResult<CliInput>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
    let (command, mut idx) = extract_command(&tokens)?;
    let mut input = CliInput {
        command,
        ..CliInput::default()
    };

    while idx < tokens.len() {
        let flag = tokens[idx].as_str();
        match flag {
            "--config" => {
                let value = expect_value(&tokens, idx, "--config")?;
                input.config_path = Some(PathBuf::from(value));
                idx += 2;
            }
            "--call-quality" => {
                input.call_quality = true;
                idx += 1;
            }
            "-v" | "--verbose" => {
                input.verbose = true;
                idx += 1;
            }
            "-q" | "--quiet" => {
                input.quiet = true;
                idx += 1;
            }
            "--no-color" => {
                input.no_color = true;
                idx += 1;
            }
            "-h" | "--help" => {
                input.command = CliCommand::Help;
                idx += 1;
            }
            _ => {
                return Err(FieldError::InvalidConfig {
                    field: "cli.flag".into(),
                    value: flag.into(),
                    reason: "unsupported flag; see `cogfield help`".into(),
                });
            }
        }
    }

    Ok(input)
}

fn extract_command(tokens: &[String]) -> FieldResult<(CliCommand, usize)> {
    if let Some(token) = tokens.first()
        && !token.starts_with('-')
    {
        return Ok((parse_command(token)?, 1));
    }
    Ok((CliCommand::default(), 0))
}

fn parse_command(token: &str) -> FieldResult<CliCommand> {
    match token {
        "analyze" => Ok(CliCommand::Analyze),
        "config" => Ok(CliCommand::Config),
        "health" => Ok(CliCommand::Health),
        "version" => Ok(CliCommand::Version),
        "help" => Ok(CliCommand::Help),
        other => Err(FieldError::InvalidConfig {
            field: "cli.command".into(),
            value: other.into(),
            reason: "expected analyze|config|health|version|help".into(),
        }),
    }
}

fn expect_value<'a>(tokens: &'a [String], idx: usize, flag: &str) -> FieldResult<&'a str> {
    tokens
        .get(idx + 1)
        .map(String::as_str)
        .filter(|value| !value.starts_with('-'))
        .ok_or_else(|| FieldError::InvalidConfig {
            field: "cli.flag".into(),
            value: flag.into(),
            reason: "missing value".into(),
        })
}
