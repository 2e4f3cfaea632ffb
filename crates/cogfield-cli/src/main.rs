use std::io::{self, Write};

use cogfield_cli::{
    CliCommand, USAGE, Verbosity, init_subscriber, load_config, parse_cli_args, render_config,
    run_analyze,
};
use cogfield_core::FieldResult;
use cogfield_engine::Analyzer;
use tracing::info;

fn main() -> FieldResult<()> {
    let input = parse_cli_args(std::env::args().skip(1))?;

    match input.command {
        CliCommand::Version => {
            println!("cogfield {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        CliCommand::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        _ => {}
    }

    init_subscriber(
        Verbosity::from_flags(input.verbose, input.quiet),
        input.no_color,
    );
    let config = load_config(input.config_path.as_deref())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match input.command {
        CliCommand::Config => {
            write!(out, "{}", render_config(&config)?)?;
        }
        CliCommand::Health => {
            let analyzer = Analyzer::new(config);
            serde_json::to_writer(&mut out, &analyzer.health())?;
            writeln!(out)?;
        }
        CliCommand::Analyze => {
            info!(consult_every = config.consult_every, "starting analyze");
            let analyzer = Analyzer::new(config);
            let stdin = io::stdin();
            run_analyze(&analyzer, stdin.lock(), &mut out, input.call_quality)?;
        }
        CliCommand::Version | CliCommand::Help => {}
    }
    Ok(())
}
