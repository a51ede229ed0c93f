//! Domscope CLI: inspect element trees and command targets

use clap::Parser;
use domscope_cli::{
    handlers::{execute_config, execute_find, execute_inspect},
    init_tracing, Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    init_tracing(verbosity)?;

    let config = CliConfig::new()
        .with_verbosity(verbosity)
        .load_engine(cli.config.as_deref())?;

    let output = match &cli.command {
        Commands::Inspect(args) => execute_inspect(args)?,
        Commands::Find(args) => execute_find(&config, args)?,
        Commands::Config(args) => execute_config(&config, args)?,
    };
    print!("{output}");
    Ok(())
}
