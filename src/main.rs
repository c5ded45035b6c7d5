//! lspsync CLI entry point

use std::process::ExitCode;

use clap::Parser;

use lspsync::commands::{run_diagnostics, run_watch};
use lspsync::{Cli, Commands, SyncError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    let result = match &cli.command {
        Commands::Watch(args) => run_watch(args, log_level),
        Commands::Diagnostics(args) => run_diagnostics(args, log_level),
    };

    match result {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(ExitCode::FAILURE)
        }
    }
}
