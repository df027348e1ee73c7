//! GeoAudit - audit GeoJSON layer catalogs
//!
//! Exit codes: 0 when the audit passed, 1 when it completed with failures,
//! 2 when it could not run (bad manifest, bad configuration).

use anyhow::Result;
use clap::{Parser, Subcommand};
use geoaudit_logging::LogConfig;
use std::process::ExitCode;

mod cli;

use cli::AuditStatus;

#[derive(Parser, Debug)]
#[command(name = "geoaudit", version, about = "Audit GeoJSON layer catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit every layer referenced by a groups manifest
    Audit(cli::audit::AuditArgs),

    /// Show paths and the effective configuration
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Audit(args) => args.json,
        Commands::Config(args) => args.json,
    }
}

fn command_is_verbose(command: &Commands) -> bool {
    matches!(command, Commands::Audit(args) if args.verbose)
}

fn run_command(cli: Cli) -> Result<AuditStatus> {
    match cli.command {
        Commands::Audit(args) => cli::audit::run(args),
        Commands::Config(args) => cli::config::run(args).map(|()| AuditStatus::Passed),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    let _log_guard = match geoaudit_logging::init_logging(LogConfig {
        app_name: "geoaudit",
        verbose: command_is_verbose(&cli.command),
        json_mode,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(AuditStatus::Passed) => ExitCode::SUCCESS,
        Ok(AuditStatus::Failed) => ExitCode::from(1),
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(2)
        }
    }
}
