pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hrflow",
    about = "hrflow operator CLI",
    long_about = "Operate the hrflow approval engine: migrations, demo org chart, config inspection, and readiness checks.",
    after_help = "Examples:\n  hrflow migrate\n  hrflow seed\n  hrflow doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo org chart (actors and reporting lines) and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values and approval sequences with source attribution"
    )]
    Config,
    #[command(about = "Validate config, database schema, and org chart integrity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
