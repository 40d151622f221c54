//! qsim CLI - Command-line interface
//!
//! Runs queue simulations and analyzes the traces they produce.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use qsim_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "qsim")]
#[command(about = "Bounded router queue simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory receiving a full debug log of this run
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.command.narrates() {
        cli.log_level.at_least(CliLogLevel::Debug)
    } else {
        cli.log_level
    };
    init_tracing(level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command)
}
