//! CLI command implementations

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Subcommand;
use qsim_core::config::{DEFAULT_OUTPUT_FILE, DEFAULT_TOTAL_EVENTS, OutputConfig};
use qsim_core::driver::run_to_file;
use qsim_core::{QsimError, SimulationConfig, TraceSummary};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate packet events at a router queue and write the trace
    Simulate {
        /// Arrival rate (λ) in packets/sec [default: 70]
        #[arg(short = 'l', long = "lambda-rate", alias = "lambda_rate")]
        lambda_rate: Option<f64>,
        /// Departure rate (μ) in packets/sec
        #[arg(short = 'm', long = "mu-rate", alias = "mu_rate")]
        mu_rate: f64,
        /// Queue buffer size (n) in packets
        #[arg(short = 'n', long = "buffer-size", alias = "buffer_size")]
        buffer_size: u64,
        /// Total number of events to simulate [default: 1000000]
        #[arg(short = 'x', long = "num-events", alias = "num_events")]
        num_events: Option<u64>,
        /// Output file for the trace
        #[arg(short = 'o', long = "output-file", alias = "output_file", default_value = DEFAULT_OUTPUT_FILE)]
        output_file: PathBuf,
        /// Step the arrival rate through the burst-and-decay schedule
        #[arg(long = "variable-lambda", alias = "variable_lambda")]
        variable_lambda: bool,
        /// Seed for reproducible runs (falls back to QSIM_SEED)
        #[arg(long)]
        seed: Option<u64>,
        /// Narrate individual events
        #[arg(long)]
        debug: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize a trace file and check its invariants
    Analyze {
        /// Trace file to read
        #[arg(short, long = "input-file", alias = "input_file")]
        input_file: PathBuf,
        /// Buffer size the trace was produced with, enables the bound check
        #[arg(short = 'n', long = "buffer-size")]
        buffer_size: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Check if this command asked for event narration.
    pub fn narrates(&self) -> bool {
        matches!(self, Commands::Simulate { debug: true, .. })
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Simulate {
            lambda_rate,
            mu_rate,
            buffer_size,
            num_events,
            output_file,
            variable_lambda,
            seed,
            debug,
            json,
        } => {
            let config = build_config(
                lambda_rate,
                mu_rate,
                buffer_size,
                num_events,
                variable_lambda,
                seed,
            )
            .map_err(user_facing)?;
            let output = OutputConfig {
                trace_path: output_file,
                narrate: debug,
            };
            simulate(config, &output, json)
        }
        Commands::Analyze {
            input_file,
            buffer_size,
            json,
        } => analyze(input_file, buffer_size, json),
    }
}

/// Resolves CLI options into a validated configuration.
///
/// Explicit flags win over `QSIM_*` environment overrides, which win over
/// defaults.
///
/// # Errors
/// - `QsimError::Configuration` - Conflicting or invalid parameters
fn build_config(
    lambda_rate: Option<f64>,
    mu_rate: f64,
    buffer_size: u64,
    num_events: Option<u64>,
    variable_lambda: bool,
    seed: Option<u64>,
) -> Result<SimulationConfig, QsimError> {
    let mut config = SimulationConfig::from_options(
        lambda_rate,
        mu_rate,
        buffer_size,
        num_events.unwrap_or(DEFAULT_TOTAL_EVENTS),
        variable_lambda,
    )?
    .with_env_overrides();

    if let Some(events) = num_events {
        config.total_events = events;
    }
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

/// Run a simulation into the trace file
///
/// # Errors
/// - `QsimError::Trace` - Trace file could not be created or written
fn simulate(config: SimulationConfig, output: &OutputConfig, json: bool) -> anyhow::Result<()> {
    let summary = run_to_file(config, output).map_err(user_facing)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.summary());
        println!("Results saved to {}", output.trace_path.display());
    }

    Ok(())
}

/// Summarize a trace file
///
/// # Errors
/// - `QsimError::Trace` - Trace file missing or malformed
/// - Invariant violations found in the trace
fn analyze(input_file: PathBuf, buffer_size: Option<u64>, json: bool) -> anyhow::Result<()> {
    tracing::info!(path = %input_file.display(), "Reading trace");

    let summary = TraceSummary::from_path(&input_file, buffer_size)
        .map_err(user_facing)
        .with_context(|| format!("Failed to analyze {}", input_file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.summary());
    }

    if !summary.is_consistent() {
        bail!(
            "{} invariant violation(s) in {}",
            summary.violation_count,
            input_file.display()
        );
    }

    Ok(())
}

fn user_facing(err: QsimError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
