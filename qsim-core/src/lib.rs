//! qsim Core - Event-driven simulation of a bounded router queue.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! Models a single M/M/1/K-style FIFO buffer as a sequence of logical
//! events. Each event is an arrival or a departure, classified from one
//! uniform random draw, and the queue occupancy plus the cumulative drop
//! count are written to a trace after every event.
//!
//! # Example
//!
//! ```rust,no_run
//! use qsim_core::{Simulation, SimulationConfig, TraceWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SimulationConfig {
//!     departure_rate: 100.0,
//!     buffer_size: 10,
//!     total_events: 10_000,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut sim = Simulation::new(config)?;
//! let mut writer = TraceWriter::create("output.txt")?;
//! let summary = sim.run(&mut writer)?;
//! writer.finish()?;
//!
//! println!("Dropped {} packets", summary.dropped);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod driver;
pub mod generator;
pub mod invariants;
pub mod observer;
pub mod queue;
pub mod rng;
pub mod schedule;
pub mod trace;
pub mod tracing_setup;

pub use analysis::TraceSummary;
pub use config::{RateMode, SimulationConfig};
pub use driver::{RunSummary, Simulation};
pub use generator::{EventKind, arrival_probability, classify};
pub use invariants::{InvariantViolation, TraceInvariant};
pub use observer::{DebugNarrator, EventObserver, SimulatedEvent};
pub use queue::{QueueState, Transition};
pub use rng::{ConstantSource, DeterministicRng, RandomSource, ScriptedSource};
pub use schedule::RateSchedule;
pub use trace::{TraceError, TraceReader, TraceRecord, TraceWriter};

/// Errors that can surface from any qsim component.
///
/// Every variant is fatal for the run that produced it; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum QsimError {
    /// Parameters are missing, conflicting or out of range
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Why the configuration was rejected
        reason: String,
    },

    /// Trace sink or trace input failed
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Any other file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QsimError {
    /// Creates a configuration error from any displayable reason.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            QsimError::Configuration { reason } => format!("Invalid configuration: {reason}"),
            QsimError::Trace(e) => match e {
                TraceError::Create { path, .. } => {
                    format!("Could not create trace file: {}", path.display())
                }
                TraceError::Write { .. } => "Could not write to trace file".to_string(),
                TraceError::Open { path, .. } => {
                    format!("Could not open trace file: {}", path.display())
                }
                TraceError::Malformed { line, .. } => format!("Malformed trace at line {line}"),
                _ => "Trace error occurred".to_string(),
            },
            QsimError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            QsimError::Configuration { .. } | QsimError::Trace(TraceError::Malformed { .. })
        )
    }

    /// Checks if this error means the output sink failed.
    pub fn is_sink_error(&self) -> bool {
        matches!(self, QsimError::Trace(e) if e.is_sink_failure())
    }
}

/// Result alias used throughout qsim.
pub type Result<T> = std::result::Result<T, QsimError>;
