//! Centralized configuration for qsim runs.
//!
//! A `SimulationConfig` is validated once, before any event is simulated,
//! and stays immutable for the whole run.

use std::path::PathBuf;

use serde::Serialize;

use crate::schedule::RateSchedule;
use crate::{QsimError, Result};

/// Arrival rate used when the fixed rate is not supplied.
pub const DEFAULT_ARRIVAL_RATE: f64 = 70.0;

/// Number of events simulated when not supplied.
pub const DEFAULT_TOTAL_EVENTS: u64 = 1_000_000;

/// Trace file written when no output is supplied.
pub const DEFAULT_OUTPUT_FILE: &str = "output.txt";

/// How the arrival rate evolves during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    /// Base arrival rate for every event
    #[default]
    Constant,
    /// Percentile-bracket schedule, base arrival rate ignored
    Variable,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    /// Base arrival rate (λ), used in constant mode
    pub arrival_rate: f64,
    /// Departure rate (μ), must be positive
    pub departure_rate: f64,
    /// Maximum packets held before arrivals are dropped
    pub buffer_size: u64,
    /// Number of events to simulate
    pub total_events: u64,
    /// Constant or variable arrival rate
    pub rate_mode: RateMode,
    /// Seed for reproducible draws (None = fresh seed per run)
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arrival_rate: DEFAULT_ARRIVAL_RATE,
            departure_rate: 100.0,
            buffer_size: 10,
            total_events: DEFAULT_TOTAL_EVENTS,
            rate_mode: RateMode::Constant,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Builds a validated configuration from user-facing options.
    ///
    /// An explicit arrival rate and the variable-rate flag are mutually
    /// exclusive. Without either, the default arrival rate applies.
    ///
    /// # Errors
    ///
    /// - `QsimError::Configuration` - If both a fixed and a variable arrival
    ///   rate are requested, or any parameter fails validation
    pub fn from_options(
        arrival_rate: Option<f64>,
        departure_rate: f64,
        buffer_size: u64,
        total_events: u64,
        variable_rate: bool,
    ) -> Result<Self> {
        if variable_rate && arrival_rate.is_some() {
            return Err(QsimError::configuration(
                "cannot use both a fixed and a variable arrival rate",
            ));
        }

        let config = Self {
            arrival_rate: arrival_rate.unwrap_or(DEFAULT_ARRIVAL_RATE),
            departure_rate,
            buffer_size,
            total_events,
            rate_mode: if variable_rate {
                RateMode::Variable
            } else {
                RateMode::Constant
            },
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a small, seeded configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            total_events: 1_000,
            seed: Some(42), // Fixed seed for reproducible tests
            ..Self::default()
        }
    }

    /// Sets the seed used for the run.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Applies `QSIM_SEED` and `QSIM_TOTAL_EVENTS` overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(seed) = lookup("QSIM_SEED") {
            match seed.parse::<u64>() {
                Ok(value) => self.seed = Some(value),
                Err(e) => tracing::warn!(value = %seed, error = %e, "Ignoring invalid QSIM_SEED"),
            }
        }

        if let Some(events) = lookup("QSIM_TOTAL_EVENTS") {
            match events.parse::<u64>() {
                Ok(value) => self.total_events = value,
                Err(e) => {
                    tracing::warn!(value = %events, error = %e, "Ignoring invalid QSIM_TOTAL_EVENTS")
                }
            }
        }

        self
    }

    /// Checks the preconditions the simulation relies on.
    ///
    /// # Errors
    ///
    /// - `QsimError::Configuration` - If the departure rate is not positive
    ///   and finite, the arrival rate is negative or not finite, or no events
    ///   were requested
    pub fn validate(&self) -> Result<()> {
        if !self.departure_rate.is_finite() || self.departure_rate <= 0.0 {
            return Err(QsimError::configuration(format!(
                "departure rate must be positive, got {}",
                self.departure_rate
            )));
        }

        if !self.arrival_rate.is_finite() || self.arrival_rate < 0.0 {
            return Err(QsimError::configuration(format!(
                "arrival rate must be non-negative, got {}",
                self.arrival_rate
            )));
        }

        if self.total_events == 0 {
            return Err(QsimError::configuration(
                "total events must be at least 1",
            ));
        }

        Ok(())
    }

    /// Returns the rate schedule implied by this configuration.
    pub fn rate_schedule(&self) -> RateSchedule {
        match self.rate_mode {
            RateMode::Constant => RateSchedule::Constant {
                rate: self.arrival_rate,
            },
            RateMode::Variable => RateSchedule::Percentile,
        }
    }
}

/// Output options for a run, kept apart from the simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Trace file path
    pub trace_path: PathBuf,
    /// Narrate events through the debug observer
    pub narrate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            narrate: false,
        }
    }
}
