//! Simulation driver.
//!
//! Runs events 1..=N strictly in order. Each event depends on the queue
//! left by the previous one, so a run is inherently sequential; separate
//! runs share nothing and may execute concurrently.

use std::io::Write;

use serde::Serialize;

use crate::config::{OutputConfig, SimulationConfig};
use crate::generator::{arrival_probability, classify};
use crate::observer::{DebugNarrator, EventObserver, SimulatedEvent};
use crate::queue::{QueueState, Transition};
use crate::rng::{DeterministicRng, RandomSource};
use crate::schedule::RateSchedule;
use crate::trace::{TraceRecord, TraceWriter};
use crate::Result;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seed of the built-in RNG, if one was used
    pub seed: Option<u64>,
    /// Events simulated
    pub events: u64,
    /// Buffer capacity of the simulated queue
    pub buffer_size: u64,
    /// Occupancy after the last event
    pub final_occupancy: u64,
    /// Packets dropped over the whole run
    pub dropped: u64,
    /// Events classified as arrivals, dropped or not
    pub arrivals: u64,
    /// Events classified as departures, idle or not
    pub departures: u64,
    /// Departures that found the queue empty
    pub idle_departures: u64,
    /// Highest occupancy reached
    pub peak_occupancy: u64,
}

impl RunSummary {
    fn new(seed: Option<u64>, buffer_size: u64) -> Self {
        Self {
            seed,
            events: 0,
            buffer_size,
            final_occupancy: 0,
            dropped: 0,
            arrivals: 0,
            departures: 0,
            idle_departures: 0,
            peak_occupancy: 0,
        }
    }

    fn record(&mut self, transition: Transition, queue: &QueueState) {
        self.events += 1;
        match transition {
            Transition::Enqueued | Transition::Dropped => self.arrivals += 1,
            Transition::Dequeued => self.departures += 1,
            Transition::Idle => {
                self.departures += 1;
                self.idle_departures += 1;
            }
        }
        self.final_occupancy = queue.occupancy();
        self.dropped = queue.dropped();
        self.peak_occupancy = self.peak_occupancy.max(queue.occupancy());
    }

    /// Returns the share of arrivals that were dropped.
    pub fn drop_ratio(&self) -> f64 {
        if self.arrivals == 0 {
            return 0.0;
        }
        self.dropped as f64 / self.arrivals as f64
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        if let Some(seed) = self.seed {
            summary.push_str(&format!("Simulation complete (seed: {seed})\n"));
        } else {
            summary.push_str("Simulation complete\n");
        }
        summary.push_str(&format!("Events simulated: {}\n", self.events));
        summary.push_str(&format!("Final queue length: {}\n", self.final_occupancy));
        summary.push_str(&format!("Total packets dropped: {}\n", self.dropped));
        summary.push_str(&format!(
            "Arrivals: {} ({:.2}% dropped)\n",
            self.arrivals,
            self.drop_ratio() * 100.0
        ));
        summary.push_str(&format!(
            "Departures: {} ({} idle)\n",
            self.departures, self.idle_departures
        ));
        summary.push_str(&format!(
            "Peak queue length: {} of {}\n",
            self.peak_occupancy, self.buffer_size
        ));
        summary
    }
}

/// Sequential driver for one queue simulation.
pub struct Simulation<R: RandomSource = DeterministicRng> {
    config: SimulationConfig,
    schedule: RateSchedule,
    source: R,
    seed: Option<u64>,
    observers: Vec<Box<dyn EventObserver>>,
}

impl Simulation<DeterministicRng> {
    /// Creates a simulation drawing from a ChaCha8 generator.
    ///
    /// Uses the configured seed, or a fresh one that is reported in the
    /// run summary.
    ///
    /// # Errors
    ///
    /// - `QsimError::Configuration` - If the configuration is invalid
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => DeterministicRng::from_seed(seed),
            None => DeterministicRng::from_entropy(),
        };
        let seed = rng.seed();

        let mut simulation = Self::with_source(config, rng)?;
        simulation.seed = Some(seed);
        Ok(simulation)
    }
}

impl<R: RandomSource> Simulation<R> {
    /// Creates a simulation drawing from a caller-supplied source.
    ///
    /// # Errors
    ///
    /// - `QsimError::Configuration` - If the configuration is invalid
    pub fn with_source(config: SimulationConfig, source: R) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            schedule: config.rate_schedule(),
            config,
            source,
            seed: None,
            observers: Vec::new(),
        })
    }

    /// Returns the seed of the built-in RNG, if one is used.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Adds an observer notified after every event.
    pub fn add_observer(&mut self, observer: impl EventObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Runs all configured events, writing one trace record per event.
    ///
    /// Every record written before an error is a valid trace prefix.
    ///
    /// # Errors
    ///
    /// - `QsimError::Trace` - If the trace sink rejects a record
    pub fn run<W: Write>(&mut self, writer: &mut TraceWriter<W>) -> Result<RunSummary> {
        let total = self.config.total_events;
        let departure_rate = self.config.departure_rate;

        tracing::info!(
            lambda = %self.schedule,
            mu = departure_rate,
            buffer_size = self.config.buffer_size,
            total_events = total,
            seed = ?self.seed,
            "Simulation parameters"
        );

        let mut queue = QueueState::new(self.config.buffer_size);
        let mut summary = RunSummary::new(self.seed, queue.buffer_size());

        for index in 1..=total {
            let arrival_rate = self.schedule.rate_at(index, total);
            let sample = self.source.next_uniform();
            let kind = classify(arrival_rate, departure_rate, sample);

            let occupancy_before = queue.occupancy();
            let transition = queue.apply(kind);
            let record = TraceRecord::new(index, queue.occupancy(), queue.dropped());

            writer.write_record(&record)?;
            summary.record(transition, &queue);

            if !self.observers.is_empty() {
                let event = SimulatedEvent {
                    index,
                    total_events: total,
                    arrival_rate,
                    arrival_probability: arrival_probability(arrival_rate, departure_rate),
                    sample,
                    kind,
                    occupancy_before,
                    transition,
                    record,
                };
                for observer in &mut self.observers {
                    observer.on_event(&event);
                }
            }
        }

        for observer in &mut self.observers {
            observer.on_complete(&summary);
        }

        tracing::info!(
            final_queue_length = summary.final_occupancy,
            total_dropped = summary.dropped,
            peak_queue_length = summary.peak_occupancy,
            "Simulation complete"
        );

        Ok(summary)
    }
}

/// Runs one simulation straight into the trace file named by `output`.
///
/// The configuration is validated before the file is created.
///
/// # Errors
///
/// - `QsimError::Configuration` - If the configuration is invalid
/// - `QsimError::Trace` - If the trace file cannot be created or written
pub fn run_to_file(config: SimulationConfig, output: &OutputConfig) -> Result<RunSummary> {
    let mut simulation = Simulation::new(config)?;
    if output.narrate {
        simulation.add_observer(DebugNarrator::new());
    }

    let mut writer = TraceWriter::create(&output.trace_path)?;
    let summary = simulation.run(&mut writer)?;
    writer.finish()?;

    tracing::info!(path = %output.trace_path.display(), "Results saved");
    Ok(summary)
}
