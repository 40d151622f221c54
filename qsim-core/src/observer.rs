//! Per-event observers.
//!
//! Observers see every event after the queue has been updated. They never
//! influence the simulation; narration and progress reporting live here so
//! the state machine stays free of logging concerns.

use crate::driver::RunSummary;
use crate::generator::EventKind;
use crate::queue::Transition;
use crate::schedule::position_percent;
use crate::trace::TraceRecord;

/// Events narrated in detail at the start of a run.
const NARRATED_PREFIX: u64 = 20;

/// Interval between detailed narrations after the prefix.
const NARRATION_INTERVAL: u64 = 100;

/// Interval between status lines.
const STATUS_INTERVAL: u64 = 1000;

/// Everything known about one event once it has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedEvent {
    /// 1-based event index
    pub index: u64,
    /// Number of events in the run
    pub total_events: u64,
    /// Arrival rate in force for this event
    pub arrival_rate: f64,
    /// Probability that this event was an arrival
    pub arrival_probability: f64,
    /// Uniform draw that classified the event
    pub sample: f64,
    /// Classification of the event
    pub kind: EventKind,
    /// Occupancy before the event was applied
    pub occupancy_before: u64,
    /// Transition taken by the queue
    pub transition: Transition,
    /// State after the event
    pub record: TraceRecord,
}

impl SimulatedEvent {
    /// Returns how far into the run this event sits, in percent.
    pub fn position_percent(&self) -> f64 {
        position_percent(self.index, self.total_events)
    }
}

/// Callback invoked by the driver after each event.
pub trait EventObserver {
    /// Called once per event, in index order.
    fn on_event(&mut self, event: &SimulatedEvent);

    /// Called once after the last event.
    fn on_complete(&mut self, _summary: &RunSummary) {}
}

impl<F: FnMut(&SimulatedEvent)> EventObserver for F {
    fn on_event(&mut self, event: &SimulatedEvent) {
        self(event)
    }
}

/// Logs a running commentary of the simulation at debug level.
///
/// The first 20 events and every 100th event afterwards are narrated in
/// detail; a status line is logged every 1000 events.
#[derive(Debug, Default)]
pub struct DebugNarrator {
    narrated: u64,
}

impl DebugNarrator {
    /// Creates a narrator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events narrated in detail so far.
    pub fn narrated(&self) -> u64 {
        self.narrated
    }

    /// Check if event `index` is narrated in detail.
    pub fn narrates(index: u64) -> bool {
        index <= NARRATED_PREFIX || index % NARRATION_INTERVAL == 0
    }

    /// Check if a status line follows event `index`.
    pub fn reports_status(index: u64) -> bool {
        index % STATUS_INTERVAL == 0
    }
}

impl EventObserver for DebugNarrator {
    fn on_event(&mut self, event: &SimulatedEvent) {
        if Self::narrates(event.index) {
            self.narrated += 1;
            let outcome = match event.transition {
                Transition::Enqueued => {
                    format!("queue increased to {}", event.record.occupancy)
                }
                Transition::Dropped => format!(
                    "packet dropped (queue full), total drops {}",
                    event.record.dropped
                ),
                Transition::Dequeued => {
                    format!("queue decreased to {}", event.record.occupancy)
                }
                Transition::Idle => "no packets to depart".to_string(),
            };
            tracing::debug!(
                event = event.index,
                lambda = event.arrival_rate,
                queue_before = event.occupancy_before,
                "{}: {} ({:.1}% of run, p_arrival={:.3}, y={:.3})",
                event.kind,
                outcome,
                event.position_percent(),
                event.arrival_probability,
                event.sample
            );
        }

        if Self::reports_status(event.index) {
            tracing::info!(
                event = event.index,
                queue_length = event.record.occupancy,
                total_drops = event.record.dropped,
                "Status"
            );
        }
    }

    fn on_complete(&mut self, summary: &RunSummary) {
        tracing::debug!(
            narrated = self.narrated,
            events = summary.events,
            "Narration finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(index: u64) -> SimulatedEvent {
        SimulatedEvent {
            index,
            total_events: 1000,
            arrival_rate: 70.0,
            arrival_probability: 0.7,
            sample: 0.1,
            kind: EventKind::Arrival,
            occupancy_before: 0,
            transition: Transition::Enqueued,
            record: TraceRecord::new(index, 1, 0),
        }
    }

    #[test]
    fn test_narration_cadence() {
        assert!(DebugNarrator::narrates(1));
        assert!(DebugNarrator::narrates(20));
        assert!(!DebugNarrator::narrates(21));
        assert!(!DebugNarrator::narrates(150));
        assert!(DebugNarrator::narrates(200));
    }

    #[test]
    fn test_status_cadence() {
        assert!(!DebugNarrator::reports_status(999));
        assert!(DebugNarrator::reports_status(1000));
        assert!(DebugNarrator::reports_status(3000));
    }

    #[test]
    fn test_narrator_counts_detailed_events() {
        let mut narrator = DebugNarrator::new();

        for index in 1..=1000 {
            narrator.on_event(&event(index));
        }

        // 20 prefix events, then 100, 200, ..., 1000
        assert_eq!(narrator.narrated(), 30);
    }

    #[test]
    fn test_event_position_in_run() {
        assert_eq!(event(1).position_percent(), 0.1);
        assert_eq!(event(250).position_percent(), 25.0);
        assert_eq!(event(1000).position_percent(), 100.0);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |e: &SimulatedEvent| seen.push(e.index);
            observer.on_event(&event(1));
            observer.on_event(&event(2));
        }

        assert_eq!(seen, vec![1, 2]);
    }
}
