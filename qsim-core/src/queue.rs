//! Bounded queue state machine.

use serde::Serialize;

use crate::generator::EventKind;

/// Transition taken by the queue for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Arrival with free space, occupancy grew by one
    Enqueued,
    /// Arrival at a full buffer, packet lost
    Dropped,
    /// Departure from a non-empty queue, occupancy shrank by one
    Dequeued,
    /// Departure from an empty queue, nothing changed
    Idle,
}

impl Transition {
    /// Checks if this transition lost a packet.
    pub fn was_drop(self) -> bool {
        matches!(self, Self::Dropped)
    }
}

/// Occupancy and drop counters of one bounded queue.
///
/// Invariants: `occupancy <= buffer_size`, `dropped` never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueState {
    occupancy: u64,
    dropped: u64,
    buffer_size: u64,
}

impl QueueState {
    /// Creates an empty queue holding at most `buffer_size` packets.
    pub fn new(buffer_size: u64) -> Self {
        Self {
            occupancy: 0,
            dropped: 0,
            buffer_size,
        }
    }

    /// Returns packets currently held.
    pub fn occupancy(&self) -> u64 {
        self.occupancy
    }

    /// Returns packets dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Returns the buffer capacity.
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    /// Check if another arrival would be dropped.
    pub fn is_full(&self) -> bool {
        self.occupancy >= self.buffer_size
    }

    /// Check if the queue holds no packets.
    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Applies one classified event and returns the transition taken.
    pub fn apply(&mut self, kind: EventKind) -> Transition {
        match kind {
            EventKind::Arrival if self.is_full() => {
                self.dropped += 1;
                Transition::Dropped
            }
            EventKind::Arrival => {
                self.occupancy += 1;
                Transition::Enqueued
            }
            EventKind::Departure if self.is_empty() => Transition::Idle,
            EventKind::Departure => {
                self.occupancy -= 1;
                Transition::Dequeued
            }
        }
    }
}
