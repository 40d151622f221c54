//! Invariant checking over trace records.
//!
//! Invariants are stateful: they see records one at a time, in file order,
//! so a trace of any length is checked in constant memory.

use std::fmt;

use serde::Serialize;

use crate::trace::TraceRecord;

/// Violation of a trace invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Event index of the offending record
    pub index: u64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at event {}: {}",
            self.invariant, self.index, self.description
        )
    }
}

/// Trait for checking trace invariants.
pub trait TraceInvariant {
    /// Checks the next record of the trace.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&mut self, record: &TraceRecord) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    /// Builds a violation of this invariant.
    fn violation(&self, record: &TraceRecord, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            index: record.index,
        }
    }
}

/// Ensures event indices run 1, 2, 3, ... without gaps or repeats.
#[derive(Debug)]
pub struct SequentialIndexInvariant {
    expected: u64,
}

impl Default for SequentialIndexInvariant {
    fn default() -> Self {
        Self { expected: 1 }
    }
}

impl TraceInvariant for SequentialIndexInvariant {
    fn check(&mut self, record: &TraceRecord) -> Result<(), InvariantViolation> {
        let expected = self.expected;
        // Resynchronize so one gap is reported once
        self.expected = record.index.saturating_add(1);

        if record.index != expected {
            return Err(self.violation(
                record,
                format!("expected event {expected}, found {}", record.index),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SequentialIndex"
    }
}

/// Ensures occupancy stays within the buffer.
#[derive(Debug)]
pub struct OccupancyBoundInvariant {
    buffer_size: u64,
}

impl OccupancyBoundInvariant {
    /// Creates invariant for a buffer of `buffer_size` packets.
    pub fn new(buffer_size: u64) -> Self {
        Self { buffer_size }
    }
}

impl TraceInvariant for OccupancyBoundInvariant {
    fn check(&mut self, record: &TraceRecord) -> Result<(), InvariantViolation> {
        if record.occupancy > self.buffer_size {
            return Err(self.violation(
                record,
                format!(
                    "occupancy {} exceeds buffer size {}",
                    record.occupancy, self.buffer_size
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "OccupancyBound"
    }
}

/// Ensures each event changes the queue by exactly one legal transition.
///
/// Occupancy moves by at most one packet per event; the drop count never
/// decreases, grows by at most one, and only grows while occupancy stays
/// put at a full buffer.
#[derive(Debug, Default)]
pub struct TransitionInvariant {
    previous: Option<TraceRecord>,
    buffer_size: Option<u64>,
}

impl TransitionInvariant {
    /// Creates invariant, optionally knowing the buffer size.
    pub fn new(buffer_size: Option<u64>) -> Self {
        Self {
            previous: None,
            buffer_size,
        }
    }

    fn check_step(
        &self,
        previous: &TraceRecord,
        record: &TraceRecord,
    ) -> Result<(), InvariantViolation> {
        if record.dropped < previous.dropped {
            return Err(self.violation(
                record,
                format!(
                    "drop count decreased from {} to {}",
                    previous.dropped, record.dropped
                ),
            ));
        }

        let new_drops = record.dropped - previous.dropped;
        if new_drops > 1 {
            return Err(self.violation(
                record,
                format!("{new_drops} drops in a single event"),
            ));
        }

        if previous.occupancy.abs_diff(record.occupancy) > 1 {
            return Err(self.violation(
                record,
                format!(
                    "occupancy jumped from {} to {}",
                    previous.occupancy, record.occupancy
                ),
            ));
        }

        if new_drops == 1 {
            if record.occupancy != previous.occupancy {
                return Err(self.violation(
                    record,
                    "drop recorded while occupancy changed".to_string(),
                ));
            }
            if let Some(buffer_size) = self.buffer_size {
                if previous.occupancy != buffer_size {
                    return Err(self.violation(
                        record,
                        format!(
                            "drop recorded with occupancy {} below buffer size {buffer_size}",
                            previous.occupancy
                        ),
                    ));
                }
            }
        }

        Ok(())
    }

    fn check_first(&self, record: &TraceRecord) -> Result<(), InvariantViolation> {
        // The queue starts empty with no drops
        let first_step = record.occupancy.checked_add(record.dropped);
        if first_step.is_none_or(|total| total > 1) {
            return Err(self.violation(
                record,
                format!(
                    "first event cannot reach occupancy {} with {} drops",
                    record.occupancy, record.dropped
                ),
            ));
        }
        Ok(())
    }
}

impl TraceInvariant for TransitionInvariant {
    fn check(&mut self, record: &TraceRecord) -> Result<(), InvariantViolation> {
        let result = match &self.previous {
            Some(previous) => self.check_step(previous, record),
            None => self.check_first(record),
        };
        self.previous = Some(*record);
        result
    }

    fn name(&self) -> &str {
        "Transition"
    }
}

/// Returns the standard invariant set for a trace.
///
/// The occupancy bound is only checked when the buffer size is known.
pub fn standard_invariants(buffer_size: Option<u64>) -> Vec<Box<dyn TraceInvariant>> {
    let mut invariants: Vec<Box<dyn TraceInvariant>> = vec![
        Box::new(SequentialIndexInvariant::default()),
        Box::new(TransitionInvariant::new(buffer_size)),
    ];
    if let Some(buffer_size) = buffer_size {
        invariants.push(Box::new(OccupancyBoundInvariant::new(buffer_size)));
    }
    invariants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_all(invariant: &mut dyn TraceInvariant, records: &[(u64, u64, u64)]) -> Vec<u64> {
        records
            .iter()
            .map(|&(i, o, d)| TraceRecord::new(i, o, d))
            .filter_map(|r| invariant.check(&r).err())
            .map(|v| v.index)
            .collect()
    }

    #[test]
    fn test_sequential_index_reports_gap_once() {
        let mut invariant = SequentialIndexInvariant::default();

        let violations = check_all(&mut invariant, &[(1, 0, 0), (2, 0, 0), (4, 0, 0), (5, 0, 0)]);

        assert_eq!(violations, vec![4]);
    }

    #[test]
    fn test_sequential_index_requires_start_at_one() {
        let mut invariant = SequentialIndexInvariant::default();

        assert_eq!(check_all(&mut invariant, &[(0, 0, 0), (1, 0, 0)]), vec![0]);
    }

    #[test]
    fn test_sequential_index_handles_maximum_index() {
        let mut invariant = SequentialIndexInvariant::default();

        let violations = check_all(&mut invariant, &[(u64::MAX, 0, 0), (u64::MAX, 0, 0)]);

        assert_eq!(violations, vec![u64::MAX, u64::MAX]);
    }

    #[test]
    fn test_occupancy_bound() {
        let mut invariant = OccupancyBoundInvariant::new(2);

        let violations = check_all(&mut invariant, &[(1, 1, 0), (2, 2, 0), (3, 3, 0)]);

        assert_eq!(violations, vec![3]);
    }

    #[test]
    fn test_transition_accepts_legal_trace() {
        let mut invariant = TransitionInvariant::new(Some(1));

        let violations = check_all(
            &mut invariant,
            &[(1, 1, 0), (2, 1, 1), (3, 0, 1), (4, 1, 1), (5, 0, 1)],
        );

        assert!(violations.is_empty());
    }

    #[test]
    fn test_transition_rejects_decreasing_drops() {
        let mut invariant = TransitionInvariant::new(None);

        let violations = check_all(&mut invariant, &[(1, 0, 1), (2, 0, 0)]);

        assert_eq!(violations, vec![2]);
    }

    #[test]
    fn test_transition_rejects_drop_below_capacity() {
        let mut invariant = TransitionInvariant::new(Some(3));

        let violations = check_all(&mut invariant, &[(1, 1, 0), (2, 1, 1)]);

        assert_eq!(violations, vec![2]);
    }

    #[test]
    fn test_transition_rejects_jumps() {
        let mut invariant = TransitionInvariant::new(None);

        let violations = check_all(&mut invariant, &[(1, 1, 0), (2, 3, 0), (3, 3, 2)]);

        assert_eq!(violations, vec![2, 3]);
    }

    #[test]
    fn test_transition_rejects_saturated_first_record() {
        let mut invariant = TransitionInvariant::new(None);

        let violations = check_all(&mut invariant, &[(1, u64::MAX, 1)]);

        assert_eq!(violations, vec![1]);
    }

    #[test]
    fn test_violation_display() {
        let violation = InvariantViolation {
            invariant: "OccupancyBound".to_string(),
            description: "occupancy 3 exceeds buffer size 2".to_string(),
            index: 7,
        };

        assert_eq!(
            violation.to_string(),
            "Invariant 'OccupancyBound' violated at event 7: occupancy 3 exceeds buffer size 2"
        );
    }

    #[test]
    fn test_standard_invariants_include_bound_only_when_known() {
        assert_eq!(standard_invariants(None).len(), 2);
        assert_eq!(standard_invariants(Some(4)).len(), 3);
    }
}
