//! Streaming analysis of trace files.

use std::io::BufRead;
use std::path::Path;

use serde::Serialize;

use crate::invariants::{InvariantViolation, TraceInvariant, standard_invariants};
use crate::trace::{TraceReader, TraceRecord};
use crate::Result;

/// Maximum number of violations kept in a summary.
const MAX_RECORDED_VIOLATIONS: usize = 100;

/// Aggregate view of one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    /// Records read
    pub records: u64,
    /// First record, if any
    pub first: Option<TraceRecord>,
    /// Last record, if any
    pub last: Option<TraceRecord>,
    /// Highest occupancy seen
    pub peak_occupancy: u64,
    /// First record with a non-zero drop count
    pub first_drop: Option<TraceRecord>,
    /// Total violations found
    pub violation_count: u64,
    /// Violations kept for reporting, oldest first
    pub violations: Vec<InvariantViolation>,
}

impl TraceSummary {
    /// Returns total drops at the end of the trace.
    pub fn total_dropped(&self) -> u64 {
        self.last.map_or(0, |r| r.dropped)
    }

    /// Check if every invariant held.
    pub fn is_consistent(&self) -> bool {
        self.violation_count == 0
    }

    /// Folds one record into the summary.
    pub fn observe(&mut self, record: TraceRecord, invariants: &mut [Box<dyn TraceInvariant>]) {
        self.records += 1;
        if self.first.is_none() {
            self.first = Some(record);
        }
        self.last = Some(record);
        self.peak_occupancy = self.peak_occupancy.max(record.occupancy);
        if self.first_drop.is_none() && record.dropped > 0 {
            self.first_drop = Some(record);
        }

        for invariant in invariants.iter_mut() {
            if let Err(violation) = invariant.check(&record) {
                self.violation_count += 1;
                if self.violations.len() < MAX_RECORDED_VIOLATIONS {
                    tracing::warn!(%violation, "Trace invariant violated");
                    self.violations.push(violation);
                }
            }
        }
    }

    /// Summarizes every record produced by `reader`.
    ///
    /// # Errors
    ///
    /// - `QsimError::Trace` - If a line cannot be read or parsed
    pub fn from_reader<R: BufRead>(
        reader: TraceReader<R>,
        buffer_size: Option<u64>,
    ) -> Result<Self> {
        let mut invariants = standard_invariants(buffer_size);
        let mut summary = Self::default();

        for record in reader {
            summary.observe(record?, &mut invariants);
        }

        tracing::debug!(
            records = summary.records,
            violations = summary.violation_count,
            "Trace analyzed"
        );
        Ok(summary)
    }

    /// Summarizes the trace file at `path`.
    ///
    /// # Errors
    ///
    /// - `QsimError::Trace` - If the file cannot be opened, read or parsed
    pub fn from_path(path: impl AsRef<Path>, buffer_size: Option<u64>) -> Result<Self> {
        Self::from_reader(TraceReader::open(path)?, buffer_size)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Total events read: {}\n", self.records));

        if let (Some(first), Some(last)) = (self.first, self.last) {
            summary.push_str(&format!("Initial queue length: {}\n", first.occupancy));
            summary.push_str(&format!("Final queue length: {}\n", last.occupancy));
            summary.push_str(&format!("Initial dropped packets: {}\n", first.dropped));
            summary.push_str(&format!("Final dropped packets: {}\n", last.dropped));
            summary.push_str(&format!("Max queue length: {}\n", self.peak_occupancy));
        }

        match self.first_drop {
            Some(record) => summary.push_str(&format!(
                "First packet drop at event {} (queue length {})\n",
                record.index, record.occupancy
            )),
            None => summary.push_str("No packets dropped\n"),
        }

        if !self.violations.is_empty() {
            summary.push_str(&format!(
                "\nInvariant violations: {}\n",
                self.violation_count
            ));
            for violation in &self.violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }
}
