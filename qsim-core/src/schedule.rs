//! Arrival-rate schedules.
//!
//! A schedule maps the position of an event within a run to the arrival
//! rate in force for that event. Rates are never interpolated: a variable
//! schedule changes in instantaneous steps at fixed percentiles.

use serde::Serialize;

/// Rate used by the percentile schedule outside every listed bracket.
const FINAL_PLATEAU_RATE: f64 = 70.0;

/// Percentile brackets as `(upper bound in percent, rate)`.
///
/// Tested in ascending order with an inclusive upper bound, first match
/// wins. An event sitting exactly on a bound belongs to the lower bracket.
const PERCENTILE_BRACKETS: [(u64, f64); 4] = [(10, 70.0), (70, 200.0), (80, 130.0), (90, 120.0)];

/// Arrival-rate schedule for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RateSchedule {
    /// Same rate for every event
    Constant {
        /// Arrival rate applied to every event
        rate: f64,
    },
    /// Load burst followed by decay, stepped by position in the run
    Percentile,
}

impl RateSchedule {
    /// Returns the arrival rate for event `index` (1-based) of `total`.
    ///
    /// `total` must be non-zero for the percentile schedule; a zero total
    /// is treated as the final plateau.
    pub fn rate_at(&self, index: u64, total: u64) -> f64 {
        match self {
            RateSchedule::Constant { rate } => *rate,
            RateSchedule::Percentile => percentile_rate(index, total),
        }
    }

    /// Check if the rate changes over the course of a run.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Percentile)
    }
}

/// Returns the position of `index` within a run of `total` events, in percent.
pub fn position_percent(index: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * index as f64 / total as f64
}

fn percentile_rate(index: u64, total: u64) -> f64 {
    if total == 0 {
        return FINAL_PLATEAU_RATE;
    }

    // percentage <= bound  <=>  100 * index <= bound * total, exact in integers
    let scaled_index = u128::from(index) * 100;
    PERCENTILE_BRACKETS
        .iter()
        .find(|(bound, _)| scaled_index <= u128::from(*bound) * u128::from(total))
        .map_or(FINAL_PLATEAU_RATE, |(_, rate)| *rate)
}

impl std::fmt::Display for RateSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant { rate } => write!(f, "{rate}"),
            Self::Percentile => write!(f, "variable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule_ignores_position() {
        let schedule = RateSchedule::Constant { rate: 42.5 };

        assert_eq!(schedule.rate_at(1, 1000), 42.5);
        assert_eq!(schedule.rate_at(500, 1000), 42.5);
        assert_eq!(schedule.rate_at(1000, 1000), 42.5);
        assert!(!schedule.is_variable());
    }

    #[test]
    fn test_percentile_boundaries_fall_into_lower_bracket() {
        let schedule = RateSchedule::Percentile;

        assert_eq!(schedule.rate_at(100, 1000), 70.0);
        assert_eq!(schedule.rate_at(101, 1000), 200.0);
        assert_eq!(schedule.rate_at(700, 1000), 200.0);
        assert_eq!(schedule.rate_at(701, 1000), 130.0);
        assert_eq!(schedule.rate_at(800, 1000), 130.0);
        assert_eq!(schedule.rate_at(801, 1000), 120.0);
        assert_eq!(schedule.rate_at(900, 1000), 120.0);
        assert_eq!(schedule.rate_at(901, 1000), 70.0);
    }

    #[test]
    fn test_percentile_first_and_last_event() {
        let schedule = RateSchedule::Percentile;

        assert_eq!(schedule.rate_at(1, 1000), 70.0);
        assert_eq!(schedule.rate_at(1000, 1000), 70.0);
        // A single-event run sits at 100%
        assert_eq!(schedule.rate_at(1, 1), 70.0);
    }

    #[test]
    fn test_percentile_boundaries_with_uneven_total() {
        let schedule = RateSchedule::Percentile;

        // 3 * 100 / 30 == 10 exactly, 4 * 100 / 30 == 13.3
        assert_eq!(schedule.rate_at(3, 30), 70.0);
        assert_eq!(schedule.rate_at(4, 30), 200.0);
        // 21 * 100 / 30 == 70 exactly
        assert_eq!(schedule.rate_at(21, 30), 200.0);
        assert_eq!(schedule.rate_at(22, 30), 130.0);
    }

    #[test]
    fn test_percentile_schedule_is_step_shaped() {
        let schedule = RateSchedule::Percentile;
        let rates: Vec<f64> = (1..=10).map(|i| schedule.rate_at(i * 100, 1000)).collect();

        assert_eq!(
            rates,
            vec![70.0, 200.0, 200.0, 200.0, 200.0, 200.0, 200.0, 130.0, 120.0, 70.0]
        );
        assert!(schedule.is_variable());
    }

    #[test]
    fn test_position_percent() {
        assert_eq!(position_percent(100, 1000), 10.0);
        assert_eq!(position_percent(1, 4), 25.0);
        assert_eq!(position_percent(1, 0), 100.0);
    }

    #[test]
    fn test_schedule_display() {
        assert_eq!(RateSchedule::Constant { rate: 70.0 }.to_string(), "70");
        assert_eq!(RateSchedule::Percentile.to_string(), "variable");
    }
}
