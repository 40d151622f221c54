//! Event classification.
//!
//! Every event is an arrival with probability `λ / (λ + μ)` and a
//! departure otherwise, decided by a single uniform draw.

use serde::Serialize;

/// Kind of a simulated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A packet reaches the router
    Arrival,
    /// The router finishes transmitting a packet
    Departure,
}

impl EventKind {
    /// Returns string representation of event kind for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Arrival => "ARRIVAL",
            EventKind::Departure => "DEPARTURE",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the probability that the next event is an arrival.
///
/// Requires `departure_rate > 0`; with `arrival_rate == 0` every event is a
/// departure.
pub fn arrival_probability(arrival_rate: f64, departure_rate: f64) -> f64 {
    debug_assert!(departure_rate > 0.0, "departure rate must be positive");
    arrival_rate / (arrival_rate + departure_rate)
}

/// Classifies a uniform draw `sample` in `[0, 1)` under the given rates.
pub fn classify(arrival_rate: f64, departure_rate: f64, sample: f64) -> EventKind {
    if sample < arrival_probability(arrival_rate, departure_rate) {
        EventKind::Arrival
    } else {
        EventKind::Departure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_probability() {
        assert_eq!(arrival_probability(1.0, 1.0), 0.5);
        assert_eq!(arrival_probability(3.0, 1.0), 0.75);
        assert_eq!(arrival_probability(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_zero_sample_is_arrival_for_any_positive_rate() {
        assert_eq!(classify(0.001, 1000.0, 0.0), EventKind::Arrival);
        assert_eq!(classify(70.0, 100.0, 0.0), EventKind::Arrival);
    }

    #[test]
    fn test_sample_near_one_is_departure() {
        let sample = 1.0 - f64::EPSILON;

        assert_eq!(classify(70.0, 100.0, sample), EventKind::Departure);
        assert_eq!(classify(1000.0, 0.001, sample), EventKind::Departure);
    }

    #[test]
    fn test_zero_arrival_rate_always_departs() {
        assert_eq!(classify(0.0, 1.0, 0.0), EventKind::Departure);
        assert_eq!(classify(0.0, 1.0, 0.5), EventKind::Departure);
    }

    #[test]
    fn test_threshold_is_strict() {
        // P_arrival == 0.5, a draw exactly on the threshold departs
        assert_eq!(classify(1.0, 1.0, 0.5), EventKind::Departure);
        assert_eq!(classify(1.0, 1.0, 0.499_999), EventKind::Arrival);
    }

    #[test]
    fn test_event_kind_string_conversion() {
        assert_eq!(EventKind::Arrival.as_str(), "ARRIVAL");
        assert_eq!(EventKind::Departure.to_string(), "DEPARTURE");
    }
}
