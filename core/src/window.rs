//! Sliding-window outcome tracking
//!
//! This module provides the window backends breakers record into:
//! - `InMemoryWindow`: thread-safe, count-based ring of recent outcomes
//! - `NullWindow`: no-op backend for testing and benchmarking

use crate::{Outcome, OutcomeKind};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Instant;

/// Abstract window backend for call outcomes
///
/// Rates are percentages (0-100) over the retained outcomes and are
/// undefined (`None`) until at least `minimum_calls` outcomes have been
/// recorded for the circuit.
pub trait WindowStore: Send + Sync + std::fmt::Debug {
    /// Append an outcome, evicting the oldest entry once full
    fn record(&self, circuit: &str, outcome: Outcome);

    /// Percentage of retained outcomes that are failures
    fn failure_rate(&self, circuit: &str, minimum_calls: usize) -> Option<f64>;

    /// Percentage of retained outcomes that are slow successes
    fn slow_rate(&self, circuit: &str, minimum_calls: usize) -> Option<f64>;

    /// Number of outcomes currently retained for a circuit
    fn len(&self, circuit: &str) -> usize;

    /// Drop all outcomes for a circuit
    fn clear(&self, circuit: &str);

    /// Drop all outcomes for all circuits
    fn clear_all(&self);

    /// Retained outcomes for a circuit, oldest first (limited to last N)
    fn outcome_log(&self, circuit: &str, limit: usize) -> Vec<Outcome>;

    /// Monotonic time in seconds (relative to store creation)
    fn monotonic_time(&self) -> f64;
}

/// Thread-safe in-memory ring of the most recent call outcomes
#[derive(Debug)]
pub struct InMemoryWindow {
    /// Outcome rings keyed by circuit name
    outcomes: RwLock<HashMap<String, VecDeque<Outcome>>>,
    /// Outcomes retained per circuit
    capacity: usize,
    /// Monotonic time anchor (prevents clock skew issues from NTP)
    start_time: Instant,
}

impl InMemoryWindow {
    /// Create a window with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a window retaining the most recent `capacity` outcomes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: RwLock::new(HashMap::new()),
            capacity,
            start_time: Instant::now(),
        }
    }

    fn rate_of(&self, circuit: &str, kind: OutcomeKind, minimum_calls: usize) -> Option<f64> {
        let outcomes = self.outcomes.read().unwrap();
        let ring = outcomes.get(circuit)?;
        if ring.is_empty() || ring.len() < minimum_calls {
            return None;
        }
        let count = ring.iter().filter(|o| o.kind == kind).count();
        Some(count as f64 / ring.len() as f64 * 100.0)
    }
}

impl Default for InMemoryWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowStore for InMemoryWindow {
    fn record(&self, circuit: &str, outcome: Outcome) {
        let mut outcomes = self.outcomes.write().unwrap();
        let ring = outcomes.entry(circuit.to_string()).or_default();
        ring.push_back(outcome);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    fn failure_rate(&self, circuit: &str, minimum_calls: usize) -> Option<f64> {
        self.rate_of(circuit, OutcomeKind::Failure, minimum_calls)
    }

    fn slow_rate(&self, circuit: &str, minimum_calls: usize) -> Option<f64> {
        self.rate_of(circuit, OutcomeKind::Slow, minimum_calls)
    }

    fn len(&self, circuit: &str) -> usize {
        let outcomes = self.outcomes.read().unwrap();
        outcomes.get(circuit).map(|ring| ring.len()).unwrap_or(0)
    }

    fn clear(&self, circuit: &str) {
        let mut outcomes = self.outcomes.write().unwrap();
        outcomes.remove(circuit);
    }

    fn clear_all(&self) {
        let mut outcomes = self.outcomes.write().unwrap();
        outcomes.clear();
    }

    fn outcome_log(&self, circuit: &str, limit: usize) -> Vec<Outcome> {
        let outcomes = self.outcomes.read().unwrap();
        outcomes
            .get(circuit)
            .map(|ring| {
                let start = ring.len().saturating_sub(limit);
                ring.iter().skip(start).cloned().collect()
            })
            .unwrap_or_default()
    }

    fn monotonic_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

/// No-op window backend
///
/// Discards every outcome and never defines a rate, so a breaker using it
/// stays closed no matter what is recorded. Useful for testing breaker
/// plumbing and for benchmarking without window overhead.
#[derive(Debug, Clone, Copy)]
pub struct NullWindow {
    start_time: Instant,
}

impl NullWindow {
    /// Create a new null window
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for NullWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowStore for NullWindow {
    fn record(&self, _circuit: &str, _outcome: Outcome) {
        // No-op
    }

    fn failure_rate(&self, _circuit: &str, _minimum_calls: usize) -> Option<f64> {
        None
    }

    fn slow_rate(&self, _circuit: &str, _minimum_calls: usize) -> Option<f64> {
        None
    }

    fn len(&self, _circuit: &str) -> usize {
        0
    }

    fn clear(&self, _circuit: &str) {
        // No-op
    }

    fn clear_all(&self) {
        // No-op
    }

    fn outcome_log(&self, _circuit: &str, _limit: usize) -> Vec<Outcome> {
        Vec::new()
    }

    fn monotonic_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: OutcomeKind) -> Outcome {
        Outcome {
            kind,
            timestamp: 0.0,
            duration: 0.1,
        }
    }

    #[test]
    fn test_rates_below_minimum_are_undefined() {
        let window = InMemoryWindow::with_capacity(10);

        window.record("svc", outcome(OutcomeKind::Failure));
        window.record("svc", outcome(OutcomeKind::Failure));

        assert_eq!(window.failure_rate("svc", 3), None);
        assert_eq!(window.slow_rate("svc", 3), None);
    }

    #[test]
    fn test_rates_count_their_own_kind() {
        let window = InMemoryWindow::with_capacity(10);

        window.record("svc", outcome(OutcomeKind::Success));
        window.record("svc", outcome(OutcomeKind::Failure));
        window.record("svc", outcome(OutcomeKind::Slow));
        window.record("svc", outcome(OutcomeKind::Failure));

        assert_eq!(window.failure_rate("svc", 4), Some(50.0));
        assert_eq!(window.slow_rate("svc", 4), Some(25.0));
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let window = InMemoryWindow::with_capacity(3);

        window.record("svc", outcome(OutcomeKind::Failure));
        for _ in 0..3 {
            window.record("svc", outcome(OutcomeKind::Success));
        }

        // The lone failure was the oldest entry and has been evicted
        assert_eq!(window.len("svc"), 3);
        assert_eq!(window.failure_rate("svc", 1), Some(0.0));
    }

    #[test]
    fn test_unknown_circuit_is_empty() {
        let window = InMemoryWindow::new();

        assert_eq!(window.len("missing"), 0);
        assert_eq!(window.failure_rate("missing", 0), None);
        assert!(window.outcome_log("missing", 10).is_empty());
    }

    #[test]
    fn test_clear_drops_history() {
        let window = InMemoryWindow::new();

        window.record("svc", outcome(OutcomeKind::Failure));
        assert_eq!(window.len("svc"), 1);

        window.clear("svc");
        assert_eq!(window.len("svc"), 0);
        assert_eq!(window.failure_rate("svc", 1), None);
    }

    #[test]
    fn test_clear_all_drops_every_circuit() {
        let window = InMemoryWindow::new();

        window.record("one", outcome(OutcomeKind::Success));
        window.record("two", outcome(OutcomeKind::Failure));

        window.clear_all();
        assert_eq!(window.len("one"), 0);
        assert_eq!(window.len("two"), 0);
    }

    #[test]
    fn test_outcome_log_returns_most_recent() {
        let window = InMemoryWindow::new();

        window.record("svc", outcome(OutcomeKind::Failure));
        window.record("svc", outcome(OutcomeKind::Success));
        window.record("svc", outcome(OutcomeKind::Failure));

        let log = window.outcome_log("svc", 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, OutcomeKind::Success);
        assert_eq!(log[1].kind, OutcomeKind::Failure);
    }

    #[test]
    fn test_monotonic_time_advances() {
        let window = InMemoryWindow::new();

        let time1 = window.monotonic_time();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let time2 = window.monotonic_time();

        assert!(time2 > time1);
    }

    #[test]
    fn test_null_window_discards_everything() {
        let window = NullWindow::new();

        window.record("svc", outcome(OutcomeKind::Failure));
        window.record("svc", outcome(OutcomeKind::Slow));

        assert_eq!(window.len("svc"), 0);
        assert_eq!(window.failure_rate("svc", 0), None);
        assert_eq!(window.slow_rate("svc", 0), None);
        assert!(window.outcome_log("svc", 10).is_empty());
    }

    #[test]
    fn test_null_window_monotonic_time() {
        let window = NullWindow::new();

        let time1 = window.monotonic_time();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let time2 = window.monotonic_time();

        assert!(time2 > time1);
    }
}
