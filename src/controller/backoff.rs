//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliation passes. The delay grows along the
//! Fibonacci sequence (slower than exponential) and is capped at a maximum.
//!
//! With a 5s minimum and 300s maximum the sequence is
//! 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s, 170s, 275s, 300s, 300s, ...
//!
//! ## Usage
//!
//! ```rust
//! use secret_rotation_monitor::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(5, 300);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 10);
//! assert_eq!(backoff.next_backoff_seconds(), 15);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting from `min_secs` and
/// never exceeding `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff in seconds (for reset)
    min_secs: u64,
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new backoff with minimum and maximum delays in seconds
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs.min(max_secs),
            max_secs,
        }
    }

    /// Get the next delay in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        let next = self.prev_secs.saturating_add(self.current_secs);

        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);

        result
    }

    /// Get the next delay as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset to the initial state after a successful pass
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs.min(self.max_secs);
    }
}

/// Independent backoff state per resource
#[derive(Debug)]
pub struct BackoffTracker<K> {
    min_secs: u64,
    max_secs: u64,
    states: Mutex<HashMap<K, FibonacciBackoff>>,
}

impl<K: Eq + Hash + Clone> BackoffTracker<K> {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Next delay for `key`, advancing its sequence
    pub fn next_backoff(&self, key: &K) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.clone())
            .or_insert_with(|| FibonacciBackoff::new(self.min_secs, self.max_secs))
            .next_backoff()
    }

    /// Forget the state for `key` so its next failure starts from the minimum
    pub fn reset(&self, key: &K) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Drop state for every key `keep` rejects; returns how many were dropped
    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) -> usize {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let before = states.len();
        states.retain(|key, _| keep(key));
        before - states.len()
    }

    /// Number of keys currently backing off
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The smallest delay this tracker hands out
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(5, 300);

        let sequence: Vec<u64> = (0..12).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(
            sequence,
            vec![5, 5, 10, 15, 25, 40, 65, 105, 170, 275, 300, 300]
        );
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);

        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 2);
        assert_eq!(backoff.next_backoff_seconds(), 3);

        backoff.reset();

        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 2);
    }

    #[test]
    fn test_min_above_max_is_capped() {
        let mut backoff = FibonacciBackoff::new(50, 10);
        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
    }

    #[test]
    fn test_tracker_keeps_per_resource_state() {
        let tracker = BackoffTracker::new(1, 10);
        let a = "ns1/a".to_string();
        let b = "ns1/b".to_string();

        assert_eq!(tracker.next_backoff(&a), Duration::from_secs(1));
        assert_eq!(tracker.next_backoff(&a), Duration::from_secs(1));
        assert_eq!(tracker.next_backoff(&a), Duration::from_secs(2));

        // b starts fresh
        assert_eq!(tracker.next_backoff(&b), Duration::from_secs(1));

        tracker.reset(&a);
        assert_eq!(tracker.next_backoff(&a), Duration::from_secs(1));
        assert_eq!(tracker.next_backoff(&b), Duration::from_secs(1));
        assert_eq!(tracker.next_backoff(&b), Duration::from_secs(2));
    }

    #[test]
    fn test_tracker_retain_forgets_rejected_keys() {
        let tracker = BackoffTracker::new(1, 10);
        let a = "ns1/a".to_string();
        let b = "ns1/b".to_string();
        tracker.next_backoff(&a);
        tracker.next_backoff(&a);
        tracker.next_backoff(&b);
        assert_eq!(tracker.len(), 2);

        assert_eq!(tracker.retain(|key| key == &a), 1);
        assert_eq!(tracker.len(), 1);
        // a keeps its place in the sequence
        assert_eq!(tracker.next_backoff(&a), Duration::from_secs(2));
        assert_eq!(tracker.next_backoff(&b), Duration::from_secs(1));
    }
}
