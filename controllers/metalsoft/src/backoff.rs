//! # Fibonacci Backoff
//!
//! Progressive requeue delays for failed reconciles. The sequence grows more
//! slowly than exponential backoff, so a provider hiccup is retried quickly
//! while a persistent failure settles at the ceiling.
//!
//! With the controller defaults: 5s, 5s, 10s, 15s, 25s, 40s, ... capped at 5m.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting at `min` and capped
/// at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff (first two values, and the value after reset)
    min: Duration,
    /// Previous backoff value
    prev: Duration,
    /// Current backoff value
    current: Duration,
    /// Maximum backoff value
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min.min(max),
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Largest delay this backoff will ever return
    pub fn ceiling(&self) -> Duration {
        self.max
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min.min(self.max);
    }
}
