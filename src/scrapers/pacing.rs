//! Randomized pacing between requests.
//!
//! All randomness used by the fetcher (user agent choice and post-request
//! delay) goes through [`RandomSource`], so tests can pin the values.

use std::time::Duration;

/// Inclusive range the post-request delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Build a range, swapping the bounds if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_millis(3_000, 10_000)
    }
}

/// Source of randomness for identity rotation and pacing.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&self, len: usize) -> usize;

    /// Uniform duration within `range`.
    fn delay(&self, range: &DelayRange) -> Duration;
}

/// Thread-local RNG backed source used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::random_range(0..len)
    }

    fn delay(&self, range: &DelayRange) -> Duration {
        let min_ms = range.min().as_millis() as u64;
        let max_ms = range.max().as_millis() as u64;
        if min_ms == max_ms {
            return range.min();
        }
        Duration::from_millis(rand::random_range(min_ms..=max_ms))
    }
}

/// Deterministic source returning pinned values.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    index: usize,
    delay: Duration,
}

impl FixedRandom {
    pub fn new(index: usize, delay: Duration) -> Self {
        Self { index, delay }
    }
}

impl RandomSource for FixedRandom {
    fn index(&self, len: usize) -> usize {
        self.index % len.max(1)
    }

    fn delay(&self, _range: &DelayRange) -> Duration {
        self.delay
    }
}
