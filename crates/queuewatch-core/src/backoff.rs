use serde::{Deserialize, Serialize};

/// Lower bound for the poll interval.
pub const MIN_INTERVAL_MS: u64 = 10_000;
/// Upper bound for the poll interval.
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Inclusive bounds the poll interval is kept within.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalBounds {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min_ms: MIN_INTERVAL_MS,
            max_ms: MAX_INTERVAL_MS,
        }
    }
}

impl IntervalBounds {
    pub fn clamp(&self, interval_ms: u64) -> u64 {
        interval_ms.clamp(self.min_ms, self.max_ms)
    }
}

/// Interval after a rate-limit response: doubled, capped at the maximum.
pub fn backoff_interval(current_ms: u64, bounds: IntervalBounds) -> u64 {
    bounds.clamp(current_ms.saturating_mul(2))
}

/// Interval after recovering from rate limiting: x0.8, floored at the minimum.
pub fn decay_interval(current_ms: u64, bounds: IntervalBounds) -> u64 {
    bounds.clamp(current_ms.saturating_mul(4) / 5)
}
