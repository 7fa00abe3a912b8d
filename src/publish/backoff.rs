use serde::Deserialize;
use std::time::Duration;

/// Exponential backoff knobs for the publish transport, loaded from the
/// `[backoff]` config table.
///
/// `max_elapsed_ms` is a cumulative budget across all sleeps for one
/// delivery; `0` disables retries entirely (single attempt).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffPolicy {
    /// First retry delay in milliseconds.
    pub initial_interval_ms: u64,
    /// Growth factor applied after each sleep.
    pub multiplier: f64,
    /// Ceiling for a single delay in milliseconds.
    pub max_interval_ms: u64,
    /// Total sleep budget in milliseconds. 0 = no retries.
    pub max_elapsed_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 2.0,
            max_interval_ms: 30_000,
            max_elapsed_ms: 60_000,
        }
    }
}

/// Per-delivery retry state. Created fresh for each publish call and
/// discarded when the call resolves.
pub struct Backoff {
    policy: BackoffPolicy,
    current_ms: u64,
    elapsed_ms: u64,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        let current_ms = policy.initial_interval_ms;
        Self {
            policy,
            current_ms,
            elapsed_ms: 0,
        }
    }

    /// Returns the next delay to sleep, or `None` when the budget is spent.
    ///
    /// A delay that would push the cumulative total past `max_elapsed_ms`
    /// is not granted; the caller should resolve the delivery as failed.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.policy.max_elapsed_ms == 0 {
            return None;
        }
        if self
            .elapsed_ms
            .saturating_add(self.current_ms)
            > self.policy.max_elapsed_ms
        {
            return None;
        }

        let delay = self.current_ms;
        self.elapsed_ms = self.elapsed_ms.saturating_add(delay);

        let grown = (self.current_ms as f64 * self.policy.multiplier) as u64;
        self.current_ms = grown.min(self.policy.max_interval_ms);

        Some(Duration::from_millis(delay))
    }
}
