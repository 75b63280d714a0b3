use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::{IntervalBounds, MAX_INTERVAL_MS, MIN_INTERVAL_MS};
use crate::error::ConfigError;

/// Timing knobs for the polling engine and its watchdog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Heartbeat older than this at a health check counts as a stall.
    pub heartbeat_timeout_ms: u64,
    pub health_check_period_ms: u64,
    pub maintenance_period_ms: u64,
    pub heartbeat_emit_period_ms: u64,
    /// Consecutive stalls that escalate a soft restart into a full restart.
    pub max_health_failures: u32,
    pub fetch_timeout_ms: u64,
    /// Delay of the one-shot re-check armed after every reschedule.
    pub recheck_delay_ms: u64,
    /// Delay of the one-shot re-check armed on return to the foreground.
    pub foreground_recheck_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_INTERVAL_MS,
            max_interval_ms: MAX_INTERVAL_MS,
            heartbeat_timeout_ms: 30_000,
            health_check_period_ms: 60_000,
            maintenance_period_ms: 3_600_000,
            heartbeat_emit_period_ms: 5_000,
            max_health_failures: 3,
            fetch_timeout_ms: 15_000,
            recheck_delay_ms: 500,
            foreground_recheck_delay_ms: 1_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_interval_ms == 0 {
            return Err(ConfigError::ZeroMinInterval);
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(ConfigError::InvertedBounds {
                min_ms: self.min_interval_ms,
                max_ms: self.max_interval_ms,
            });
        }
        let periods = [
            ("heartbeat_timeout_ms", self.heartbeat_timeout_ms),
            ("health_check_period_ms", self.health_check_period_ms),
            ("maintenance_period_ms", self.maintenance_period_ms),
            ("heartbeat_emit_period_ms", self.heartbeat_emit_period_ms),
            ("fetch_timeout_ms", self.fetch_timeout_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::ZeroPeriod(name));
            }
        }
        if self.max_health_failures == 0 {
            return Err(ConfigError::ZeroHealthFailures);
        }
        Ok(())
    }

    pub fn bounds(&self) -> IntervalBounds {
        IntervalBounds {
            min_ms: self.min_interval_ms,
            max_ms: self.max_interval_ms,
        }
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn health_check_period(&self) -> Duration {
        Duration::from_millis(self.health_check_period_ms)
    }

    pub fn maintenance_period(&self) -> Duration {
        Duration::from_millis(self.maintenance_period_ms)
    }

    pub fn heartbeat_emit_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_emit_period_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn recheck_delay(&self) -> Duration {
        Duration::from_millis(self.recheck_delay_ms)
    }

    pub fn foreground_recheck_delay(&self) -> Duration {
        Duration::from_millis(self.foreground_recheck_delay_ms)
    }
}
