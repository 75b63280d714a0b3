use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct WatchdogState {
    pub last_heartbeat: Instant,
    pub consecutive_health_failures: u32,
}

/// Outcome of one heartbeat check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    /// Stall detected; re-arm the poll timer and keep state.
    SoftRestart { failures: u32, elapsed: Duration },
    /// Repeated stalls; discard and recreate all engine state.
    FullRestart { elapsed: Duration },
}

impl WatchdogState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_heartbeat: now,
            consecutive_health_failures: 0,
        }
    }

    pub fn record_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }

    pub fn heartbeat_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heartbeat)
    }

    pub fn check(&mut self, now: Instant, timeout: Duration, max_failures: u32) -> HealthVerdict {
        let elapsed = self.heartbeat_age(now);
        if elapsed <= timeout {
            self.consecutive_health_failures = 0;
            return HealthVerdict::Healthy;
        }
        self.consecutive_health_failures += 1;
        if self.consecutive_health_failures >= max_failures {
            self.consecutive_health_failures = 0;
            HealthVerdict::FullRestart { elapsed }
        } else {
            HealthVerdict::SoftRestart {
                failures: self.consecutive_health_failures,
                elapsed,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthEventKind {
    SoftRestart,
    FullRestart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    StallDetected,
    Maintenance,
}

/// Reported to the surface for diagnostics whenever the watchdog restarts polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub kind: HealthEventKind,
    pub reason: RestartReason,
}
