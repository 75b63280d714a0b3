use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backoff::{backoff_interval, decay_interval, IntervalBounds};
use crate::error::FetchError;
use crate::snapshot::{diff, Snapshot, SnapshotDiff};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    Idle,
    Polling,
    Backoff,
}

#[derive(Clone, Debug)]
pub struct PollState {
    pub current_interval_ms: u64,
    pub consecutive_rate_limit_hits: u32,
    pub consecutive_failures: u32,
    pub last_success: Option<Instant>,
    pub initialized: bool,
}

impl PollState {
    pub fn new(bounds: IntervalBounds) -> Self {
        Self {
            current_interval_ms: bounds.min_ms,
            consecutive_rate_limit_hits: 0,
            consecutive_failures: 0,
            last_success: None,
            initialized: false,
        }
    }
}

/// What a completed fetch changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// New interval when the cadence changed and the timer must be re-armed.
    pub rescheduled_ms: Option<u64>,
    /// The fetch seeded the baseline snapshot (cold start).
    pub seeded: bool,
    /// Membership change against the previous snapshot, after cold start.
    pub diff: Option<SnapshotDiff>,
}

/// Owns the poll cadence, the current snapshot and the per-poll counters.
#[derive(Clone, Debug)]
pub struct PollScheduler {
    bounds: IntervalBounds,
    state: PollState,
    phase: PollPhase,
    snapshot: Snapshot,
}

impl PollScheduler {
    pub fn new(bounds: IntervalBounds) -> Self {
        Self {
            bounds,
            state: PollState::new(bounds),
            phase: PollPhase::Idle,
            snapshot: Snapshot::empty(),
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn interval_ms(&self) -> u64 {
        self.state.current_interval_ms
    }

    /// Enter `Polling`. Returns false if a fetch is already in flight.
    pub fn begin_fetch(&mut self) -> bool {
        if self.phase == PollPhase::Polling {
            return false;
        }
        self.phase = PollPhase::Polling;
        true
    }

    /// Forget an in-flight fetch without applying any result.
    pub fn abandon_fetch(&mut self) {
        if self.phase == PollPhase::Polling {
            self.phase = self.resting_phase();
        }
    }

    /// Set the interval directly. Returns true if it changed.
    pub fn set_interval(&mut self, interval_ms: u64) -> bool {
        let next = self.bounds.clamp(interval_ms);
        let changed = next != self.state.current_interval_ms;
        self.state.current_interval_ms = next;
        changed
    }

    /// Swap in new bounds, clamping the current interval. Returns true if the
    /// interval moved.
    pub fn set_bounds(&mut self, bounds: IntervalBounds) -> bool {
        self.bounds = bounds;
        self.set_interval(self.state.current_interval_ms)
    }

    pub fn complete(&mut self, outcome: Result<Snapshot, FetchError>, now: Instant) -> PollReport {
        let mut report = PollReport::default();
        let current = match outcome {
            Ok(current) => current,
            Err(FetchError::RateLimited) => {
                self.state.consecutive_rate_limit_hits += 1;
                let next = backoff_interval(self.state.current_interval_ms, self.bounds);
                warn!(
                    interval_ms = next,
                    hits = self.state.consecutive_rate_limit_hits,
                    "rate limited, increasing poll interval"
                );
                if next != self.state.current_interval_ms {
                    self.state.current_interval_ms = next;
                    report.rescheduled_ms = Some(next);
                }
                self.phase = PollPhase::Backoff;
                return report;
            }
            Err(e) => {
                self.state.consecutive_failures += 1;
                warn!(
                    failures = self.state.consecutive_failures,
                    "queue fetch failed: {e}"
                );
                self.phase = self.resting_phase();
                return report;
            }
        };

        self.state.consecutive_failures = 0;
        self.state.last_success = Some(now);
        if self.state.consecutive_rate_limit_hits > 0 {
            self.state.consecutive_rate_limit_hits = 0;
            let next = decay_interval(self.state.current_interval_ms, self.bounds);
            info!(interval_ms = next, "queue api recovered, reducing poll interval");
            if next != self.state.current_interval_ms {
                self.state.current_interval_ms = next;
                report.rescheduled_ms = Some(next);
            }
        }
        self.phase = PollPhase::Idle;

        if !self.state.initialized {
            if current.is_empty() {
                info!("initial load: queue is empty, will alert on first new item");
            } else {
                info!(
                    items = current.len(),
                    "initial load: will only alert on additional items"
                );
            }
            self.snapshot = current;
            self.state.initialized = true;
            report.seeded = true;
            return report;
        }

        let change = diff(&self.snapshot, &current);
        debug!(
            tracked = current.len(),
            added = change.added.len(),
            removed = change.removed.len(),
            "poll complete"
        );
        self.snapshot = current;
        report.diff = Some(change);
        report
    }

    fn resting_phase(&self) -> PollPhase {
        if self.state.consecutive_rate_limit_hits > 0 {
            PollPhase::Backoff
        } else {
            PollPhase::Idle
        }
    }
}
