use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::alert::{gate, AlertSuppression};
use crate::commands::Command;
use crate::config::EngineConfig;
use crate::events::Event;
use crate::ids::format_ids;
use crate::poll::{PollPhase, PollScheduler};
use crate::snapshot::Snapshot;
use crate::visibility::Visibility;
use crate::watchdog::{HealthEvent, HealthEventKind, HealthVerdict, RestartReason, WatchdogState};

/// Lifetime counters. Survive full restarts so diagnostics can see them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineTotals {
    pub polls: u64,
    pub fetch_failures: u64,
    pub rate_limits: u64,
    pub alerts: u64,
    pub soft_restarts: u64,
    pub full_restarts: u64,
}

/// Point-in-time view of the engine for status output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    pub phase: PollPhase,
    pub current_interval_ms: u64,
    pub consecutive_rate_limit_hits: u32,
    pub consecutive_failures: u32,
    pub consecutive_health_failures: u32,
    pub initialized: bool,
    pub tracked_items: usize,
    pub last_success_age_ms: Option<u64>,
    pub heartbeat_age_ms: u64,
    pub suppression: AlertSuppression,
    pub visibility: Visibility,
    pub totals: EngineTotals,
}

/// The polling and watchdog state machine.
///
/// All engine state lives here and is only touched through [`Engine::handle`],
/// which the runtime calls from a single task. Each call returns the effects
/// the runtime must carry out; nothing in here performs I/O.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    poll: PollScheduler,
    watchdog: WatchdogState,
    suppression: AlertSuppression,
    visibility: Visibility,
    /// Bumped on start, stop and full restart; fetch results from an older
    /// generation are dropped.
    generation: u64,
    running: bool,
    totals: EngineTotals,
}

impl Engine {
    pub fn new(config: EngineConfig, suppression: AlertSuppression, now: Instant) -> Self {
        Self {
            poll: PollScheduler::new(config.bounds()),
            watchdog: WatchdogState::new(now),
            config,
            suppression,
            visibility: Visibility::default(),
            generation: 0,
            running: false,
            totals: EngineTotals::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.poll.snapshot()
    }

    pub fn poll(&self) -> &PollScheduler {
        &self.poll
    }

    pub fn watchdog(&self) -> &WatchdogState {
        &self.watchdog
    }

    pub fn suppression(&self) -> AlertSuppression {
        self.suppression
    }

    pub fn totals(&self) -> EngineTotals {
        self.totals
    }

    pub fn status(&self, now: Instant) -> EngineStatus {
        let state = self.poll.state();
        EngineStatus {
            running: self.running,
            phase: self.poll.phase(),
            current_interval_ms: state.current_interval_ms,
            consecutive_rate_limit_hits: state.consecutive_rate_limit_hits,
            consecutive_failures: state.consecutive_failures,
            consecutive_health_failures: self.watchdog.consecutive_health_failures,
            initialized: state.initialized,
            tracked_items: self.poll.snapshot().len(),
            last_success_age_ms: state
                .last_success
                .map(|t| millis(now.saturating_duration_since(t))),
            heartbeat_age_ms: millis(self.watchdog.heartbeat_age(now)),
            suppression: self.suppression,
            visibility: self.visibility,
            totals: self.totals,
        }
    }

    pub fn handle(&mut self, event: Event, now: Instant) -> Vec<Command> {
        match event {
            Event::Start => self.start(now),
            Event::Stop => self.stop(),
            Event::SetMuted(muted) => {
                info!(muted, "manual mute changed");
                self.suppression.manually_muted = muted;
                Vec::new()
            }
            Event::SetExternalSuppression(suppressed) => {
                info!(suppressed, "external suppression changed");
                self.suppression.externally_suppressed = suppressed;
                Vec::new()
            }
            Event::Reconfigure(config) => self.reconfigure(config),
            _ if !self.running => {
                debug!("engine stopped, ignoring {event:?}");
                Vec::new()
            }
            Event::Tick => self.tick(now),
            Event::FetchCompleted { generation, outcome } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "dropping stale fetch result");
                    return Vec::new();
                }
                self.fetch_completed(outcome, now)
            }
            Event::HeartbeatPulse => {
                self.watchdog.record_heartbeat(now);
                Vec::new()
            }
            Event::HealthCheck => self.health_check(now),
            Event::MaintenanceRestart => {
                info!("performing periodic maintenance restart");
                self.totals.soft_restarts += 1;
                let mut cmds = vec![Command::Health(HealthEvent {
                    kind: HealthEventKind::SoftRestart,
                    reason: RestartReason::Maintenance,
                })];
                cmds.extend(self.soft_restart());
                cmds
            }
            Event::Visibility(visibility) => self.visibility_changed(visibility),
        }
    }

    fn start(&mut self, now: Instant) -> Vec<Command> {
        if self.running {
            debug!("engine already running");
            return Vec::new();
        }
        info!(interval_ms = self.poll.interval_ms(), "starting queue monitoring");
        self.running = true;
        self.generation += 1;
        self.watchdog = WatchdogState::new(now);
        self.arm_everything(now)
    }

    fn stop(&mut self) -> Vec<Command> {
        if !self.running {
            return Vec::new();
        }
        info!("stopping queue monitoring");
        self.running = false;
        self.generation += 1;
        self.poll.abandon_fetch();
        vec![Command::CancelAllTimers, Command::AbortFetch]
    }

    fn arm_everything(&mut self, now: Instant) -> Vec<Command> {
        let mut cmds = vec![
            Command::ArmPollTimer {
                period: self.interval(),
            },
            self.watchdog_timers(),
        ];
        cmds.extend(self.tick(now));
        cmds
    }

    fn tick(&mut self, now: Instant) -> Vec<Command> {
        // Liveness is recorded before any network work.
        self.watchdog.record_heartbeat(now);
        if !self.poll.begin_fetch() {
            debug!("fetch still in flight, skipping tick");
            return Vec::new();
        }
        debug!(interval_ms = self.poll.interval_ms(), "polling queue");
        vec![Command::StartFetch {
            generation: self.generation,
        }]
    }

    fn fetch_completed(
        &mut self,
        outcome: Result<Snapshot, crate::error::FetchError>,
        now: Instant,
    ) -> Vec<Command> {
        self.totals.polls += 1;
        match &outcome {
            Err(crate::error::FetchError::RateLimited) => self.totals.rate_limits += 1,
            Err(_) => self.totals.fetch_failures += 1,
            Ok(_) => {}
        }

        let report = self.poll.complete(outcome, now);
        let mut cmds = Vec::new();
        if report.rescheduled_ms.is_some() {
            cmds.extend(self.reschedule());
        }
        if let Some(change) = report.diff {
            if let Some(decision) = gate(self.suppression, &change.added) {
                info!(
                    count = change.added.len(),
                    "new items detected: {}",
                    format_ids(&change.added)
                );
                self.totals.alerts += 1;
                cmds.push(Command::Alert(decision));
            }
            if !change.removed.is_empty() {
                info!("items removed or resolved: {}", format_ids(&change.removed));
                cmds.push(Command::ItemsRemoved(change.removed));
            }
        }
        cmds
    }

    fn health_check(&mut self, now: Instant) -> Vec<Command> {
        let had_failures = self.watchdog.consecutive_health_failures > 0;
        match self.watchdog.check(
            now,
            self.config.heartbeat_timeout(),
            self.config.max_health_failures,
        ) {
            HealthVerdict::Healthy => {
                if had_failures {
                    info!("health check passed, resetting failure counter");
                }
                Vec::new()
            }
            HealthVerdict::SoftRestart { failures, elapsed } => {
                warn!(
                    failures,
                    elapsed_ms = millis(elapsed),
                    "heartbeat timeout, restarting polling"
                );
                self.totals.soft_restarts += 1;
                let mut cmds = vec![Command::Health(HealthEvent {
                    kind: HealthEventKind::SoftRestart,
                    reason: RestartReason::StallDetected,
                })];
                cmds.extend(self.soft_restart());
                cmds
            }
            HealthVerdict::FullRestart { elapsed } => {
                error!(
                    elapsed_ms = millis(elapsed),
                    "repeated heartbeat timeouts, performing full restart"
                );
                self.full_restart(now)
            }
        }
    }

    /// Re-arm the poll timer at the current interval with a prompt re-check.
    fn soft_restart(&self) -> Vec<Command> {
        self.reschedule()
    }

    fn full_restart(&mut self, now: Instant) -> Vec<Command> {
        self.totals.full_restarts += 1;
        self.generation += 1;
        self.poll = PollScheduler::new(self.config.bounds());
        self.watchdog = WatchdogState::new(now);
        let mut cmds = vec![
            Command::Health(HealthEvent {
                kind: HealthEventKind::FullRestart,
                reason: RestartReason::StallDetected,
            }),
            Command::CancelAllTimers,
            Command::AbortFetch,
        ];
        cmds.extend(self.arm_everything(now));
        cmds
    }

    fn visibility_changed(&mut self, visibility: Visibility) -> Vec<Command> {
        self.visibility = visibility;
        match visibility {
            Visibility::Background => {
                info!("host in background, keeping current poll cadence");
                Vec::new()
            }
            Visibility::Foreground => {
                info!("host in foreground, boosting poll frequency");
                let mut cmds = Vec::new();
                if self.poll.interval_ms() > self.config.min_interval_ms
                    && self.poll.set_interval(self.config.min_interval_ms)
                {
                    cmds.push(Command::ArmPollTimer {
                        period: self.interval(),
                    });
                }
                cmds.push(Command::ScheduleRecheck {
                    after: self.config.foreground_recheck_delay(),
                });
                cmds
            }
        }
    }

    fn reconfigure(&mut self, config: EngineConfig) -> Vec<Command> {
        info!(?config, "applying engine configuration");
        let moved = self.poll.set_bounds(config.bounds());
        self.config = config;
        if !self.running {
            return Vec::new();
        }
        if moved {
            debug!(interval_ms = self.poll.interval_ms(), "interval clamped to new bounds");
        }
        vec![
            Command::ArmPollTimer {
                period: self.interval(),
            },
            self.watchdog_timers(),
        ]
    }

    fn reschedule(&self) -> Vec<Command> {
        vec![
            Command::ArmPollTimer {
                period: self.interval(),
            },
            Command::ScheduleRecheck {
                after: self.config.recheck_delay(),
            },
        ]
    }

    fn watchdog_timers(&self) -> Command {
        Command::ArmWatchdogTimers {
            heartbeat_emit: self.config.heartbeat_emit_period(),
            health_check: self.config.health_check_period(),
            maintenance: self.config.maintenance_period(),
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
