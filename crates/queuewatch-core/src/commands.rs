use std::time::Duration;

use crate::alert::AlertDecision;
use crate::ids::ItemId;
use crate::watchdog::HealthEvent;

/// Effects the engine asks its runtime shell to perform.
///
/// Timer commands are idempotent: arming an armed timer replaces it, and
/// cancelling an unarmed one does nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Cancel any pending periodic tick and re-arm with this period.
    ArmPollTimer { period: Duration },
    /// Arm the single one-shot re-check, replacing any pending one.
    ScheduleRecheck { after: Duration },
    /// (Re)arm the heartbeat emitter, health check and maintenance timers.
    ArmWatchdogTimers {
        heartbeat_emit: Duration,
        health_check: Duration,
        maintenance: Duration,
    },
    CancelAllTimers,
    StartFetch { generation: u64 },
    AbortFetch,
    Alert(AlertDecision),
    ItemsRemoved(Vec<ItemId>),
    Health(HealthEvent),
}
