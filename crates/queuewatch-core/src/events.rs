use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::snapshot::Snapshot;
use crate::visibility::Visibility;

/// Inputs to the engine: timer firings, fetch results and control requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    /// Periodic poll tick or one-shot re-check.
    Tick,
    FetchCompleted {
        generation: u64,
        outcome: Result<Snapshot, FetchError>,
    },
    HeartbeatPulse,
    HealthCheck,
    MaintenanceRestart,
    Visibility(Visibility),
    SetMuted(bool),
    SetExternalSuppression(bool),
    Reconfigure(EngineConfig),
}
