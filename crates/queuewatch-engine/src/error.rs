use queuewatch_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor is not running")]
    NotRunning,
    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("unknown alert sound {0:?}")]
    UnknownSound(String),
    /// Preference persistence failed; the in-memory change still applied.
    #[error("preferences: {0}")]
    Preferences(String),
}
