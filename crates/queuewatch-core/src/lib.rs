//! Functional core of the queue watcher: snapshot diffing, poll cadence,
//! alert gating and the self-healing watchdog, driven as a pure state machine.

pub mod alert;
pub mod backoff;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod poll;
pub mod snapshot;
pub mod visibility;
pub mod watchdog;

pub use alert::*;
pub use backoff::*;
pub use commands::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use ids::*;
pub use poll::*;
pub use snapshot::*;
pub use visibility::*;
pub use watchdog::*;
