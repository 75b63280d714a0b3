//! Runtime shell for the queue watcher.
//!
//! [`Monitor`] drives the pure `queuewatch_core::Engine` from a single tokio
//! task, turning its commands into timers, fetches against a [`QueueSource`]
//! and calls on a [`Surface`].

pub mod alert;
pub mod config;
pub mod error;
pub mod http;
pub mod monitor;
pub mod notify;
pub mod prefs;
pub mod sounds;
pub mod source;
pub mod surface;
pub mod timer;

pub use alert::{deliver, Delivery};
pub use config::{config_path, AlertsConfig, Config, PreferencesConfig, SourceConfig, CONFIG_FILE};
pub use error::MonitorError;
pub use http::HttpSource;
pub use monitor::{Monitor, MonitorHandle};
pub use notify::DesktopSurface;
pub use prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use sounds::{AlertSound, DEFAULT_SOUND, SOUNDS};
pub use source::{QueueSource, ScriptedSource};
pub use surface::{LogSurface, RecordingSurface, Surface, SurfaceCall, SurfaceError};
pub use timer::Timer;
