use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use queuewatch_core::{format_ids, AlertEvent, HealthEvent, ItemId};
use thiserror::Error;
use tracing::{info, warn};

use crate::sounds::AlertSound;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("alert playback failed: {0}")]
    Playback(String),
}

/// Whatever renders alerts for the operator.
///
/// Called from the monitor's single task, so implementations must return
/// quickly and push slow work (sound playback, notifications) elsewhere.
pub trait Surface: Send + Sync {
    /// Audible alert: sound, flash, desktop notification.
    fn on_alert(&self, event: &AlertEvent) -> Result<(), SurfaceError>;
    /// Silent indicator used when muted, suppressed, or playback failed.
    fn on_visual_fallback(&self, event: &AlertEvent);
    fn on_items_removed(&self, ids: &[ItemId]);
    fn on_health_event(&self, event: &HealthEvent);
    /// The operator picked a different alert sound.
    fn on_sound_selected(&self, _sound: &'static AlertSound) {}
}

/// Surface that only writes to the log.
#[derive(Debug, Default)]
pub struct LogSurface;

impl Surface for LogSurface {
    fn on_alert(&self, event: &AlertEvent) -> Result<(), SurfaceError> {
        info!(count = event.count, "NEW ITEM ALERT: {}", format_ids(&event.ids));
        Ok(())
    }

    fn on_visual_fallback(&self, event: &AlertEvent) {
        info!(count = event.count, "new items (silent): {}", format_ids(&event.ids));
    }

    fn on_items_removed(&self, ids: &[ItemId]) {
        info!("items removed: {}", format_ids(ids));
    }

    fn on_health_event(&self, event: &HealthEvent) {
        warn!(kind = ?event.kind, reason = ?event.reason, "monitor health event");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    Alert(AlertEvent),
    VisualFallback(AlertEvent),
    ItemsRemoved(Vec<ItemId>),
    Health(HealthEvent),
    SoundSelected(&'static str),
}

/// Records every call. For tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    fail_playback: AtomicBool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `on_alert` calls fail after being recorded.
    pub fn fail_playback(&self, fail: bool) {
        self.fail_playback.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Alert(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn visual_fallbacks(&self) -> Vec<AlertEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::VisualFallback(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn health_events(&self) -> Vec<HealthEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Health(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Surface for RecordingSurface {
    fn on_alert(&self, event: &AlertEvent) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Alert(event.clone()));
        if self.fail_playback.load(Ordering::SeqCst) {
            return Err(SurfaceError::Playback("playback disabled".into()));
        }
        Ok(())
    }

    fn on_visual_fallback(&self, event: &AlertEvent) {
        self.record(SurfaceCall::VisualFallback(event.clone()));
    }

    fn on_items_removed(&self, ids: &[ItemId]) {
        self.record(SurfaceCall::ItemsRemoved(ids.to_vec()));
    }

    fn on_health_event(&self, event: &HealthEvent) {
        self.record(SurfaceCall::Health(*event));
    }

    fn on_sound_selected(&self, sound: &'static AlertSound) {
        self.record(SurfaceCall::SoundSelected(sound.key));
    }
}
