//! Desktop rendering of alerts: sound playback through an external player and
//! notifications via `notify-send` (Linux) or `osascript` (macOS).
//!
//! Notification failures are logged and never propagated. Playback spawn
//! failures are reported so the caller can fall back to the visual alert.

use std::sync::{Mutex, PoisonError};

use queuewatch_core::{format_ids, AlertEvent, HealthEvent, HealthEventKind, ItemId};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AlertsConfig;
use crate::prefs::PreferenceStore;
use crate::sounds::{self, AlertSound};
use crate::surface::{Surface, SurfaceError};

pub const NOTIFICATION_TITLE: &str = "New queue item";

pub struct DesktopSurface {
    alerts: AlertsConfig,
    sound: Mutex<&'static AlertSound>,
}

impl DesktopSurface {
    /// Reads the stored sound choice once. Later choices arrive through
    /// [`Surface::on_sound_selected`], so alerts never touch the store.
    pub fn new(alerts: AlertsConfig, prefs: &dyn PreferenceStore) -> Self {
        Self {
            alerts,
            sound: Mutex::new(stored_sound(prefs)),
        }
    }

    pub fn selected_sound(&self) -> &'static AlertSound {
        *self.sound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the player for `sound` without waiting for it to finish.
    pub fn play_sound(&self, sound: &AlertSound) -> Result<(), SurfaceError> {
        let url = sound.url(&self.alerts.sound_base_url);
        debug!(player = %self.alerts.player, %url, "playing alert sound");
        let mut child = Command::new(&self.alerts.player)
            .args(&self.alerts.player_args)
            .arg(&url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .spawn()
            .map_err(|e| SurfaceError::Playback(format!("{}: {e}", self.alerts.player)))?;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => warn!("alert player exited with {status}"),
                Err(e) => warn!("alert player wait failed: {e}"),
                Ok(_) => {}
            }
        });
        Ok(())
    }

    fn notify(&self, title: &str, body: &str) {
        if !self.alerts.desktop_notifications {
            info!("{title}: {body}");
            return;
        }
        if let Err(e) = send_desktop_notification(title, body) {
            warn!("desktop notification failed: {e}");
        }
    }
}

impl Surface for DesktopSurface {
    fn on_alert(&self, event: &AlertEvent) -> Result<(), SurfaceError> {
        self.play_sound(self.selected_sound())?;
        self.notify(NOTIFICATION_TITLE, &notification_body(event));
        Ok(())
    }

    fn on_visual_fallback(&self, event: &AlertEvent) {
        self.notify(NOTIFICATION_TITLE, &notification_body(event));
    }

    fn on_items_removed(&self, ids: &[ItemId]) {
        info!("items left the queue: {}", format_ids(ids));
    }

    fn on_health_event(&self, event: &HealthEvent) {
        match event.kind {
            HealthEventKind::SoftRestart => info!(reason = ?event.reason, "polling restarted"),
            HealthEventKind::FullRestart => warn!(reason = ?event.reason, "monitor fully restarted"),
        }
    }

    fn on_sound_selected(&self, sound: &'static AlertSound) {
        *self.sound.lock().unwrap_or_else(PoisonError::into_inner) = sound;
    }
}

fn stored_sound(prefs: &dyn PreferenceStore) -> &'static AlertSound {
    match prefs.load() {
        Ok(p) => sounds::find(&p.sound).unwrap_or_else(|| {
            warn!(sound = %p.sound, "unknown alert sound, using default");
            sounds::default_sound()
        }),
        Err(e) => {
            warn!("failed to read preferences: {e:?}");
            sounds::default_sound()
        }
    }
}

pub fn notification_body(event: &AlertEvent) -> String {
    format!("{} new item(s): {}", event.count, format_ids(&event.ids))
}

fn send_desktop_notification(title: &str, body: &str) -> Result<(), String> {
    let mut cmd = if cfg!(target_os = "macos") {
        let script = format!(
            r#"display notification "{}" with title "{}""#,
            escape_applescript(body),
            escape_applescript(title)
        );
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(script);
        cmd
    } else {
        let mut cmd = Command::new("notify-send");
        cmd.arg("--urgency=critical")
            .arg("--app-name=queuewatch")
            .arg(title)
            .arg(body);
        cmd
    };
    let mut child = cmd
        .stdout(std::process::Stdio::null())
        .spawn()
        .map_err(|e| format!("spawn notifier: {e}"))?;
    tokio::spawn(async move {
        if let Ok(status) = child.wait().await {
            if !status.success() {
                warn!("notifier exited with {status}");
            }
        }
    });
    Ok(())
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
