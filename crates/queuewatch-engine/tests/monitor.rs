use std::sync::Arc;
use std::time::Duration;

use queuewatch_core::{
    AlertEvent, EngineConfig, FetchError, HealthEvent, HealthEventKind, ItemId, RestartReason,
    Snapshot, Visibility,
};
use queuewatch_engine::{
    FilePreferenceStore, MemoryPreferenceStore, Monitor, MonitorError, PreferenceStore,
    Preferences, RecordingSurface, ScriptedSource, SurfaceCall,
};
use tokio::time::sleep;

fn snap(ids: &[u64]) -> Snapshot {
    ids.iter().copied().map(ItemId::from).collect()
}

fn ids(ids: &[u64]) -> Vec<ItemId> {
    ids.iter().copied().map(ItemId::from).collect()
}

struct Rig {
    monitor: Monitor,
    source: Arc<ScriptedSource>,
    surface: Arc<RecordingSurface>,
    prefs: Arc<MemoryPreferenceStore>,
}

fn rig(config: EngineConfig, source: ScriptedSource, prefs: Preferences) -> Rig {
    let source = Arc::new(source);
    let surface = Arc::new(RecordingSurface::new());
    let prefs = Arc::new(MemoryPreferenceStore::new(prefs));
    let monitor = Monitor::new(config, source.clone(), surface.clone(), prefs.clone()).unwrap();
    Rig {
        monitor,
        source,
        surface,
        prefs,
    }
}

fn scripted(outcomes: Vec<Result<Snapshot, FetchError>>) -> Rig {
    rig(EngineConfig::default(), ScriptedSource::new(outcomes), Preferences::default())
}

#[tokio::test(start_paused = true)]
async fn cold_start_is_silent_then_new_item_alerts() {
    let mut r = scripted(vec![Ok(snap(&[1, 2])), Ok(snap(&[1, 2, 3]))]);
    r.monitor.start().unwrap();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(r.source.fetch_count(), 1);
    assert!(r.surface.calls().is_empty());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(r.surface.alerts(), vec![AlertEvent::new(ids(&[3]))]);

    // Steady queue afterwards: no repeat alert.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(r.surface.alerts().len(), 1);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn removals_reach_the_surface_without_alerting() {
    let mut r = scripted(vec![Ok(snap(&[1, 2])), Ok(snap(&[2]))]);
    r.monitor.start().unwrap();
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(r.surface.calls(), vec![SurfaceCall::ItemsRemoved(ids(&[1]))]);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn persisted_mute_gives_visual_fallback_only() {
    let prefs = Preferences {
        muted: true,
        ..Preferences::default()
    };
    let mut r = rig(
        EngineConfig::default(),
        ScriptedSource::new([Ok(snap(&[])), Ok(snap(&[7]))]),
        prefs,
    );
    r.monitor.start().unwrap();
    sleep(Duration::from_millis(10_500)).await;
    assert!(r.surface.alerts().is_empty());
    assert_eq!(r.surface.visual_fallbacks(), vec![AlertEvent::new(ids(&[7]))]);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn runtime_mute_is_persisted_and_applied() {
    let mut r = scripted(vec![Ok(snap(&[1])), Ok(snap(&[1, 2]))]);
    let handle = r.monitor.start().unwrap();
    handle.set_muted(true).unwrap();
    assert!(r.prefs.load().unwrap().muted);

    sleep(Duration::from_millis(10_500)).await;
    assert!(r.surface.alerts().is_empty());
    assert_eq!(r.surface.visual_fallbacks().len(), 1);

    let status = handle.status().await.unwrap();
    assert!(status.suppression.manually_muted);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn busy_operator_suppresses_audio() {
    let mut r = scripted(vec![Ok(snap(&[1])), Ok(snap(&[1, 2])), Ok(snap(&[1, 2, 3]))]);
    let handle = r.monitor.start().unwrap();
    handle.set_external_suppression(true).unwrap();
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(r.surface.visual_fallbacks(), vec![AlertEvent::new(ids(&[2]))]);

    handle.set_external_suppression(false).unwrap();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(r.surface.alerts(), vec![AlertEvent::new(ids(&[3]))]);
    // Host-driven suppression is not a preference.
    assert!(!r.prefs.load().unwrap().muted);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn playback_failure_degrades_to_visual() {
    let mut r = scripted(vec![Ok(snap(&[1])), Ok(snap(&[1, 5]))]);
    r.surface.fail_playback(true);
    r.monitor.start().unwrap();
    sleep(Duration::from_millis(10_500)).await;
    let event = AlertEvent::new(ids(&[5]));
    assert_eq!(
        r.surface.calls(),
        vec![SurfaceCall::Alert(event.clone()), SurfaceCall::VisualFallback(event)]
    );
    assert!(r.monitor.is_running());
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn rate_limit_backs_off_then_recovers() {
    let mut r = scripted(vec![Ok(snap(&[1])), Err(FetchError::RateLimited), Ok(snap(&[1]))]);
    let handle = r.monitor.start().unwrap();

    sleep(Duration::from_millis(10_200)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_interval_ms, 20_000);
    assert_eq!(status.consecutive_rate_limit_hits, 1);

    // The prompt re-check succeeds and the interval decays.
    sleep(Duration::from_secs(2)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_interval_ms, 16_000);
    assert_eq!(status.consecutive_rate_limit_hits, 0);
    assert_eq!(status.totals.rate_limits, 1);
    assert!(r.surface.alerts().is_empty());
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_times_out_and_watchdog_stays_quiet() {
    let mut r = rig(
        EngineConfig::default(),
        ScriptedSource::new([]).with_delay(Duration::from_secs(600)),
        Preferences::default(),
    );
    let handle = r.monitor.start().unwrap();

    sleep(Duration::from_secs(61)).await;
    let status = handle.status().await.unwrap();
    assert!(status.totals.fetch_failures >= 2);
    assert!(!status.initialized);
    assert!(r.surface.health_events().is_empty());
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stalled_polling_escalates_to_full_restart() {
    let config = EngineConfig {
        min_interval_ms: 120_000,
        max_interval_ms: 120_000,
        heartbeat_emit_period_ms: 3_600_000,
        ..EngineConfig::default()
    };
    let mut r = rig(config, ScriptedSource::new([Ok(snap(&[1]))]), Preferences::default());
    let handle = r.monitor.start().unwrap();

    sleep(Duration::from_secs(181)).await;
    let stall = |kind| HealthEvent {
        kind,
        reason: RestartReason::StallDetected,
    };
    assert_eq!(
        r.surface.health_events(),
        vec![
            stall(HealthEventKind::SoftRestart),
            stall(HealthEventKind::SoftRestart),
            stall(HealthEventKind::FullRestart),
        ]
    );
    let status = handle.status().await.unwrap();
    assert_eq!(status.totals.soft_restarts, 2);
    assert_eq!(status.totals.full_restarts, 1);
    assert_eq!(status.consecutive_health_failures, 0);
    // The rebuilt state reseeds silently.
    assert!(status.initialized);
    assert!(r.surface.alerts().is_empty());
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn foreground_boosts_backed_off_interval() {
    let mut r = scripted(vec![Ok(snap(&[1])), Err(FetchError::RateLimited)]);
    let handle = r.monitor.start().unwrap();
    sleep(Duration::from_millis(10_200)).await;
    assert_eq!(handle.status().await.unwrap().current_interval_ms, 20_000);

    handle.set_visibility(Visibility::Foreground).unwrap();
    sleep(Duration::from_millis(10)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_interval_ms, 10_000);
    assert_eq!(status.visibility, Visibility::Foreground);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_silences_callbacks() {
    let mut r = scripted(vec![Ok(snap(&[1])), Ok(snap(&[1, 2]))]);
    r.monitor.stop().await;

    let handle = r.monitor.start().unwrap();
    sleep(Duration::from_secs(1)).await;
    r.monitor.stop().await;
    r.monitor.stop().await;
    assert!(!r.monitor.is_running());
    assert!(!handle.is_running());
    assert!(matches!(handle.status().await, Err(MonitorError::NotRunning)));

    let fetches = r.source.fetch_count();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(r.source.fetch_count(), fetches);
    assert!(r.surface.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_begins_a_fresh_session() {
    let mut r = scripted(vec![Ok(snap(&[1]))]);
    let first = r.monitor.start().unwrap();
    let again = r.monitor.start().unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(r.source.fetch_count(), 1);
    assert!(first.is_running() && again.is_running());

    r.monitor.stop().await;
    let handle = r.monitor.start().unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(r.source.fetch_count(), 2);
    assert!(handle.status().await.unwrap().running);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn sound_selection_is_validated_and_persisted() {
    let mut r = scripted(vec![]);
    let handle = r.monitor.start().unwrap();
    assert_eq!(handle.select_sound("pacman").unwrap().key, "pacman");
    assert_eq!(r.prefs.load().unwrap().sound, "pacman");
    sleep(Duration::from_millis(10)).await;
    assert!(r.surface.calls().contains(&SurfaceCall::SoundSelected("pacman")));
    assert!(matches!(
        handle.select_sound("kazoo"),
        Err(MonitorError::UnknownSound(_))
    ));
    assert_eq!(r.prefs.load().unwrap().sound, "pacman");
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_config_is_rejected() {
    let bad = EngineConfig {
        min_interval_ms: 0,
        ..EngineConfig::default()
    };
    let source = Arc::new(ScriptedSource::new([]));
    let err = Monitor::new(
        bad.clone(),
        source,
        Arc::new(RecordingSurface::new()),
        Arc::new(MemoryPreferenceStore::default()),
    )
    .err()
    .unwrap();
    assert!(matches!(err, MonitorError::InvalidConfig(_)));

    let mut r = scripted(vec![]);
    let handle = r.monitor.start().unwrap();
    assert!(matches!(handle.reconfigure(bad), Err(MonitorError::InvalidConfig(_))));
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn outcomes_queued_while_running_are_picked_up() {
    let mut r = scripted(vec![Ok(snap(&[1]))]);
    r.monitor.start().unwrap();
    sleep(Duration::from_secs(5)).await;
    r.source.push(Ok(snap(&[1, 4])));
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(r.surface.alerts(), vec![AlertEvent::new(ids(&[4]))]);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reconfiguration_survives_stop_and_start() {
    let mut r = scripted(vec![Ok(snap(&[1]))]);
    let slower = EngineConfig {
        min_interval_ms: 20_000,
        ..EngineConfig::default()
    };
    let handle = r.monitor.start().unwrap();
    handle.reconfigure(slower.clone()).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.status().await.unwrap().current_interval_ms, 20_000);

    r.monitor.stop().await;
    assert_eq!(r.monitor.config(), slower);
    let handle = r.monitor.start().unwrap();
    assert_eq!(handle.status().await.unwrap().current_interval_ms, 20_000);
    r.monitor.stop().await;

    // Reconfiguring while stopped is kept for the next start.
    let fastest = EngineConfig {
        min_interval_ms: 15_000,
        ..EngineConfig::default()
    };
    r.monitor.reconfigure(fastest).unwrap();
    let handle = r.monitor.start().unwrap();
    assert_eq!(handle.status().await.unwrap().current_interval_ms, 15_000);
    r.monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn corrupt_preferences_are_not_overwritten_by_mute() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preferences.toml");
    std::fs::write(&path, "sound = \"pacman\"\nmuted = [").unwrap();

    let source = Arc::new(ScriptedSource::new([Ok(snap(&[1]))]));
    let surface = Arc::new(RecordingSurface::new());
    let prefs = Arc::new(FilePreferenceStore::new(&path));
    let mut monitor =
        Monitor::new(EngineConfig::default(), source, surface, prefs).unwrap();
    let handle = monitor.start().unwrap();

    assert!(matches!(handle.set_muted(true), Err(MonitorError::Preferences(_))));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "sound = \"pacman\"\nmuted = ["
    );
    // The mute itself still applies.
    assert!(handle.status().await.unwrap().suppression.manually_muted);
    monitor.stop().await;
}
