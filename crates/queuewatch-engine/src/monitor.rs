use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use queuewatch_core::{
    AlertSuppression, Command, Engine, EngineConfig, EngineStatus, Event, FetchError, Visibility,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::alert::deliver;
use crate::error::MonitorError;
use crate::prefs::{PreferenceStore, Preferences};
use crate::sounds::{self, AlertSound};
use crate::source::QueueSource;
use crate::surface::Surface;
use crate::timer::Timer;

enum Input {
    Event(Event),
    Status(oneshot::Sender<EngineStatus>),
    SoundSelected(&'static AlertSound),
    Stop,
}

/// Owns the runtime shell around an [`Engine`]: timers, fetch tasks and the
/// surface callbacks. Every engine transition happens on one spawned task.
pub struct Monitor {
    /// Shared with handles so runtime reconfiguration outlives a restart.
    config: Arc<Mutex<EngineConfig>>,
    source: Arc<dyn QueueSource>,
    surface: Arc<dyn Surface>,
    prefs: Arc<dyn PreferenceStore>,
    running: Option<Running>,
}

struct Running {
    handle: MonitorHandle,
    task: JoinHandle<()>,
}

impl Monitor {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn QueueSource>,
        surface: Arc<dyn Surface>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(Mutex::new(config)),
            source,
            surface,
            prefs,
            running: None,
        })
    }

    /// Start monitoring. Calling it while running returns the live handle.
    pub fn start(&mut self) -> Result<MonitorHandle, MonitorError> {
        if let Some(running) = &self.running {
            if running.handle.is_running() {
                return Ok(running.handle.clone());
            }
        }

        let prefs = self.prefs.load().unwrap_or_else(|e| {
            warn!("failed to load preferences, using defaults: {e:?}");
            Preferences::default()
        });
        let suppression = AlertSuppression {
            manually_muted: prefs.muted,
            externally_suppressed: false,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor::new(
            Engine::new(self.config(), suppression, now()),
            tx.clone(),
            self.source.clone(),
            self.surface.clone(),
        );
        let task = tokio::spawn(actor.run(rx));
        let handle = MonitorHandle {
            tx,
            prefs: self.prefs.clone(),
            config: self.config.clone(),
        };
        handle.send(Event::Start)?;
        self.running = Some(Running {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    /// Stop monitoring and wait for the worker to exit. No surface callback
    /// fires after this returns. Safe to call repeatedly or before `start`.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.handle.tx.send(Input::Stop);
        if let Err(e) = running.task.await {
            if !e.is_cancelled() {
                warn!("monitor task ended abnormally: {e:?}");
            }
        }
    }

    /// The engine config the next `start` uses, including runtime changes.
    pub fn config(&self) -> EngineConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the engine config, applying it live when running.
    pub fn reconfigure(&self, config: EngineConfig) -> Result<(), MonitorError> {
        config.validate()?;
        match self.handle().filter(MonitorHandle::is_running) {
            Some(handle) => handle.reconfigure(config),
            None => {
                store_config(&self.config, config);
                Ok(())
            }
        }
    }

    pub fn handle(&self) -> Option<MonitorHandle> {
        self.running.as_ref().map(|r| r.handle.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.handle.is_running())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.handle.tx.send(Input::Stop);
        }
    }
}

/// Cheap, cloneable control surface for a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<Input>,
    prefs: Arc<dyn PreferenceStore>,
    config: Arc<Mutex<EngineConfig>>,
}

impl MonitorHandle {
    fn send(&self, event: Event) -> Result<(), MonitorError> {
        self.tx
            .send(Input::Event(event))
            .map_err(|_| MonitorError::NotRunning)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn set_visibility(&self, visibility: Visibility) -> Result<(), MonitorError> {
        self.send(Event::Visibility(visibility))
    }

    /// Host-driven suppression, e.g. the operator is busy. Not persisted.
    pub fn set_external_suppression(&self, suppressed: bool) -> Result<(), MonitorError> {
        self.send(Event::SetExternalSuppression(suppressed))
    }

    /// Applies immediately; an error after that means only persisting failed.
    pub fn set_muted(&self, muted: bool) -> Result<(), MonitorError> {
        self.send(Event::SetMuted(muted))?;
        self.update_prefs(|p| p.muted = muted)
    }

    pub fn select_sound(&self, key: &str) -> Result<&'static AlertSound, MonitorError> {
        let sound = sounds::find(key).ok_or_else(|| MonitorError::UnknownSound(key.to_string()))?;
        self.tx
            .send(Input::SoundSelected(sound))
            .map_err(|_| MonitorError::NotRunning)?;
        self.update_prefs(|p| p.sound = sound.key.to_string())?;
        info!(sound = sound.key, "alert sound selected");
        Ok(sound)
    }

    /// Applies to the running engine and to every later start.
    pub fn reconfigure(&self, config: EngineConfig) -> Result<(), MonitorError> {
        config.validate()?;
        self.send(Event::Reconfigure(config.clone()))?;
        store_config(&self.config, config);
        Ok(())
    }

    pub async fn status(&self) -> Result<EngineStatus, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Input::Status(reply))
            .map_err(|_| MonitorError::NotRunning)?;
        rx.await.map_err(|_| MonitorError::NotRunning)
    }

    pub fn preferences(&self) -> Result<Preferences, MonitorError> {
        self.prefs
            .load()
            .map_err(|e| MonitorError::Preferences(format!("{e:#}")))
    }

    fn update_prefs(&self, change: impl FnOnce(&mut Preferences)) -> Result<(), MonitorError> {
        let mut prefs = self.preferences()?;
        change(&mut prefs);
        self.prefs
            .save(&prefs)
            .map_err(|e| MonitorError::Preferences(format!("{e:#}")))
    }
}

struct Actor {
    engine: Engine,
    tx: mpsc::UnboundedSender<Input>,
    source: Arc<dyn QueueSource>,
    surface: Arc<dyn Surface>,
    poll: Timer,
    recheck: Timer,
    heartbeat: Timer,
    health: Timer,
    maintenance: Timer,
    fetch: Option<JoinHandle<()>>,
}

impl Actor {
    fn new(
        engine: Engine,
        tx: mpsc::UnboundedSender<Input>,
        source: Arc<dyn QueueSource>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        Self {
            engine,
            tx,
            source,
            surface,
            poll: Timer::new("poll"),
            recheck: Timer::new("recheck"),
            heartbeat: Timer::new("heartbeat"),
            health: Timer::new("health-check"),
            maintenance: Timer::new("maintenance"),
            fetch: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = rx.recv().await {
            match input {
                Input::Event(event) => self.dispatch(event),
                Input::Status(reply) => {
                    let _ = reply.send(self.engine.status(now()));
                }
                Input::SoundSelected(sound) => self.surface.on_sound_selected(sound),
                Input::Stop => {
                    self.dispatch(Event::Stop);
                    break;
                }
            }
        }
        self.cancel_timers();
        self.abort_fetch();
        debug!("monitor task exiting");
    }

    fn dispatch(&mut self, event: Event) {
        for cmd in self.engine.handle(event, now()) {
            self.execute(cmd);
        }
    }

    fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::ArmPollTimer { period } => {
                let tx = self.tx.clone();
                self.poll
                    .arm_periodic(period, move || tx.send(Input::Event(Event::Tick)).is_ok());
            }
            Command::ScheduleRecheck { after } => {
                let tx = self.tx.clone();
                self.recheck.arm_once(after, move || {
                    let _ = tx.send(Input::Event(Event::Tick));
                });
            }
            Command::ArmWatchdogTimers {
                heartbeat_emit,
                health_check,
                maintenance,
            } => {
                let tx = self.tx.clone();
                self.heartbeat.arm_periodic(heartbeat_emit, move || {
                    tx.send(Input::Event(Event::HeartbeatPulse)).is_ok()
                });
                let tx = self.tx.clone();
                self.health.arm_periodic(health_check, move || {
                    tx.send(Input::Event(Event::HealthCheck)).is_ok()
                });
                let tx = self.tx.clone();
                self.maintenance.arm_periodic(maintenance, move || {
                    tx.send(Input::Event(Event::MaintenanceRestart)).is_ok()
                });
            }
            Command::CancelAllTimers => self.cancel_timers(),
            Command::StartFetch { generation } => self.start_fetch(generation),
            Command::AbortFetch => self.abort_fetch(),
            Command::Alert(decision) => {
                deliver(self.surface.as_ref(), &decision);
            }
            Command::ItemsRemoved(ids) => self.surface.on_items_removed(&ids),
            Command::Health(event) => self.surface.on_health_event(&event),
        }
    }

    fn start_fetch(&mut self, generation: u64) {
        self.abort_fetch();
        let source = self.source.clone();
        let tx = self.tx.clone();
        let limit = self.engine.config().fetch_timeout();
        self.fetch = Some(tokio::spawn(async move {
            let outcome = match timeout(limit, source.fetch()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Transport(format!(
                    "fetch timed out after {}ms",
                    limit.as_millis()
                ))),
            };
            let _ = tx.send(Input::Event(Event::FetchCompleted {
                generation,
                outcome,
            }));
        }));
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch.take() {
            task.abort();
        }
    }

    fn cancel_timers(&mut self) {
        self.poll.cancel();
        self.recheck.cancel();
        self.heartbeat.cancel();
        self.health.cancel();
        self.maintenance.cancel();
    }
}

fn store_config(slot: &Mutex<EngineConfig>, config: EngineConfig) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = config;
}

/// Engine clock. Routed through tokio so paused test time applies.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
