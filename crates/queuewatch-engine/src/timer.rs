use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::trace;

/// A cancellable tokio timer slot. Arming replaces whatever was armed.
#[derive(Debug)]
pub struct Timer {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self { name, task: None }
    }

    /// Fire every `period`, first after one full period. Stops once `fire`
    /// returns false.
    pub fn arm_periodic<F>(&mut self, period: Duration, mut fire: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();
        trace!(timer = self.name, period_ms = period.as_millis() as u64, "arm periodic");
        let start = Instant::now() + period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !fire() {
                    break;
                }
            }
        }));
    }

    pub fn arm_once<F>(&mut self, after: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        trace!(timer = self.name, after_ms = after.as_millis() as u64, "arm once");
        self.task = Some(tokio::spawn(async move {
            sleep(after).await;
            fire();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
