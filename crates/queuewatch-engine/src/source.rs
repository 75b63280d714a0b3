use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use queuewatch_core::{FetchError, Snapshot};

/// Read access to the monitored queue.
///
/// Implementations own transport and authentication; the monitor only sees
/// the resulting snapshot or the reason there is none.
#[async_trait]
pub trait QueueSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// Replays a fixed list of fetch outcomes. For tests and dry runs.
///
/// Once the script runs out the last outcome repeats; an empty script yields
/// empty snapshots.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Snapshot, FetchError>>>,
    last: Mutex<Option<Result<Snapshot, FetchError>>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<Snapshot, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, outcome: Result<Snapshot, FetchError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<Snapshot, FetchError> {
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last.clone().unwrap_or_else(|| Ok(Snapshot::empty())),
        }
    }
}

#[async_trait]
impl QueueSource for ScriptedSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_outcome()
    }
}
