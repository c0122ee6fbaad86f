//! Cache preloader
//!
//! Warms the cache from a map of `key → async producer`. Producers run with
//! bounded parallelism; each key walks `NotStarted → InProgress` and ends in
//! `Completed`, `Failed` or `Cancelled`. Failures are isolated: one bad
//! producer never stops the others. State changes stream to subscribers and
//! an optional progress callback fires after every terminal transition.

use crate::engine::{BoxFuture, CacheEngine, PutOptions};
use crate::policy::CachePolicy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Default number of producers in flight
const DEFAULT_PARALLELISM: usize = 5;

/// Event stream capacity; slow subscribers drop the oldest events
const EVENT_CAPACITY: usize = 64;

/// Boxed async producer for one key
pub type Producer<T> = Box<dyn FnOnce() -> BoxFuture<crate::Result<T>> + Send>;

/// Callback invoked after each terminal state change
pub type ProgressCallback = Arc<dyn Fn(PreloadProgress) + Send + Sync>;

/// Lifecycle of one preload entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// One state change, as delivered to subscribers
#[derive(Debug, Clone)]
pub struct PreloadEvent {
    pub key: String,
    pub state: PreloadState,
}

/// Running tally handed to the progress callback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadProgress {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl PreloadProgress {
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

/// Bounded-parallel cache warmer
pub struct Preloader {
    engine: CacheEngine,
    parallelism: usize,
    events: broadcast::Sender<PreloadEvent>,
}

impl Preloader {
    pub fn new(engine: CacheEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine,
            parallelism: DEFAULT_PARALLELISM,
            events,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Stream of state changes. Best-effort: a lagging subscriber loses the
    /// oldest events.
    pub fn events(&self) -> BroadcastStream<PreloadEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Run every producer and store its value under its key. Returns the
    /// final state per key.
    pub async fn run<T>(
        &self,
        producers: HashMap<String, Producer<T>>,
        policy: Option<CachePolicy>,
        progress: Option<ProgressCallback>,
    ) -> crate::Result<HashMap<String, PreloadState>>
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        let total = producers.len();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let tally = Arc::new(parking_lot::Mutex::new(PreloadProgress {
            total,
            ..PreloadProgress::default()
        }));
        let token = self.engine.shutdown_token();

        for key in producers.keys() {
            self.emit(key, PreloadState::NotStarted);
        }

        let mut tasks = tokio::task::JoinSet::new();
        for (key, producer) in producers {
            let engine = self.engine.clone();
            let events = self.events.clone();
            let semaphore = Arc::clone(&semaphore);
            let tally = Arc::clone(&tally);
            let progress = progress.clone();
            let policy = policy.clone();
            let token = token.clone();

            tasks.spawn(async move {
                // a closed semaphore cannot happen here; treat it as cancellation
                let Ok(_permit) = semaphore.acquire().await else {
                    return (key, PreloadState::Cancelled);
                };
                if token.is_cancelled() {
                    let state = PreloadState::Cancelled;
                    finish(&events, &tally, progress.as_ref(), &key, state);
                    return (key, state);
                }

                let _ = events.send(PreloadEvent {
                    key: key.clone(),
                    state: PreloadState::InProgress,
                });

                let state = tokio::select! {
                    () = token.cancelled() => PreloadState::Cancelled,
                    result = producer() => match result {
                        Ok(value) => {
                            let mut options = PutOptions::new();
                            options.policy = policy;
                            match engine.put(&key, &value, options).await {
                                Ok(()) => PreloadState::Completed,
                                Err(e) => {
                                    warn!(key = %key, error = %e, "preload store failed");
                                    PreloadState::Failed
                                }
                            }
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "preload producer failed");
                            PreloadState::Failed
                        }
                    },
                };

                finish(&events, &tally, progress.as_ref(), &key, state);
                (key, state)
            });
        }

        let mut states = HashMap::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, state)) => {
                    states.insert(key, state);
                }
                Err(e) => warn!(error = %e, "preload task panicked"),
            }
        }

        debug!(
            total,
            completed = tally.lock().completed,
            "preload finished"
        );
        Ok(states)
    }

    fn emit(&self, key: &str, state: PreloadState) {
        let _ = self.events.send(PreloadEvent {
            key: key.to_owned(),
            state,
        });
    }
}

fn finish(
    events: &broadcast::Sender<PreloadEvent>,
    tally: &parking_lot::Mutex<PreloadProgress>,
    progress: Option<&ProgressCallback>,
    key: &str,
    state: PreloadState,
) {
    let _ = events.send(PreloadEvent {
        key: key.to_owned(),
        state,
    });
    let snapshot = {
        let mut tally = tally.lock();
        match state {
            PreloadState::Completed => tally.completed += 1,
            PreloadState::Failed => tally.failed += 1,
            PreloadState::Cancelled => tally.cancelled += 1,
            PreloadState::NotStarted | PreloadState::InProgress => {}
        }
        *tally
    };
    if let Some(callback) = progress {
        callback(snapshot);
    }
}
