//! Scheduled eviction
//!
//! Runs eviction passes periodically, at configured times of day (UTC, with
//! random jitter so a fleet of instances does not stampede together), or
//! when a platform signal fires. Platform integration itself is out of
//! scope; [`EvictionScheduler::trigger`] is the hook an embedder wires to
//! its own idle/background/charging/connectivity notifications.
//!
//! A minimum-interval guard keeps any combination of sources from running
//! passes back to back.

use crate::engine::CacheEngine;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Platform conditions an embedder can forward to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSignal {
    Idle,
    Background,
    Charging,
    WifiConnected,
}

/// A wall-clock run time (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }

    fn as_secs(self) -> u64 {
        u64::from(self.hour) * 3600 + u64::from(self.minute) * 60
    }
}

/// When eviction passes run
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Fixed-period runs
    pub interval: Option<Duration>,
    /// Wall-clock runs (UTC)
    pub times_of_day: Vec<TimeOfDay>,
    /// Random 0..=jitter delay added to each time-of-day run
    pub jitter: Duration,
    /// Floor between any two runs, whatever their source
    pub min_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: None,
            times_of_day: Vec::new(),
            jitter: Duration::from_secs(60),
            min_interval: Duration::from_secs(60),
        }
    }
}

/// Periodic / wall-clock / signal-driven eviction runner
pub struct EvictionScheduler {
    engine: CacheEngine,
    config: ScheduleConfig,
    last_run: Mutex<Option<Instant>>,
}

impl EvictionScheduler {
    pub fn new(engine: CacheEngine, config: ScheduleConfig) -> Arc<Self> {
        Arc::new(Self {
            engine,
            config,
            last_run: Mutex::new(None),
        })
    }

    /// Spawn the scheduling loop; it stops when the engine shuts down
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let token = scheduler.engine.shutdown_token();

        tokio::spawn(async move {
            loop {
                let interval_sleep = async {
                    match scheduler.config.interval {
                        Some(interval) => tokio::time::sleep(interval).await,
                        None => std::future::pending().await,
                    }
                };
                let wall_clock_sleep = async {
                    match scheduler.next_wall_clock_delay() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => std::future::pending().await,
                    }
                };

                tokio::select! {
                    () = token.cancelled() => {
                        debug!("eviction scheduler stopping");
                        break;
                    }
                    () = interval_sleep => {
                        scheduler.run("interval").await;
                    }
                    () = wall_clock_sleep => {
                        scheduler.run("time_of_day").await;
                    }
                }
            }
        })
    }

    /// Platform hook: request an eviction pass for the given signal.
    /// Returns the number of evicted items (0 when the guard skipped the run).
    pub async fn trigger(&self, signal: PlatformSignal) -> crate::Result<usize> {
        debug!(signal = ?signal, "platform signal received");
        self.guarded_evict().await
    }

    async fn run(&self, reason: &str) {
        match self.guarded_evict().await {
            Ok(0) => {}
            Ok(evicted) => info!(reason, evicted, "scheduled eviction ran"),
            Err(e) => warn!(reason, error = %e, "scheduled eviction failed"),
        }
    }

    /// Run a pass unless one ran within `min_interval`
    async fn guarded_evict(&self) -> crate::Result<usize> {
        {
            let mut last_run = self.last_run.lock();
            if let Some(at) = *last_run
                && at.elapsed() < self.config.min_interval
            {
                debug!("eviction skipped by minimum-interval guard");
                return Ok(0);
            }
            *last_run = Some(Instant::now());
        }
        self.engine.check_and_evict().await
    }

    /// Delay until the next configured time of day, jittered
    fn next_wall_clock_delay(&self) -> Option<Duration> {
        if self.config.times_of_day.is_empty() {
            return None;
        }
        let now_secs_of_day = (crate::item::now_millis() / 1000) % SECONDS_PER_DAY;
        let base = self
            .config
            .times_of_day
            .iter()
            .map(|t| seconds_until(t.as_secs(), now_secs_of_day))
            .min()?;

        let jitter_millis = self.config.jitter.as_millis() as u64;
        let jitter = if jitter_millis == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_millis)
        };
        Some(Duration::from_secs(base) + Duration::from_millis(jitter))
    }
}

/// Seconds from `now_secs_of_day` to the next occurrence of `target_secs`,
/// wrapping past midnight; a target equal to now means a full day away
fn seconds_until(target_secs: u64, now_secs_of_day: u64) -> u64 {
    if target_secs > now_secs_of_day {
        target_secs - now_secs_of_day
    } else {
        SECONDS_PER_DAY - (now_secs_of_day - target_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvictionConfig;
    use crate::engine::CacheEngine;
    use crate::evict::EvictionStrategy;
    use crate::item::{CacheItem, Priority};
    use crate::storage::MemoryAdapter;
    use bytes::Bytes;
    use std::collections::BTreeSet;
    use tokio::time::sleep;

    fn bounded_engine(max_items: usize) -> CacheEngine {
        CacheEngine::new(
            Arc::new(MemoryAdapter::new()),
            Arc::new(crate::codec::JsonSerializer),
            EvictionConfig {
                max_items: Some(max_items),
                strategy: EvictionStrategy::Fifo,
                ..EvictionConfig::default()
            },
            "test",
        )
    }

    /// Fill past the limit without triggering put-time eviction
    async fn overfill(engine: &CacheEngine, count: usize) {
        for i in 0..count {
            let item = CacheItem::new(
                Bytes::from_static(b"1"),
                None,
                None,
                Priority::Normal,
                BTreeSet::new(),
            );
            engine.import_item(&format!("k{i}"), item).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_trigger_runs_eviction() {
        let engine = bounded_engine(2);
        overfill(&engine, 4).await;

        let scheduler = EvictionScheduler::new(engine, ScheduleConfig::default());
        let evicted = scheduler.trigger(PlatformSignal::Idle).await.unwrap();
        assert!(evicted >= 1);
    }

    #[tokio::test]
    async fn test_min_interval_guard() {
        let engine = bounded_engine(2);
        overfill(&engine, 4).await;

        let config = ScheduleConfig {
            min_interval: Duration::from_secs(3600),
            ..ScheduleConfig::default()
        };
        let scheduler = EvictionScheduler::new(engine.clone(), config);

        assert!(scheduler.trigger(PlatformSignal::Charging).await.unwrap() >= 1);

        // refill and trigger again: the guard suppresses the pass
        overfill(&engine, 4).await;
        assert_eq!(scheduler.trigger(PlatformSignal::Idle).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interval_loop_evicts_and_stops() {
        let engine = bounded_engine(2);
        overfill(&engine, 4).await;

        let config = ScheduleConfig {
            interval: Some(Duration::from_millis(30)),
            min_interval: Duration::from_millis(1),
            ..ScheduleConfig::default()
        };
        let scheduler = EvictionScheduler::new(engine.clone(), config);
        let handle = scheduler.spawn();

        sleep(Duration::from_millis(120)).await;
        let keys = engine
            .adapter()
            .get_keys(crate::storage::Paging::all())
            .await
            .unwrap();
        assert!(keys.len() <= 2);

        engine.shutdown();
        handle.await.unwrap();
    }

    #[test]
    fn test_seconds_until_wraps_midnight() {
        // 01:00 target, 02:00 now: 23 hours away
        assert_eq!(seconds_until(3600, 7200), 23 * 3600);
        // 02:00 target, 01:00 now: one hour away
        assert_eq!(seconds_until(7200, 3600), 3600);
        // exactly now: a full day away
        assert_eq!(seconds_until(3600, 3600), SECONDS_PER_DAY);
    }

    #[test]
    fn test_time_of_day_clamps() {
        let t = TimeOfDay::new(99, 99);
        assert_eq!(t.hour, 23);
        assert_eq!(t.minute, 59);
    }
}
