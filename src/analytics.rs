//! Access and size accounting
//!
//! Analytics is the authoritative source for eviction ordering: per-key
//! access counts, last-access times and estimated sizes, plus engine-wide
//! hit/miss/put/delete counters. Nothing here is durable across restarts.
//!
//! Locking: counters are atomics; the per-key maps sit behind a single
//! `parking_lot::Mutex` that is never held across an adapter call.

use crate::item::now_millis;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bounded length of the recent-operation log
const OP_LOG_CAP: usize = 128;

/// Operation kinds recorded in the bounded log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Hit,
    Miss,
    Put,
    Delete,
    Clear,
}

/// One entry of the recent-operation log
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OpKind,
    pub key: Option<String>,
    /// Milliseconds since epoch
    pub at: u64,
}

#[derive(Default)]
struct KeyState {
    access_counts: HashMap<String, u64>,
    last_access: HashMap<String, u64>,
    sizes: HashMap<String, u64>,
    total_size: u64,
    max_size_seen: u64,
    recent_ops: VecDeque<Operation>,
}

impl KeyState {
    fn log(&mut self, kind: OpKind, key: Option<&str>) {
        if self.recent_ops.len() == OP_LOG_CAP {
            self.recent_ops.pop_front();
        }
        self.recent_ops.push_back(Operation {
            kind,
            key: key.map(str::to_owned),
            at: now_millis(),
        });
    }
}

/// Per-key snapshot handed to eviction strategies.
///
/// Taken under the lock and released before any adapter call.
#[derive(Debug, Clone, Default)]
pub struct KeyStatsSnapshot {
    pub access_counts: HashMap<String, u64>,
    pub last_access: HashMap<String, u64>,
}

impl KeyStatsSnapshot {
    /// True when no access has ever been recorded
    pub fn is_empty(&self) -> bool {
        self.access_counts.is_empty() && self.last_access.is_empty()
    }
}

/// Derived view over the analytics state
#[derive(Debug, Clone)]
pub struct AnalyticsSummary {
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub put_count: u64,
    pub delete_count: u64,
    pub clear_count: u64,
    pub total_size: u64,
    pub max_size_seen: u64,
    pub tracked_keys: usize,
    pub average_item_size: f64,
    pub uptime: Duration,
    pub most_frequently_accessed: Vec<(String, u64)>,
    pub most_recently_accessed: Vec<(String, u64)>,
    pub largest_items: Vec<(String, u64)>,
}

/// Engine-wide analytics state
pub struct Analytics {
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    put_count: AtomicU64,
    delete_count: AtomicU64,
    clear_count: AtomicU64,
    start_time: Instant,
    state: Mutex<KeyState>,
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
            clear_count: AtomicU64::new(0),
            start_time: Instant::now(),
            state: Mutex::new(KeyState::default()),
        }
    }

    /// Record a successful read
    pub fn record_hit(&self, key: &str) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        *state.access_counts.entry(key.to_owned()).or_insert(0) += 1;
        state.last_access.insert(key.to_owned(), now_millis());
        state.log(OpKind::Hit, Some(key));
    }

    /// Record a failed read; per-key state is untouched
    pub fn record_miss(&self, key: &str) {
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        self.state.lock().log(OpKind::Miss, Some(key));
    }

    /// Record a write with its estimated size; the total is adjusted by
    /// `new − old` so overwrites do not inflate it
    pub fn record_put(&self, key: &str, size: u64) {
        self.put_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        let old = state.sizes.insert(key.to_owned(), size).unwrap_or(0);
        state.total_size = state.total_size.saturating_sub(old) + size;
        state.max_size_seen = state.max_size_seen.max(state.total_size);
        state.log(OpKind::Put, Some(key));
    }

    /// Record a removal and forget the key
    pub fn record_delete(&self, key: &str) {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        if let Some(old) = state.sizes.remove(key) {
            state.total_size = state.total_size.saturating_sub(old);
        }
        state.access_counts.remove(key);
        state.last_access.remove(key);
        state.log(OpKind::Delete, Some(key));
    }

    /// Record a full clear
    pub fn record_clear(&self) {
        self.clear_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        state.sizes.clear();
        state.access_counts.clear();
        state.last_access.clear();
        state.total_size = 0;
        state.log(OpKind::Clear, None);
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count.load(Ordering::Relaxed)
    }

    pub fn put_count(&self) -> u64 {
        self.put_count.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> u64 {
        self.delete_count.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`; 0.0 before any read
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn total_size(&self) -> u64 {
        self.state.lock().total_size
    }

    pub fn max_size_seen(&self) -> u64 {
        self.state.lock().max_size_seen
    }

    pub fn average_item_size(&self) -> f64 {
        let state = self.state.lock();
        if state.sizes.is_empty() {
            0.0
        } else {
            state.total_size as f64 / state.sizes.len() as f64
        }
    }

    /// Estimated size recorded for one key
    pub fn size_of(&self, key: &str) -> Option<u64> {
        self.state.lock().sizes.get(key).copied()
    }

    /// Clone of the per-key access state for eviction ordering
    pub fn key_stats_snapshot(&self) -> KeyStatsSnapshot {
        let state = self.state.lock();
        KeyStatsSnapshot {
            access_counts: state.access_counts.clone(),
            last_access: state.last_access.clone(),
        }
    }

    /// Recent operations, oldest first
    pub fn recent_operations(&self) -> Vec<Operation> {
        self.state.lock().recent_ops.iter().cloned().collect()
    }

    /// Zero every counter and forget all per-key state
    pub fn reset(&self) {
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
        self.put_count.store(0, Ordering::Relaxed);
        self.delete_count.store(0, Ordering::Relaxed);
        self.clear_count.store(0, Ordering::Relaxed);
        let mut state = self.state.lock();
        *state = KeyState::default();
    }

    /// Derived summary: hit rate, top-10 lists, uptime
    pub fn summary(&self) -> AnalyticsSummary {
        let hits = self.hit_count();
        let misses = self.miss_count();
        let state = self.state.lock();

        AnalyticsSummary {
            hit_count: hits,
            miss_count: misses,
            hit_rate: if hits + misses == 0 {
                0.0
            } else {
                hits as f64 / (hits + misses) as f64
            },
            put_count: self.put_count(),
            delete_count: self.delete_count(),
            clear_count: self.clear_count.load(Ordering::Relaxed),
            total_size: state.total_size,
            max_size_seen: state.max_size_seen,
            tracked_keys: state.sizes.len(),
            average_item_size: if state.sizes.is_empty() {
                0.0
            } else {
                state.total_size as f64 / state.sizes.len() as f64
            },
            uptime: self.start_time.elapsed(),
            most_frequently_accessed: top_by(&state.access_counts),
            most_recently_accessed: top_by(&state.last_access),
            largest_items: top_by(&state.sizes),
        }
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

/// Top 10 entries by descending value, key order breaking ties
fn top_by(map: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(10);
    entries
}
