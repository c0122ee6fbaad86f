//! Eviction engine: pressure detection and victim selection
//!
//! After every successful put (and on demand) `check_and_evict` measures
//! the cache against the configured limits and, under pressure, evicts
//! victims until both size and count sit at or below 80% of their limits.
//! The hysteresis target keeps back-to-back puts from thrashing.
//!
//! Victim order: priority tier first (Low before Normal before High,
//! Critical never), then the strategy's secondary key, then lexicographic
//! key order. Concurrent passes coalesce into one.

use crate::analytics::{Analytics, KeyStatsSnapshot};
use crate::config::EvictionConfig;
use crate::item::{CacheItem, Priority};
use crate::storage::{Paging, StorageAdapter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

/// Victim-selection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently used, from analytics last-access times
    #[default]
    Lru,
    /// Least frequently used, from analytics access counts
    Lfu,
    /// Oldest creation time first
    Fifo,
    /// Shortest remaining time-to-live first
    Ttl,
}

/// Hysteresis: evict down to this fraction of each limit
const TARGET_FRACTION_NUM: u64 = 4;
const TARGET_FRACTION_DEN: u64 = 5;

/// Phases of one eviction pass, for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Idle,
    Measuring,
    Selecting,
    Evicting,
}

struct Candidate {
    key: String,
    priority: Priority,
    /// (group, value): group 0 sorts before group 1, value ascending
    secondary: (u8, u64),
}

/// Clears the single-flight flag when the pass ends, error or not
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Eviction engine shared by the cache engine and the scheduler
pub struct EvictionEngine {
    adapter: Arc<dyn StorageAdapter>,
    analytics: Arc<Analytics>,
    config: EvictionConfig,
    evicting: AtomicBool,
    evicted_total: AtomicU64,
}

impl EvictionEngine {
    pub fn new(
        adapter: Arc<dyn StorageAdapter>,
        analytics: Arc<Analytics>,
        config: EvictionConfig,
    ) -> Self {
        Self {
            adapter,
            analytics,
            config,
            evicting: AtomicBool::new(false),
            evicted_total: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EvictionConfig {
        &self.config
    }

    /// Total items evicted by pressure over the engine lifetime
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }

    /// Run one eviction pass if limits are configured and pressure exists.
    ///
    /// Returns the number of evicted items. Concurrent calls coalesce: while
    /// a pass runs, other callers return immediately with 0.
    pub async fn check_and_evict(&self) -> crate::Result<usize> {
        if !self.config.has_limits() {
            return Ok(0);
        }

        if self
            .evicting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("eviction pass already running, coalescing");
            return Ok(0);
        }
        let _guard = PassGuard(&self.evicting);

        self.run_pass(self.config.strategy).await
    }

    /// Rescue path: evict strictly by priority tier (Low, then Normal, then
    /// High; Critical is untouchable) until pressure clears.
    pub async fn evict_by_priority(&self) -> crate::Result<usize> {
        if !self.config.has_limits() {
            return Ok(0);
        }
        if self
            .evicting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(0);
        }
        let _guard = PassGuard(&self.evicting);

        let Some((keys, _)) = self.measure().await? else {
            return Ok(0);
        };
        let candidates = self.select(&keys, None).await?;
        self.evict(candidates, keys.len()).await
    }

    async fn run_pass(&self, strategy: EvictionStrategy) -> crate::Result<usize> {
        debug!(state = ?PassState::Measuring, "eviction pass started");
        let Some((keys, total_size)) = self.measure().await? else {
            debug!(state = ?PassState::Idle, "no pressure");
            return Ok(0);
        };

        debug!(
            state = ?PassState::Selecting,
            strategy = ?strategy,
            item_count = keys.len(),
            total_size,
            "pressure detected"
        );
        let mut candidates = self.select(&keys, Some(strategy)).await?;
        if candidates.is_empty() {
            // every item is Critical or the store raced to empty
            warn!("strategy found no victims, falling back to priority tiers");
            candidates = self.select(&keys, None).await?;
        }

        self.evict(candidates, keys.len()).await
    }

    /// Measure pressure; `None` when within limits
    async fn measure(&self) -> crate::Result<Option<(Vec<String>, u64)>> {
        let keys = self.adapter.get_keys(Paging::all()).await?;
        let total_size = self.analytics.total_size();

        let size_over = self.config.max_size.is_some_and(|max| total_size > max);
        let count_over = self.config.max_items.is_some_and(|max| keys.len() > max);

        Ok((size_over || count_over).then_some((keys, total_size)))
    }

    /// Build the ordered victim list. `strategy = None` orders purely by
    /// priority tier.
    async fn select(
        &self,
        keys: &[String],
        strategy: Option<EvictionStrategy>,
    ) -> crate::Result<Vec<Candidate>> {
        let loaded = self.adapter.get_all(keys).await?;
        let snapshot = self.analytics.key_stats_snapshot();

        let mut candidates: Vec<Candidate> = loaded
            .into_iter()
            .filter_map(|(key, item)| {
                let item = item?;
                if item.priority == Priority::Critical {
                    return None;
                }
                let secondary = match strategy {
                    Some(s) => secondary_key(s, &key, &item, &snapshot),
                    None => (0, 0),
                };
                Some(Candidate {
                    key,
                    priority: item.priority,
                    secondary,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.secondary.cmp(&b.secondary))
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(candidates)
    }

    /// Evict victims in order until both limits sit at the hysteresis target
    async fn evict(
        &self,
        candidates: Vec<Candidate>,
        item_count: usize,
    ) -> crate::Result<usize> {
        debug!(state = ?PassState::Evicting, victims = candidates.len(), "evicting");

        let size_target = self
            .config
            .max_size
            .map(|max| (max * TARGET_FRACTION_NUM).div_ceil(TARGET_FRACTION_DEN));
        let count_target = self
            .config
            .max_items
            .map(|max| (max * TARGET_FRACTION_NUM as usize).div_ceil(TARGET_FRACTION_DEN as usize));

        let mut count = item_count;
        let mut evicted = 0usize;

        for candidate in candidates {
            let size_ok = size_target.is_none_or(|t| self.analytics.total_size() <= t);
            let count_ok = count_target.is_none_or(|t| count <= t);
            if size_ok && count_ok {
                break;
            }

            self.adapter.delete(&candidate.key).await?;
            self.analytics.record_delete(&candidate.key);
            count -= 1;
            evicted += 1;
            trace!(key = %candidate.key, priority = ?candidate.priority, "evicted");
        }

        if evicted > 0 {
            self.evicted_total
                .fetch_add(evicted as u64, Ordering::Relaxed);
            info!(
                evicted,
                remaining = count,
                total_size = self.analytics.total_size(),
                "eviction pass completed"
            );
        }
        debug!(state = ?PassState::Idle, "eviction pass finished");
        Ok(evicted)
    }
}

/// Strategy secondary sort key for one candidate.
///
/// Lower sorts first. The group byte lets TTL put expiring items ahead of
/// never-expiring ones, which fall back to LRU order.
fn secondary_key(
    strategy: EvictionStrategy,
    key: &str,
    item: &CacheItem,
    snapshot: &KeyStatsSnapshot,
) -> (u8, u64) {
    match strategy {
        EvictionStrategy::Lru => {
            if snapshot.is_empty() {
                // no analytics yet: fall back to FIFO
                (0, item.created_at)
            } else {
                (0, snapshot.last_access.get(key).copied().unwrap_or(0))
            }
        }
        EvictionStrategy::Lfu => {
            if snapshot.is_empty() {
                (0, item.created_at)
            } else {
                (0, snapshot.access_counts.get(key).copied().unwrap_or(0))
            }
        }
        EvictionStrategy::Fifo => (0, item.created_at),
        EvictionStrategy::Ttl => match item.remaining_ttl() {
            Some(remaining) => (0, remaining),
            // no expiry: after every expiring item, in LRU order
            None => (1, snapshot.last_access.get(key).copied().unwrap_or(0)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;
    use bytes::Bytes;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn item_with(priority: Priority, expiry: Option<Duration>) -> CacheItem {
        CacheItem::new(
            Bytes::from_static(b"v"),
            expiry,
            None,
            priority,
            BTreeSet::new(),
        )
    }

    async fn engine_with_items(
        config: EvictionConfig,
        items: Vec<(&str, CacheItem)>,
    ) -> (EvictionEngine, Arc<dyn StorageAdapter>, Arc<Analytics>) {
        let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
        let analytics = Arc::new(Analytics::new());
        for (key, item) in items {
            analytics.record_put(key, 10);
            adapter.put(key, item).await.unwrap();
        }
        (
            EvictionEngine::new(Arc::clone(&adapter), Arc::clone(&analytics), config),
            adapter,
            analytics,
        )
    }

    #[tokio::test]
    async fn test_no_limits_no_pass() {
        let (engine, _, _) = engine_with_items(
            EvictionConfig::default(),
            vec![("a", item_with(Priority::Normal, None))],
        )
        .await;
        assert_eq!(engine.check_and_evict().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_pressure_no_eviction() {
        let config = EvictionConfig {
            max_items: Some(10),
            ..EvictionConfig::default()
        };
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![("a", item_with(Priority::Normal, None))],
        )
        .await;
        assert_eq!(engine.check_and_evict().await.unwrap(), 0);
        assert!(adapter.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used() {
        let config = EvictionConfig {
            max_items: Some(3),
            strategy: EvictionStrategy::Lru,
            ..EvictionConfig::default()
        };
        let (engine, adapter, analytics) = engine_with_items(
            config,
            vec![
                ("a", item_with(Priority::Normal, None)),
                ("b", item_with(Priority::Normal, None)),
                ("c", item_with(Priority::Normal, None)),
                ("d", item_with(Priority::Normal, None)),
            ],
        )
        .await;

        // touch everything except b; b becomes the LRU victim
        analytics.record_hit("a");
        analytics.record_hit("c");
        analytics.record_hit("d");

        let evicted = engine.check_and_evict().await.unwrap();
        assert!(evicted >= 1);
        assert!(adapter.get("b").await.unwrap().is_none());
        assert!(adapter.get("d").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lfu_evicts_least_frequent() {
        let config = EvictionConfig {
            max_items: Some(2),
            strategy: EvictionStrategy::Lfu,
            ..EvictionConfig::default()
        };
        let (engine, adapter, analytics) = engine_with_items(
            config,
            vec![
                ("hot", item_with(Priority::Normal, None)),
                ("warm", item_with(Priority::Normal, None)),
                ("cold", item_with(Priority::Normal, None)),
            ],
        )
        .await;

        for _ in 0..5 {
            analytics.record_hit("hot");
        }
        analytics.record_hit("warm");

        engine.check_and_evict().await.unwrap();
        assert!(adapter.get("cold").await.unwrap().is_none());
        assert!(adapter.get("hot").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fifo_evicts_oldest() {
        let config = EvictionConfig {
            max_items: Some(2),
            strategy: EvictionStrategy::Fifo,
            ..EvictionConfig::default()
        };
        let mut first = item_with(Priority::Normal, None);
        first.created_at -= 10_000;
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![
                ("newer", item_with(Priority::Normal, None)),
                ("older", first),
                ("newest", item_with(Priority::Normal, None)),
            ],
        )
        .await;

        engine.check_and_evict().await.unwrap();
        assert!(adapter.get("older").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_evicts_shortest_remaining() {
        let config = EvictionConfig {
            max_items: Some(3),
            strategy: EvictionStrategy::Ttl,
            ..EvictionConfig::default()
        };
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![
                ("soon", item_with(Priority::Normal, Some(Duration::from_secs(5)))),
                ("later", item_with(Priority::Normal, Some(Duration::from_secs(3600)))),
                ("latest", item_with(Priority::Normal, Some(Duration::from_secs(7200)))),
                ("forever", item_with(Priority::Normal, None)),
            ],
        )
        .await;

        // 4 items over a 3 limit: the shortest remaining TTL goes first;
        // the never-expiring item outlives every expiring one
        engine.check_and_evict().await.unwrap();
        assert!(adapter.get("soon").await.unwrap().is_none());
        assert!(adapter.get("later").await.unwrap().is_some());
        assert!(adapter.get("latest").await.unwrap().is_some());
        assert!(adapter.get("forever").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_critical_items_immune() {
        let config = EvictionConfig {
            max_items: Some(1),
            strategy: EvictionStrategy::Lru,
            ..EvictionConfig::default()
        };
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![
                ("precious", item_with(Priority::Critical, None)),
                ("vital", item_with(Priority::Critical, None)),
                ("expendable", item_with(Priority::Low, None)),
            ],
        )
        .await;

        engine.check_and_evict().await.unwrap();
        assert!(adapter.get("precious").await.unwrap().is_some());
        assert!(adapter.get("vital").await.unwrap().is_some());
        assert!(adapter.get("expendable").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lower_priority_evicted_first() {
        let config = EvictionConfig {
            max_items: Some(2),
            strategy: EvictionStrategy::Lru,
            ..EvictionConfig::default()
        };
        let (engine, adapter, analytics) = engine_with_items(
            config,
            vec![
                ("low", item_with(Priority::Low, None)),
                ("high", item_with(Priority::High, None)),
                ("normal", item_with(Priority::Normal, None)),
            ],
        )
        .await;

        // make the low-priority item the most recently used; priority
        // still outranks recency
        analytics.record_hit("low");

        engine.check_and_evict().await.unwrap();
        assert!(adapter.get("low").await.unwrap().is_none());
        assert!(adapter.get("high").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hysteresis_target() {
        let config = EvictionConfig {
            max_items: Some(10),
            strategy: EvictionStrategy::Fifo,
            ..EvictionConfig::default()
        };
        let items: Vec<(String, CacheItem)> = (0..12)
            .map(|i| (format!("k{i:02}"), item_with(Priority::Normal, None)))
            .collect();
        let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
        let analytics = Arc::new(Analytics::new());
        for (key, item) in items {
            analytics.record_put(&key, 10);
            adapter.put(&key, item).await.unwrap();
        }
        let engine = EvictionEngine::new(Arc::clone(&adapter), analytics, config);

        engine.check_and_evict().await.unwrap();
        // 12 items, target is 8
        let remaining = adapter.get_keys(Paging::all()).await.unwrap();
        assert_eq!(remaining.len(), 8);
        assert_eq!(engine.evicted_total(), 4);
    }

    #[tokio::test]
    async fn test_size_pressure() {
        let config = EvictionConfig {
            max_size: Some(100),
            strategy: EvictionStrategy::Lru,
            ..EvictionConfig::default()
        };
        let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
        let analytics = Arc::new(Analytics::new());
        for key in ["a", "b", "c"] {
            analytics.record_put(key, 50);
            adapter.put(key, item_with(Priority::Normal, None)).await.unwrap();
        }
        let engine = EvictionEngine::new(Arc::clone(&adapter), Arc::clone(&analytics), config);

        engine.check_and_evict().await.unwrap();
        // 150 bytes over a 100 limit, target 80: two victims
        assert!(analytics.total_size() <= 80);
    }

    #[tokio::test]
    async fn test_evict_by_priority_rescue() {
        let config = EvictionConfig {
            max_items: Some(2),
            ..EvictionConfig::default()
        };
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![
                ("a", item_with(Priority::Normal, None)),
                ("b", item_with(Priority::Low, None)),
                ("c", item_with(Priority::High, None)),
            ],
        )
        .await;

        let evicted = engine.evict_by_priority().await.unwrap();
        assert!(evicted >= 1);
        // Low tier goes first
        assert!(adapter.get("b").await.unwrap().is_none());
        assert!(adapter.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_all_critical_leaves_store_intact() {
        let config = EvictionConfig {
            max_items: Some(1),
            ..EvictionConfig::default()
        };
        let (engine, adapter, _) = engine_with_items(
            config,
            vec![
                ("a", item_with(Priority::Critical, None)),
                ("b", item_with(Priority::Critical, None)),
            ],
        )
        .await;

        assert_eq!(engine.check_and_evict().await.unwrap(), 0);
        assert_eq!(adapter.get_keys(Paging::all()).await.unwrap().len(), 2);
    }
}
