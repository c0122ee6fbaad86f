//! Two-engine synchronization
//!
//! Copies items between a local and a remote engine in batches, resolving
//! per-key conflicts with a selectable strategy. Items move at the adapter
//! level so access history and expiry metadata survive the trip; repeating
//! a bidirectional sync is therefore a no-op.
//!
//! In one-way mode the remote is authoritative: keys absent from it are
//! deleted locally.

use crate::engine::CacheEngine;
use crate::item::CacheItem;
use crate::policy::CachePolicy;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Keys processed per batch
const SYNC_BATCH: usize = 50;

/// Event stream capacity; slow subscribers drop the oldest events
const EVENT_CAPACITY: usize = 64;

/// How to settle a key present on both sides with different contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictResolution {
    /// The more recently accessed item wins
    #[default]
    NewerWins,
    RemoteWins,
    LocalWins,
    /// Deep-merge JSON objects, remote fields winning
    MergePreferRemote,
    /// Deep-merge JSON objects, local fields winning
    MergePreferLocal,
}

/// Options for one synchronization run
#[derive(Default, Clone)]
pub struct SyncOptions {
    /// Restrict the run to these keys; `None` = union of both key sets
    pub keys: Option<Vec<String>>,
    /// Re-stamp items written during the run with this policy
    pub policy: Option<CachePolicy>,
    /// Push local-only keys to the remote instead of deleting them locally
    pub bidirectional: bool,
    pub conflict_resolution: ConflictResolution,
}

/// Events emitted during a run
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started { total: usize },
    BatchUpdate { keys: Vec<String> },
    BatchDelete { keys: Vec<String> },
    Completed { updated: usize, deleted: usize },
    Error { message: String },
}

/// Outcome of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub examined: usize,
    pub updated_local: usize,
    pub updated_remote: usize,
    pub deleted_local: usize,
}

impl SyncStats {
    pub fn updated(&self) -> usize {
        self.updated_local + self.updated_remote
    }
}

/// Synchronizes a local engine against a remote one
pub struct Synchronizer {
    local: CacheEngine,
    events: broadcast::Sender<SyncEvent>,
}

impl Synchronizer {
    pub fn new(local: CacheEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { local, events }
    }

    /// Stream of sync events. Best-effort: a lagging subscriber loses the
    /// oldest events.
    pub fn events(&self) -> BroadcastStream<SyncEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Run one synchronization pass against `remote`
    pub async fn sync_with(
        &self,
        remote: &CacheEngine,
        options: SyncOptions,
    ) -> crate::Result<SyncStats> {
        match self.run(remote, &options).await {
            Ok(stats) => {
                let _ = self.events.send(SyncEvent::Completed {
                    updated: stats.updated(),
                    deleted: stats.deleted_local,
                });
                info!(
                    examined = stats.examined,
                    updated = stats.updated(),
                    deleted = stats.deleted_local,
                    "sync completed"
                );
                Ok(stats)
            }
            Err(e) => {
                let _ = self.events.send(SyncEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(&self, remote: &CacheEngine, options: &SyncOptions) -> crate::Result<SyncStats> {
        let keys = match &options.keys {
            Some(keys) => keys.clone(),
            None => {
                let mut keys = self
                    .local
                    .adapter()
                    .get_keys(crate::storage::Paging::all())
                    .await?;
                let remote_keys = remote
                    .adapter()
                    .get_keys(crate::storage::Paging::all())
                    .await?;
                for key in remote_keys {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            }
        };

        let _ = self.events.send(SyncEvent::Started { total: keys.len() });
        let mut stats = SyncStats {
            examined: keys.len(),
            ..SyncStats::default()
        };

        for chunk in keys.chunks(SYNC_BATCH) {
            let local_items = self.local.adapter().get_all(chunk).await?;
            let remote_items = remote.adapter().get_all(chunk).await?;

            let mut updated = Vec::new();
            let mut deleted = Vec::new();

            for ((key, local_item), (_, remote_item)) in
                local_items.into_iter().zip(remote_items)
            {
                match (local_item, remote_item) {
                    (Some(local), Some(remote_it)) => {
                        if items_equal(&local, &remote_it) {
                            continue;
                        }
                        self.settle_conflict(
                            remote,
                            options,
                            &key,
                            local,
                            remote_it,
                            &mut stats,
                            &mut updated,
                        )
                        .await?;
                    }
                    (Some(local), None) => {
                        if options.bidirectional {
                            remote
                                .import_item(&key, restamp(local, options.policy.as_ref()))
                                .await?;
                            stats.updated_remote += 1;
                            updated.push(key);
                        } else {
                            // remote is authoritative in one-way mode
                            self.local.delete(&key).await?;
                            stats.deleted_local += 1;
                            deleted.push(key);
                        }
                    }
                    (None, Some(remote_it)) => {
                        self.local
                            .import_item(&key, restamp(remote_it, options.policy.as_ref()))
                            .await?;
                        stats.updated_local += 1;
                        updated.push(key);
                    }
                    (None, None) => {}
                }
            }

            if !updated.is_empty() {
                let _ = self.events.send(SyncEvent::BatchUpdate { keys: updated });
            }
            if !deleted.is_empty() {
                let _ = self.events.send(SyncEvent::BatchDelete { keys: deleted });
            }
        }

        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle_conflict(
        &self,
        remote: &CacheEngine,
        options: &SyncOptions,
        key: &str,
        local: CacheItem,
        remote_it: CacheItem,
        stats: &mut SyncStats,
        updated: &mut Vec<String>,
    ) -> crate::Result<()> {
        let policy = options.policy.as_ref();
        match options.conflict_resolution {
            ConflictResolution::NewerWins => {
                if remote_it.last_accessed_at > local.last_accessed_at {
                    self.local.import_item(key, restamp(remote_it, policy)).await?;
                    stats.updated_local += 1;
                    updated.push(key.to_owned());
                } else if local.last_accessed_at > remote_it.last_accessed_at
                    && options.bidirectional
                {
                    remote.import_item(key, restamp(local, policy)).await?;
                    stats.updated_remote += 1;
                    updated.push(key.to_owned());
                }
            }
            ConflictResolution::RemoteWins => {
                self.local.import_item(key, restamp(remote_it, policy)).await?;
                stats.updated_local += 1;
                updated.push(key.to_owned());
            }
            ConflictResolution::LocalWins => {
                if options.bidirectional {
                    remote.import_item(key, restamp(local, policy)).await?;
                    stats.updated_remote += 1;
                    updated.push(key.to_owned());
                }
            }
            ConflictResolution::MergePreferRemote | ConflictResolution::MergePreferLocal => {
                let prefer_remote = matches!(
                    options.conflict_resolution,
                    ConflictResolution::MergePreferRemote
                );
                let merged = merge_items(key, &local, &remote_it, prefer_remote);
                let merged = restamp(merged, policy);
                self.local.import_item(key, merged.clone()).await?;
                stats.updated_local += 1;
                if options.bidirectional {
                    remote.import_item(key, merged).await?;
                    stats.updated_remote += 1;
                }
                updated.push(key.to_owned());
            }
        }
        Ok(())
    }
}

/// Items count as in sync when payload and access recency agree
fn items_equal(a: &CacheItem, b: &CacheItem) -> bool {
    a.payload == b.payload
        && a.last_accessed_at == b.last_accessed_at
        && a.expiry == b.expiry
}

/// Re-stamp expiry, sliding TTL and priority from a sync policy
fn restamp(mut item: CacheItem, policy: Option<&CachePolicy>) -> CacheItem {
    if let Some(policy) = policy {
        if let Some(expiry) = policy.expiry {
            item.expiry = Some(crate::item::now_millis() + crate::item::duration_millis(expiry));
        }
        item.sliding_ttl = policy.sliding_ttl.map(crate::item::duration_millis);
        item.priority = policy.priority;
    }
    item
}

/// Deep-merge two items' JSON payloads. Non-object payloads (or payloads
/// that do not decode) fall back to the preferred side wholesale.
fn merge_items(key: &str, local: &CacheItem, remote: &CacheItem, prefer_remote: bool) -> CacheItem {
    let preferred = if prefer_remote { remote } else { local };

    let (Some(local_json), Some(remote_json)) = (decode_json(local), decode_json(remote)) else {
        warn!(key, "merge fell back to preferred side: payload not decodable");
        return preferred.clone();
    };

    let merged = match (local_json, remote_json) {
        (Value::Object(local_map), Value::Object(remote_map)) => {
            let (mut base, overlay) = if prefer_remote {
                (local_map, remote_map)
            } else {
                (remote_map, local_map)
            };
            for (field, value) in overlay {
                base.insert(field, value);
            }
            Value::Object(base)
        }
        _ => {
            debug!(key, "payloads are not both objects, taking preferred side");
            return preferred.clone();
        }
    };

    let mut item = preferred.clone();
    item.payload = Bytes::from(merged.to_string().into_bytes());
    item.is_compressed = false;
    item.original_size = None;
    item.compression_ratio = None;
    item
}

fn decode_json(item: &CacheItem) -> Option<Value> {
    let raw = if item.is_compressed {
        crate::codec::decompress(&item.payload).ok()?
    } else {
        item.payload.clone()
    };
    serde_json::from_slice(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PutOptions;
    use serde_json::json;
    use tokio_stream::StreamExt;

    async fn seed(engine: &CacheEngine, pairs: &[(&str, u32)]) {
        for (key, value) in pairs {
            engine.put(*key, value, PutOptions::new()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_one_way_pull_deletes_local_strays() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&local, &[("stray", 1)]).await;
        seed(&remote, &[("shared", 2)]).await;

        let sync = Synchronizer::new(local.clone());
        let stats = sync
            .sync_with(&remote, SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.updated_local, 1);
        assert_eq!(stats.deleted_local, 1);
        assert_eq!(local.get::<u32>("shared").await.unwrap(), Some(2));
        assert_eq!(local.get::<u32>("stray").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bidirectional_unions_key_sets() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&local, &[("mine", 1)]).await;
        seed(&remote, &[("theirs", 2)]).await;

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            bidirectional: true,
            ..SyncOptions::default()
        };
        sync.sync_with(&remote, options).await.unwrap();

        assert_eq!(local.get::<u32>("theirs").await.unwrap(), Some(2));
        assert_eq!(remote.get::<u32>("mine").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_newer_wins() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&local, &[("k", 1)]).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        seed(&remote, &[("k", 2)]).await;

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            bidirectional: true,
            conflict_resolution: ConflictResolution::NewerWins,
            ..SyncOptions::default()
        };
        sync.sync_with(&remote, options).await.unwrap();

        assert_eq!(local.get::<u32>("k").await.unwrap(), Some(2));
        assert_eq!(remote.get::<u32>("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_local_wins_pushes_to_remote() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&local, &[("k", 1)]).await;
        seed(&remote, &[("k", 2)]).await;

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            bidirectional: true,
            conflict_resolution: ConflictResolution::LocalWins,
            ..SyncOptions::default()
        };
        sync.sync_with(&remote, options).await.unwrap();

        assert_eq!(remote.get::<u32>("k").await.unwrap(), Some(1));
        assert_eq!(local.get::<u32>("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_merge_prefer_remote() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        local
            .put("cfg", &json!({"a": 1, "b": 1}), PutOptions::new())
            .await
            .unwrap();
        remote
            .put("cfg", &json!({"b": 2, "c": 3}), PutOptions::new())
            .await
            .unwrap();

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            conflict_resolution: ConflictResolution::MergePreferRemote,
            ..SyncOptions::default()
        };
        sync.sync_with(&remote, options).await.unwrap();

        let merged: Option<Value> = local.get("cfg").await.unwrap();
        assert_eq!(merged, Some(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[tokio::test]
    async fn test_bidirectional_sync_is_idempotent() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&local, &[("a", 1), ("b", 2)]).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        seed(&remote, &[("b", 20), ("c", 3)]).await;

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            bidirectional: true,
            ..SyncOptions::default()
        };
        let first = sync.sync_with(&remote, options.clone()).await.unwrap();
        assert!(first.updated() > 0);

        // both sides now identical: the second run moves nothing
        let second = sync.sync_with(&remote, options).await.unwrap();
        assert_eq!(second.updated(), 0);
        assert_eq!(second.deleted_local, 0);

        for key in ["a", "b", "c"] {
            let l = local.adapter().get(key).await.unwrap().unwrap();
            let r = remote.adapter().get(key).await.unwrap().unwrap();
            assert_eq!(l.payload, r.payload);
        }
    }

    #[tokio::test]
    async fn test_explicit_key_subset() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&remote, &[("wanted", 1), ("ignored", 2)]).await;

        let sync = Synchronizer::new(local.clone());
        let options = SyncOptions {
            keys: Some(vec!["wanted".into()]),
            ..SyncOptions::default()
        };
        sync.sync_with(&remote, options).await.unwrap();

        assert_eq!(local.get::<u32>("wanted").await.unwrap(), Some(1));
        assert_eq!(local.get::<u32>("ignored").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_events_bracket_the_run() {
        let local = CacheEngine::in_memory();
        let remote = CacheEngine::in_memory();
        seed(&remote, &[("k", 1)]).await;

        let sync = Synchronizer::new(local);
        let mut events = sync.events();
        sync.sync_with(&remote, SyncOptions::default())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(Some(Ok(event))) = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            events.next(),
        )
        .await
        {
            kinds.push(event);
        }

        assert!(matches!(kinds.first(), Some(SyncEvent::Started { total: 1 })));
        assert!(
            kinds
                .iter()
                .any(|e| matches!(e, SyncEvent::BatchUpdate { .. }))
        );
        assert!(
            matches!(kinds.last(), Some(SyncEvent::Completed { updated: 1, .. }))
        );
    }
}
