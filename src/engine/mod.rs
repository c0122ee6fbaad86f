//! Cache engine facade
//!
//! Orchestrates policy resolution, the payload codecs, size accounting,
//! the storage adapter and the eviction engine behind a typed async API.
//! The engine is a cheap-clone handle; auxiliary services hold clones and
//! background refresh tasks are cancelled through the shared shutdown token.

mod refresh;

pub use refresh::{BoxFuture, Refresher};

use crate::analytics::{Analytics, AnalyticsSummary, Operation};
use crate::codec::{self, JsonSerializer, PayloadSerializer};
use crate::config::EvictionConfig;
use crate::error::{CacheError, CodecError};
use crate::evict::EvictionEngine;
use crate::item::CacheItem;
use crate::policy::{CachePolicy, CompressionMode, RefreshStrategy};
use crate::size;
use crate::storage::{MemoryAdapter, Paging, StorageAdapter};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Keys examined per chunk by `invalidate_where`
const INVALIDATE_CHUNK: usize = 256;

/// Per-call options for `put` and `put_all`.
///
/// Inline `expiry`/`sliding_ttl` override the same fields of the policy.
#[derive(Default, Clone)]
pub struct PutOptions {
    pub expiry: Option<Duration>,
    pub sliding_ttl: Option<Duration>,
    pub policy: Option<CachePolicy>,
    pub tags: Vec<String>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn sliding_ttl(mut self, sliding: Duration) -> Self {
        self.sliding_ttl = Some(sliding);
        self
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I: IntoIterator<Item = S>, S: Into<String>>(mut self, tags: I) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

struct EngineInner {
    adapter: Arc<dyn StorageAdapter>,
    analytics: Arc<Analytics>,
    eviction: EvictionEngine,
    serializer: Arc<dyn PayloadSerializer>,
    /// Keys with a background refresh in flight, to collapse duplicates
    refreshing: Mutex<HashSet<String>>,
    shutdown: CancellationToken,
    name: String,
}

/// The cache engine. Clones share all state.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl CacheEngine {
    pub fn new(
        adapter: Arc<dyn StorageAdapter>,
        serializer: Arc<dyn PayloadSerializer>,
        eviction: EvictionConfig,
        name: impl Into<String>,
    ) -> Self {
        let analytics = Arc::new(Analytics::new());
        let eviction = EvictionEngine::new(Arc::clone(&adapter), Arc::clone(&analytics), eviction);
        Self {
            inner: Arc::new(EngineInner {
                adapter,
                analytics,
                eviction,
                serializer,
                refreshing: Mutex::new(HashSet::new()),
                shutdown: CancellationToken::new(),
                name: name.into(),
            }),
        }
    }

    /// Unbounded engine over the in-memory adapter
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryAdapter::new()),
            Arc::new(JsonSerializer),
            EvictionConfig::default(),
            "memory",
        )
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Cancel background refresh tasks and service workers
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub(crate) fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.inner.adapter
    }

    pub(crate) fn analytics(&self) -> &Analytics {
        &self.inner.analytics
    }

    // ---- writes ------------------------------------------------------

    /// Store a value under the key
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: PutOptions,
    ) -> crate::Result<()> {
        self.store(key, value, options, false).await
    }

    /// Like [`CacheEngine::put`] but offloads large-payload compression to
    /// the blocking pool
    pub async fn put_async<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: PutOptions,
    ) -> crate::Result<()> {
        self.store(key, value, options, true).await
    }

    async fn store<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: PutOptions,
        offload: bool,
    ) -> crate::Result<()> {
        validate_key(key)?;
        let policy =
            CachePolicy::resolve(options.policy.as_ref(), options.expiry, options.sliding_ttl);
        let json = serde_json::to_value(value).map_err(CodecError::Json)?;

        let (item, estimated) = self
            .build_item(&json, &policy, &options.tags, offload)
            .await?;

        if policy.encrypt && !self.inner.adapter.encryption_enabled() {
            debug!(
                key,
                adapter = self.inner.adapter.name(),
                "encryption requested but adapter has no key material, ignoring"
            );
        }

        self.inner.analytics.record_put(key, estimated);
        self.inner.adapter.put(key, item).await?;

        if self.inner.eviction.config().has_limits() {
            self.inner.eviction.check_and_evict().await?;
        }
        Ok(())
    }

    /// Serialize, optionally compress, size-gate and assemble an item
    async fn build_item(
        &self,
        json: &serde_json::Value,
        policy: &CachePolicy,
        tags: &[String],
        offload: bool,
    ) -> crate::Result<(CacheItem, u64)> {
        let raw = self.inner.serializer.encode(json)?;
        let compressed = self.maybe_compress(&raw, policy, offload).await?;

        let payload_estimate = match &compressed {
            Some(blob) => blob.len() as u64,
            None => size::estimate_value_size(json),
        };
        let has_expiry = policy.expiry.is_some() || policy.sliding_ttl.is_some();
        let estimated =
            size::estimate_item_size(payload_estimate, has_expiry, policy.sliding_ttl.is_some());

        if let Some(max_size) = policy.max_size
            && estimated > max_size
        {
            return Err(CacheError::ItemTooLarge {
                size: estimated,
                max_size,
            });
        }

        let mut tag_set = BTreeSet::new();
        for tag in tags {
            validate_tag(tag)?;
            tag_set.insert(tag.clone());
        }

        let original_len = raw.len() as u64;
        let payload = compressed.clone().unwrap_or(raw);
        let mut item = CacheItem::new(
            payload,
            policy.expiry,
            policy.sliding_ttl,
            policy.priority,
            tag_set,
        );
        if compressed.is_some() {
            item = item.with_compression(original_len);
        }
        Ok((item, estimated))
    }

    /// Compression decision per the policy mode; `None` means store raw
    async fn maybe_compress(
        &self,
        raw: &Bytes,
        policy: &CachePolicy,
        offload: bool,
    ) -> crate::Result<Option<Bytes>> {
        let level = policy.compression_level;
        match policy.compression {
            CompressionMode::Never => Ok(None),
            CompressionMode::Always => {
                let blob = if offload {
                    codec::compress_offloaded(raw.clone(), level).await?
                } else {
                    codec::compress(raw, level)?
                };
                Ok(Some(blob))
            }
            CompressionMode::Auto => {
                if !codec::should_compress(raw) {
                    return Ok(None);
                }
                let blob = if offload {
                    codec::compress_offloaded(raw.clone(), level).await?
                } else {
                    codec::compress(raw, level)?
                };
                let ratio = raw.len() as f64 / blob.len() as f64;
                Ok((ratio >= codec::MIN_PROFITABLE_RATIO).then_some(blob))
            }
        }
    }

    // ---- reads -------------------------------------------------------

    /// Look up a value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> crate::Result<Option<T>> {
        validate_key(key)?;
        let Some(item) = self.inner.adapter.get(key).await? else {
            self.inner.analytics.record_miss(key);
            return Ok(None);
        };
        if item.is_expired() {
            self.inner.analytics.record_miss(key);
            self.remove(key).await?;
            return Ok(None);
        }
        self.finish_read(key, item, false).await.map(Some)
    }

    /// Async-decompression variant of [`CacheEngine::get`]
    pub async fn get_async<T: DeserializeOwned>(&self, key: &str) -> crate::Result<Option<T>> {
        validate_key(key)?;
        let Some(item) = self.inner.adapter.get(key).await? else {
            self.inner.analytics.record_miss(key);
            return Ok(None);
        };
        if item.is_expired() {
            self.inner.analytics.record_miss(key);
            self.remove(key).await?;
            return Ok(None);
        }
        self.finish_read(key, item, true).await.map(Some)
    }

    /// Look up a value with stale-while-revalidate semantics.
    ///
    /// On a miss or after expiry the refresher (when given) produces a fresh
    /// value which is stored and returned. On a stale hit the policy's
    /// refresh strategy decides between serving the stored value while a
    /// detached task refreshes it, or awaiting the refresh.
    pub async fn get_with<T>(
        &self,
        key: &str,
        policy: Option<&CachePolicy>,
        refresh: Option<Refresher<T>>,
    ) -> crate::Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        validate_key(key)?;

        let item = match self.inner.adapter.get(key).await? {
            None => return self.refresh_miss(key, policy, refresh).await,
            Some(item) if item.is_expired() => {
                self.remove(key).await?;
                return self.refresh_miss(key, policy, refresh).await;
            }
            Some(item) => item,
        };

        if let (Some(policy), Some(refresher)) = (policy, refresh.as_ref())
            && let Some(stale_time) = policy.stale_time
            && item.is_stale(stale_time)
        {
            match policy.refresh_strategy {
                RefreshStrategy::BackgroundRefresh => {
                    self.spawn_background_refresh(key, refresher.clone(), policy.clone());
                }
                RefreshStrategy::ImmediateRefresh => {
                    let value = refresher.call().await?;
                    let options = PutOptions::new().policy(policy.clone());
                    self.put(key, &value, options).await?;
                    return Ok(Some(value));
                }
                RefreshStrategy::Never => {}
            }
        }

        self.finish_read(key, item, false).await.map(Some)
    }

    /// Miss handling for `get_with`: record, optionally refresh and store
    async fn refresh_miss<T>(
        &self,
        key: &str,
        policy: Option<&CachePolicy>,
        refresh: Option<Refresher<T>>,
    ) -> crate::Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.inner.analytics.record_miss(key);
        match refresh {
            Some(refresher) => {
                let value = refresher.call().await?;
                let mut options = PutOptions::new();
                options.policy = policy.cloned();
                self.put(key, &value, options).await?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Spawn a detached, cancellable refresh task. Duplicate refreshes for
    /// the same key collapse into one.
    fn spawn_background_refresh<T>(&self, key: &str, refresher: Refresher<T>, policy: CachePolicy)
    where
        T: Serialize + Send + Sync + 'static,
    {
        {
            let mut refreshing = self.inner.refreshing.lock();
            if !refreshing.insert(key.to_owned()) {
                debug!(key, "background refresh already in flight");
                return;
            }
        }

        let engine = self.clone();
        let token = self.inner.shutdown.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(key = %key, "background refresh cancelled at shutdown");
                }
                result = refresher.call() => match result {
                    Ok(value) => {
                        let options = PutOptions::new().policy(policy);
                        if let Err(e) = engine.put(&key, &value, options).await {
                            warn!(key = %key, error = %e, "background refresh store failed");
                        }
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "background refresh failed");
                    }
                },
            }
            engine.inner.refreshing.lock().remove(&key);
        });
    }

    /// Decompress, decode, update metadata and record the hit
    async fn finish_read<T: DeserializeOwned>(
        &self,
        key: &str,
        item: CacheItem,
        offload: bool,
    ) -> crate::Result<T> {
        let raw = if item.is_compressed && offload {
            match codec::decompress_offloaded(item.payload.clone()).await {
                Ok(plain) => plain,
                Err(e) => {
                    warn!(key, error = %e, "decompression failed, returning raw stored value");
                    item.payload.clone()
                }
            }
        } else {
            self.decode_payload(key, &item)
        };
        let value = self.value_from_bytes(&raw)?;

        // metadata write-back is best-effort; failure must not break the read
        let mut updated = item;
        updated.touch();
        if let Err(e) = self.inner.adapter.put(key, updated).await {
            warn!(key, error = %e, "metadata write-back failed");
        }

        self.inner.analytics.record_hit(key);
        Ok(value)
    }

    /// Decompress a stored payload, falling back to the raw bytes on failure
    fn decode_payload(&self, key: &str, item: &CacheItem) -> Bytes {
        if !item.is_compressed {
            return item.payload.clone();
        }
        match codec::decompress(&item.payload) {
            Ok(plain) => plain,
            Err(e) => {
                warn!(key, error = %e, "decompression failed, returning raw stored value");
                item.payload.clone()
            }
        }
    }

    fn value_from_bytes<T: DeserializeOwned>(&self, raw: &[u8]) -> crate::Result<T> {
        let json = self.inner.serializer.decode(raw)?;
        Ok(serde_json::from_value(json).map_err(CodecError::Json)?)
    }

    // ---- delete / clear / membership ---------------------------------

    /// Remove a key; returns whether it existed
    pub async fn delete(&self, key: &str) -> crate::Result<bool> {
        validate_key(key)?;
        self.remove(key).await
    }

    async fn remove(&self, key: &str) -> crate::Result<bool> {
        let existed = self.inner.adapter.delete(key).await?;
        if existed {
            self.inner.analytics.record_delete(key);
        }
        Ok(existed)
    }

    /// Alias for [`CacheEngine::delete`], ignoring whether the key existed
    pub async fn invalidate(&self, key: &str) -> crate::Result<()> {
        self.delete(key).await.map(|_| ())
    }

    /// Remove every item and zero the size accounting
    pub async fn clear(&self) -> crate::Result<()> {
        self.inner.adapter.clear().await?;
        self.inner.analytics.record_clear();
        Ok(())
    }

    pub async fn contains_key(&self, key: &str) -> crate::Result<bool> {
        validate_key(key)?;
        Ok(self.inner.adapter.contains_key(key).await?)
    }

    /// Load, decode and test every item against the predicate; delete the
    /// matches. Intended for low-frequency administrative use.
    pub async fn invalidate_where<F>(&self, predicate: F) -> crate::Result<usize>
    where
        F: Fn(&str, &serde_json::Value) -> bool,
    {
        let keys = self.inner.adapter.get_keys(Paging::all()).await?;
        let mut removed = 0;

        for chunk in keys.chunks(INVALIDATE_CHUNK) {
            let loaded = self.inner.adapter.get_all(chunk).await?;
            let mut doomed = Vec::new();
            for (key, item) in loaded {
                let Some(item) = item else { continue };
                let raw = self.decode_payload(&key, &item);
                match self.inner.serializer.decode(&raw) {
                    Ok(json) => {
                        if predicate(&key, &json) {
                            doomed.push(key);
                        }
                    }
                    Err(e) => warn!(key = %key, error = %e, "skipping undecodable item"),
                }
            }
            removed += doomed.len();
            self.delete_all(&doomed).await?;
        }
        Ok(removed)
    }

    // ---- batch operations --------------------------------------------

    /// Store several values through the adapter's batch API. Items over the
    /// policy's `max_size` are skipped and logged, not fatal.
    pub async fn put_all<T: Serialize>(
        &self,
        entries: HashMap<String, T>,
        options: PutOptions,
    ) -> crate::Result<()> {
        let policy =
            CachePolicy::resolve(options.policy.as_ref(), options.expiry, options.sliding_ttl);

        let mut batch = Vec::with_capacity(entries.len());
        let mut sizes = Vec::with_capacity(entries.len());
        for (key, value) in &entries {
            validate_key(key)?;
            let json = serde_json::to_value(value).map_err(CodecError::Json)?;
            match self.build_item(&json, &policy, &options.tags, false).await {
                Ok((item, estimated)) => {
                    batch.push((key.clone(), item));
                    sizes.push((key.clone(), estimated));
                }
                Err(CacheError::ItemTooLarge { size, max_size }) => {
                    warn!(key = %key, size, max_size, "skipping oversized item in batch");
                }
                Err(e) => return Err(e),
            }
        }

        if batch.is_empty() {
            return Ok(());
        }
        for (key, estimated) in &sizes {
            self.inner.analytics.record_put(key, *estimated);
        }
        self.inner.adapter.put_all(batch).await?;

        if self.inner.eviction.config().has_limits() {
            self.inner.eviction.check_and_evict().await?;
        }
        Ok(())
    }

    /// Batch lookup. Keys with a refresher are refreshed on miss or expiry;
    /// the rest are simply absent from the result.
    pub async fn get_all<T>(
        &self,
        keys: &[String],
        refreshers: &HashMap<String, Refresher<T>>,
        policy: Option<&CachePolicy>,
    ) -> crate::Result<HashMap<String, T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        for key in keys {
            validate_key(key)?;
        }
        let (mut result, missing) = self.read_batch(keys).await?;

        for key in missing {
            if let Some(refresher) = refreshers.get(&key) {
                let value = refresher.call().await?;
                let mut options = PutOptions::new();
                options.policy = policy.cloned();
                self.put(&key, &value, options).await?;
                result.insert(key, value);
            }
        }
        Ok(result)
    }

    /// Batch read without refresh: returns decoded values and the keys that
    /// were missing or expired. Records hits, misses and deletions; write-back
    /// of touched metadata is best-effort.
    async fn read_batch<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> crate::Result<(HashMap<String, T>, Vec<String>)> {
        let loaded = self.inner.adapter.get_all(keys).await?;

        let mut result = HashMap::new();
        let mut missing = Vec::new();
        let mut expired = Vec::new();
        let mut write_back = Vec::new();

        for (key, maybe_item) in loaded {
            match maybe_item {
                Some(item) if item.is_expired() => expired.push(key),
                Some(item) => {
                    let raw = self.decode_payload(&key, &item);
                    let value = self.value_from_bytes(&raw)?;
                    let mut updated = item;
                    updated.touch();
                    write_back.push((key.clone(), updated));
                    self.inner.analytics.record_hit(&key);
                    result.insert(key, value);
                }
                None => missing.push(key),
            }
        }

        if !expired.is_empty() {
            self.inner.adapter.delete_all(&expired).await?;
            for key in &expired {
                self.inner.analytics.record_delete(key);
            }
            missing.extend(expired);
        }
        for key in &missing {
            self.inner.analytics.record_miss(key);
        }

        if !write_back.is_empty()
            && let Err(e) = self.inner.adapter.put_all(write_back).await
        {
            warn!(error = %e, "metadata write-back failed for batch read");
        }
        Ok((result, missing))
    }

    /// Remove several keys through the adapter's batch API
    pub async fn delete_all(&self, keys: &[String]) -> crate::Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.inner.adapter.delete_all(keys).await?;
        for key in keys {
            self.inner.analytics.record_delete(key);
        }
        Ok(())
    }

    // ---- tag surface -------------------------------------------------

    /// Keys carrying the tag
    pub async fn get_keys_by_tag(
        &self,
        tag: &str,
        paging: Paging,
    ) -> crate::Result<Vec<String>> {
        validate_tag(tag)?;
        Ok(self.inner.adapter.get_keys_by_tag(tag, paging).await?)
    }

    /// Keys carrying every one of the tags
    pub async fn get_keys_by_tags(
        &self,
        tags: &[String],
        paging: Paging,
    ) -> crate::Result<Vec<String>> {
        validate_tags(tags)?;
        Ok(self.inner.adapter.get_keys_by_tags(tags, paging).await?)
    }

    /// Values of every key carrying the tag
    pub async fn get_by_tag<T: DeserializeOwned>(
        &self,
        tag: &str,
        paging: Paging,
    ) -> crate::Result<HashMap<String, T>> {
        validate_tag(tag)?;
        let keys = self.inner.adapter.get_keys_by_tag(tag, paging).await?;
        let (result, _) = self.read_batch(&keys).await?;
        Ok(result)
    }

    /// Values of every key carrying all of the tags
    pub async fn get_by_tags<T: DeserializeOwned>(
        &self,
        tags: &[String],
        paging: Paging,
    ) -> crate::Result<HashMap<String, T>> {
        validate_tags(tags)?;
        let keys = self.inner.adapter.get_keys_by_tags(tags, paging).await?;
        let (result, _) = self.read_batch(&keys).await?;
        Ok(result)
    }

    /// Delete every key carrying the tag; returns the number removed
    pub async fn delete_by_tag(&self, tag: &str) -> crate::Result<usize> {
        validate_tag(tag)?;
        let keys = self.inner.adapter.get_keys_by_tag(tag, Paging::all()).await?;
        self.delete_all(&keys).await?;
        Ok(keys.len())
    }

    /// Delete every key carrying all of the tags; returns the number removed
    pub async fn delete_by_tags(&self, tags: &[String]) -> crate::Result<usize> {
        validate_tags(tags)?;
        let keys = self
            .inner
            .adapter
            .get_keys_by_tags(tags, Paging::all())
            .await?;
        self.delete_all(&keys).await?;
        Ok(keys.len())
    }

    // ---- eviction ----------------------------------------------------

    /// Run one eviction pass on demand
    pub async fn check_and_evict(&self) -> crate::Result<usize> {
        self.inner.eviction.check_and_evict().await
    }

    /// Evict strictly by priority tier until pressure clears
    pub async fn evict_by_priority(&self) -> crate::Result<usize> {
        self.inner.eviction.evict_by_priority().await
    }

    // ---- analytics accessors -----------------------------------------

    pub fn hit_count(&self) -> u64 {
        self.inner.analytics.hit_count()
    }

    pub fn miss_count(&self) -> u64 {
        self.inner.analytics.miss_count()
    }

    pub fn hit_rate(&self) -> f64 {
        self.inner.analytics.hit_rate()
    }

    pub fn total_size(&self) -> u64 {
        self.inner.analytics.total_size()
    }

    pub fn average_item_size(&self) -> f64 {
        self.inner.analytics.average_item_size()
    }

    pub fn most_frequently_accessed_keys(&self) -> Vec<(String, u64)> {
        self.inner.analytics.summary().most_frequently_accessed
    }

    pub fn most_recently_accessed_keys(&self) -> Vec<(String, u64)> {
        self.inner.analytics.summary().most_recently_accessed
    }

    pub fn largest_items(&self) -> Vec<(String, u64)> {
        self.inner.analytics.summary().largest_items
    }

    pub fn recent_operations(&self) -> Vec<Operation> {
        self.inner.analytics.recent_operations()
    }

    pub fn reset_metrics(&self) {
        self.inner.analytics.reset();
    }

    pub fn get_analytics_summary(&self) -> AnalyticsSummary {
        self.inner.analytics.summary()
    }

    // ---- item-level access for services ------------------------------

    /// Store a fully-formed item, preserving its metadata (used by the
    /// synchronizer, which must not re-stamp access history)
    pub(crate) async fn import_item(&self, key: &str, item: CacheItem) -> crate::Result<()> {
        let estimated = size::estimate_item_size(
            item.payload.len() as u64,
            item.expiry.is_some(),
            item.sliding_ttl.is_some(),
        );
        self.inner.analytics.record_put(key, estimated);
        self.inner.adapter.put(key, item).await?;
        Ok(())
    }
}

fn validate_key(key: &str) -> crate::Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("empty key".into()));
    }
    Ok(())
}

fn validate_tag(tag: &str) -> crate::Result<()> {
    if tag.is_empty() {
        return Err(CacheError::InvalidArgument("empty tag".into()));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> crate::Result<()> {
    if tags.is_empty() {
        return Err(CacheError::InvalidArgument("empty tag list".into()));
    }
    for tag in tags {
        validate_tag(tag)?;
    }
    Ok(())
}
