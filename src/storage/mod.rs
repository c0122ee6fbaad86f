//! Storage adapters
//!
//! The [`StorageAdapter`] contract is the only thing the engine knows about
//! a backend. All operations are async and may fail with a
//! [`StorageError`](crate::StorageError); adapters are internally safe for
//! concurrent calls. Tag queries may scan all items — callers must not
//! assume O(1) cost.

mod memory;
mod sled;

pub use memory::MemoryAdapter;
pub use sled::SledAdapter;

use crate::StorageError;
use crate::codec::EncryptionOptions;
use crate::item::CacheItem;
use async_trait::async_trait;

/// Limit/offset window for key listings.
///
/// Order is adapter-defined but stable within a single snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Paging {
    pub fn new(limit: Option<usize>, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// No window: every key
    pub fn all() -> Self {
        Self::default()
    }

    /// Apply the window to an already-ordered key list
    pub fn apply(self, keys: Vec<String>) -> Vec<String> {
        let iter = keys.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Abstract key/value store used by the cache engine.
///
/// `put` replaces any prior item under the same key atomically with respect
/// to other operations on that key. Batch operations are best-effort, not
/// transactional: a partial failure surfaces an error and the engine does
/// not retry.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Store an item, replacing any existing one under the key
    async fn put(&self, key: &str, item: CacheItem) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<CacheItem>, StorageError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove every item
    async fn clear(&self) -> Result<(), StorageError>;

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys within the window
    async fn get_keys(&self, paging: Paging) -> Result<Vec<String>, StorageError>;

    async fn put_all(&self, items: Vec<(String, CacheItem)>) -> Result<(), StorageError>;

    async fn get_all(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<CacheItem>)>, StorageError>;

    async fn delete_all(&self, keys: &[String]) -> Result<(), StorageError>;

    async fn contains_keys(&self, keys: &[String]) -> Result<Vec<(String, bool)>, StorageError>;

    /// Keys carrying the tag
    async fn get_keys_by_tag(&self, tag: &str, paging: Paging)
    -> Result<Vec<String>, StorageError>;

    /// Keys carrying every one of the tags (AND semantics)
    async fn get_keys_by_tags(
        &self,
        tags: &[String],
        paging: Paging,
    ) -> Result<Vec<String>, StorageError>;

    /// Delete all keys carrying the tag; returns the number removed
    async fn delete_by_tag(&self, tag: &str) -> Result<usize, StorageError>;

    /// Delete all keys carrying every one of the tags; returns the number removed
    async fn delete_by_tags(&self, tags: &[String]) -> Result<usize, StorageError>;

    /// Whether payloads are encrypted at rest
    fn encryption_enabled(&self) -> bool;

    /// The key material in use, when encryption is enabled
    fn encryption_options(&self) -> Option<&EncryptionOptions>;

    /// Adapter kind, for logs
    fn name(&self) -> &'static str;
}
