//! Sled storage backend
//!
//! Embedded NoSQL backend: each record is the item's JSON encoding (or its
//! ciphertext when encryption is configured). Keys come back in sled's
//! native byte order, so listings are stable. Tag queries scan and decode;
//! this backend favors simplicity over indexed tag lookups.

use crate::StorageError;
use crate::codec::EncryptionOptions;
use crate::item::CacheItem;
use crate::storage::{Paging, StorageAdapter};
use async_trait::async_trait;
use sled::Batch;
use std::path::Path;
use tracing::info;

/// Sled-backed storage
pub struct SledAdapter {
    tree: sled::Tree,
    encryption: Option<EncryptionOptions>,
}

impl SledAdapter {
    /// Open or create a sled database, with items under the named tree
    pub fn open(
        path: &Path,
        tree_name: &str,
        encryption: Option<EncryptionOptions>,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("Failed to create directory: {e}")))?;
        }

        let db = sled::open(path)?;
        let tree = db.open_tree(tree_name)?;

        info!(
            path = %path.display(),
            tree = tree_name,
            encrypted = encryption.is_some(),
            "Sled storage opened"
        );

        Ok(Self { tree, encryption })
    }

    fn encode(&self, item: &CacheItem) -> Result<Vec<u8>, StorageError> {
        let plain = item.to_json()?;
        match &self.encryption {
            Some(options) => options.encrypt(&plain).map_err(StorageError::Encryption),
            None => Ok(plain),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<CacheItem, StorageError> {
        match &self.encryption {
            Some(options) => {
                let plain = options.decrypt(bytes).map_err(StorageError::Encryption)?;
                CacheItem::from_json(&plain)
            }
            None => CacheItem::from_json(bytes),
        }
    }

    /// Scan every record, yielding `(key, item)` pairs
    fn scan(&self) -> Result<Vec<(String, CacheItem)>, StorageError> {
        let mut items = Vec::new();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StorageError::Decoding(format!("Non-UTF8 key: {e}")))?;
            items.push((key, self.decode(&value)?));
        }
        Ok(items)
    }

    fn keys_with_tags(&self, tags: &[String]) -> Result<Vec<String>, StorageError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .scan()?
            .into_iter()
            .filter(|(_, item)| tags.iter().all(|t| item.tags.contains(t)))
            .map(|(key, _)| key)
            .collect())
    }
}

#[async_trait]
impl StorageAdapter for SledAdapter {
    async fn put(&self, key: &str, item: CacheItem) -> Result<(), StorageError> {
        let encoded = self.encode(&item)?;
        self.tree.insert(key.as_bytes(), encoded)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<CacheItem>, StorageError> {
        self.tree
            .get(key.as_bytes())?
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.tree.clear()?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.tree.contains_key(key.as_bytes())?)
    }

    async fn get_keys(&self, paging: Paging) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in self.tree.iter().keys() {
            let key = entry?;
            keys.push(
                String::from_utf8(key.to_vec())
                    .map_err(|e| StorageError::Decoding(format!("Non-UTF8 key: {e}")))?,
            );
        }
        Ok(paging.apply(keys))
    }

    async fn put_all(&self, items: Vec<(String, CacheItem)>) -> Result<(), StorageError> {
        let mut batch = Batch::default();
        for (key, item) in &items {
            batch.insert(key.as_bytes(), self.encode(item)?);
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    async fn get_all(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<CacheItem>)>, StorageError> {
        keys.iter()
            .map(|key| {
                let item = self
                    .tree
                    .get(key.as_bytes())?
                    .map(|bytes| self.decode(&bytes))
                    .transpose()?;
                Ok((key.clone(), item))
            })
            .collect()
    }

    async fn delete_all(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut batch = Batch::default();
        for key in keys {
            batch.remove(key.as_bytes());
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    async fn contains_keys(&self, keys: &[String]) -> Result<Vec<(String, bool)>, StorageError> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.tree.contains_key(key.as_bytes())?)))
            .collect()
    }

    async fn get_keys_by_tag(
        &self,
        tag: &str,
        paging: Paging,
    ) -> Result<Vec<String>, StorageError> {
        let keys = self.keys_with_tags(std::slice::from_ref(&tag.to_owned()))?;
        Ok(paging.apply(keys))
    }

    async fn get_keys_by_tags(
        &self,
        tags: &[String],
        paging: Paging,
    ) -> Result<Vec<String>, StorageError> {
        Ok(paging.apply(self.keys_with_tags(tags)?))
    }

    async fn delete_by_tag(&self, tag: &str) -> Result<usize, StorageError> {
        self.delete_by_tags(std::slice::from_ref(&tag.to_owned()))
            .await
    }

    async fn delete_by_tags(&self, tags: &[String]) -> Result<usize, StorageError> {
        let keys = self.keys_with_tags(tags)?;
        let mut batch = Batch::default();
        for key in &keys {
            batch.remove(key.as_bytes());
        }
        self.tree.apply_batch(batch)?;
        Ok(keys.len())
    }

    fn encryption_enabled(&self) -> bool {
        self.encryption.is_some()
    }

    fn encryption_options(&self) -> Option<&EncryptionOptions> {
        self.encryption.as_ref()
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}
