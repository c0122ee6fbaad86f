//! In-memory storage backend
//!
//! Items live in a `BTreeMap` so key listings are stable and ordered. A
//! reverse tag index (`tag → keys`) is maintained incrementally, so tag
//! queries never scan the store. When encryption options are supplied every
//! stored record is the ciphertext of the item's JSON encoding.

use crate::StorageError;
use crate::codec::EncryptionOptions;
use crate::item::CacheItem;
use crate::storage::{Paging, StorageAdapter};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

enum Record {
    Plain(Box<CacheItem>),
    Encrypted(Vec<u8>),
}

#[derive(Default)]
struct Inner {
    store: BTreeMap<String, Record>,
    /// tag → keys carrying it
    tag_index: HashMap<String, BTreeSet<String>>,
    /// key → its tags, for index maintenance on delete
    key_tags: HashMap<String, BTreeSet<String>>,
}

impl Inner {
    fn index_put(&mut self, key: &str, tags: &BTreeSet<String>) {
        self.index_remove(key);
        for tag in tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_owned());
        }
        if !tags.is_empty() {
            self.key_tags.insert(key.to_owned(), tags.clone());
        }
    }

    fn index_remove(&mut self, key: &str) {
        if let Some(tags) = self.key_tags.remove(key) {
            for tag in &tags {
                if let Some(keys) = self.tag_index.get_mut(tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_index.remove(tag);
                    }
                }
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        let existed = self.store.remove(key).is_some();
        if existed {
            self.index_remove(key);
        }
        existed
    }

    fn keys_with_tags(&self, tags: &[String]) -> Vec<String> {
        let mut iter = tags.iter();
        let Some(first) = iter.next() else {
            return Vec::new();
        };
        let Some(mut result) = self.tag_index.get(first).cloned() else {
            return Vec::new();
        };
        for tag in iter {
            match self.tag_index.get(tag) {
                Some(keys) => result = result.intersection(keys).cloned().collect(),
                None => return Vec::new(),
            }
            if result.is_empty() {
                break;
            }
        }
        result.into_iter().collect()
    }
}

/// In-memory adapter
pub struct MemoryAdapter {
    inner: RwLock<Inner>,
    encryption: Option<EncryptionOptions>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            encryption: None,
        }
    }

    /// Encrypt every stored record with the given options
    pub fn with_encryption(encryption: EncryptionOptions) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            encryption: Some(encryption),
        }
    }

    fn encode(&self, item: CacheItem) -> Result<Record, StorageError> {
        match &self.encryption {
            Some(options) => {
                let plain = item.to_json()?;
                let blob = options.encrypt(&plain).map_err(StorageError::Encryption)?;
                Ok(Record::Encrypted(blob))
            }
            None => Ok(Record::Plain(Box::new(item))),
        }
    }

    fn decode(&self, record: &Record) -> Result<CacheItem, StorageError> {
        match record {
            Record::Plain(item) => Ok(item.as_ref().clone()),
            Record::Encrypted(blob) => {
                let options = self
                    .encryption
                    .as_ref()
                    .ok_or(StorageError::Encryption(
                        crate::EncryptionError::MissingKey,
                    ))?;
                let plain = options.decrypt(blob).map_err(StorageError::Encryption)?;
                CacheItem::from_json(&plain)
            }
        }
    }

    /// Raw stored bytes for a key, when the record is encrypted
    #[cfg(test)]
    fn raw_ciphertext(&self, key: &str) -> Option<Vec<u8>> {
        match self.inner.read().store.get(key) {
            Some(Record::Encrypted(blob)) => Some(blob.clone()),
            _ => None,
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn put(&self, key: &str, item: CacheItem) -> Result<(), StorageError> {
        let tags = item.tags.clone();
        let record = self.encode(item)?;
        let mut inner = self.inner.write();
        inner.store.insert(key.to_owned(), record);
        inner.index_put(key, &tags);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<CacheItem>, StorageError> {
        let inner = self.inner.read();
        inner.store.get(key).map(|r| self.decode(r)).transpose()
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.inner.write().remove(key))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.store.clear();
        inner.tag_index.clear();
        inner.key_tags.clear();
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.inner.read().store.contains_key(key))
    }

    async fn get_keys(&self, paging: Paging) -> Result<Vec<String>, StorageError> {
        let keys: Vec<String> = self.inner.read().store.keys().cloned().collect();
        Ok(paging.apply(keys))
    }

    async fn put_all(&self, items: Vec<(String, CacheItem)>) -> Result<(), StorageError> {
        // encode outside the write lock
        let mut encoded = Vec::with_capacity(items.len());
        for (key, item) in items {
            let tags = item.tags.clone();
            encoded.push((key, tags, self.encode(item)?));
        }

        let mut inner = self.inner.write();
        for (key, tags, record) in encoded {
            inner.store.insert(key.clone(), record);
            inner.index_put(&key, &tags);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<CacheItem>)>, StorageError> {
        let inner = self.inner.read();
        keys.iter()
            .map(|key| {
                let item = inner.store.get(key).map(|r| self.decode(r)).transpose()?;
                Ok((key.clone(), item))
            })
            .collect()
    }

    async fn delete_all(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        for key in keys {
            inner.remove(key);
        }
        Ok(())
    }

    async fn contains_keys(&self, keys: &[String]) -> Result<Vec<(String, bool)>, StorageError> {
        let inner = self.inner.read();
        Ok(keys
            .iter()
            .map(|key| (key.clone(), inner.store.contains_key(key)))
            .collect())
    }

    async fn get_keys_by_tag(
        &self,
        tag: &str,
        paging: Paging,
    ) -> Result<Vec<String>, StorageError> {
        let keys = self
            .inner
            .read()
            .tag_index
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        Ok(paging.apply(keys))
    }

    async fn get_keys_by_tags(
        &self,
        tags: &[String],
        paging: Paging,
    ) -> Result<Vec<String>, StorageError> {
        Ok(paging.apply(self.inner.read().keys_with_tags(tags)))
    }

    async fn delete_by_tag(&self, tag: &str) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let keys: Vec<String> = inner
            .tag_index
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        for key in &keys {
            inner.remove(key);
        }
        Ok(keys.len())
    }

    async fn delete_by_tags(&self, tags: &[String]) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let keys = inner.keys_with_tags(tags);
        for key in &keys {
            inner.remove(key);
        }
        Ok(keys.len())
    }

    fn encryption_enabled(&self) -> bool {
        self.encryption.is_some()
    }

    fn encryption_options(&self) -> Option<&EncryptionOptions> {
        self.encryption.as_ref()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn item(payload: &[u8], tags: &[&str]) -> CacheItem {
        CacheItem::new(
            Bytes::copy_from_slice(payload),
            None,
            None,
            crate::item::Priority::Normal,
            tags.iter().map(|t| (*t).to_owned()).collect(),
        )
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let adapter = MemoryAdapter::new();
        adapter.put("k", item(b"hello", &[])).await.unwrap();

        let got = adapter.get("k").await.unwrap().unwrap();
        assert_eq!(got.payload, Bytes::from_static(b"hello"));
        assert!(adapter.contains_key("k").await.unwrap());

        assert!(adapter.delete("k").await.unwrap());
        assert!(!adapter.delete("k").await.unwrap());
        assert!(adapter.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_keys_ordered_and_paged() {
        let adapter = MemoryAdapter::new();
        for key in ["c", "a", "b", "d"] {
            adapter.put(key, item(b"v", &[])).await.unwrap();
        }

        let keys = adapter.get_keys(Paging::all()).await.unwrap();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);

        let page = adapter.get_keys(Paging::new(Some(2), 1)).await.unwrap();
        assert_eq!(page, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let adapter = MemoryAdapter::new();
        adapter
            .put_all(vec![
                ("a".into(), item(b"1", &[])),
                ("b".into(), item(b"2", &[])),
            ])
            .await
            .unwrap();

        let got = adapter
            .get_all(&["a".into(), "b".into(), "missing".into()])
            .await
            .unwrap();
        assert!(got[0].1.is_some());
        assert!(got[1].1.is_some());
        assert!(got[2].1.is_none());

        let contains = adapter
            .contains_keys(&["a".into(), "missing".into()])
            .await
            .unwrap();
        assert!(contains[0].1);
        assert!(!contains[1].1);

        adapter.delete_all(&["a".into(), "b".into()]).await.unwrap();
        assert!(adapter.get_keys(Paging::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_index_maintained() {
        let adapter = MemoryAdapter::new();
        adapter.put("x", item(b"1", &["t"])).await.unwrap();
        adapter.put("y", item(b"2", &["t", "u"])).await.unwrap();
        adapter.put("z", item(b"3", &["u"])).await.unwrap();

        let t_keys = adapter.get_keys_by_tag("t", Paging::all()).await.unwrap();
        assert_eq!(t_keys, vec!["x", "y"]);

        // AND semantics
        let both = adapter
            .get_keys_by_tags(&["t".into(), "u".into()], Paging::all())
            .await
            .unwrap();
        assert_eq!(both, vec!["y"]);

        // overwrite with different tags updates the index
        adapter.put("x", item(b"1", &["u"])).await.unwrap();
        let t_keys = adapter.get_keys_by_tag("t", Paging::all()).await.unwrap();
        assert_eq!(t_keys, vec!["y"]);

        // delete removes from the index
        adapter.delete("y").await.unwrap();
        assert!(
            adapter
                .get_keys_by_tag("t", Paging::all())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_by_tag() {
        let adapter = MemoryAdapter::new();
        adapter.put("x", item(b"1", &["t"])).await.unwrap();
        adapter.put("y", item(b"2", &["t"])).await.unwrap();
        adapter.put("z", item(b"3", &["u"])).await.unwrap();

        assert_eq!(adapter.delete_by_tag("t").await.unwrap(), 2);
        assert!(adapter.get("x").await.unwrap().is_none());
        assert!(adapter.get("y").await.unwrap().is_none());
        assert!(adapter.get("z").await.unwrap().is_some());
        assert_eq!(adapter.delete_by_tag("t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_encryption_at_rest() {
        let options = EncryptionOptions::new([3u8; 32]).unwrap();
        let adapter = MemoryAdapter::with_encryption(options);
        assert!(adapter.encryption_enabled());

        adapter.put("secret", item(b"plaintext", &["t"])).await.unwrap();

        // stored record is ciphertext, not the payload
        let raw = adapter.raw_ciphertext("secret").unwrap();
        assert!(!raw.windows(9).any(|w| w == b"plaintext"));

        let got = adapter.get("secret").await.unwrap().unwrap();
        assert_eq!(got.payload, Bytes::from_static(b"plaintext"));

        // tag index still works from plaintext tags
        let keys = adapter.get_keys_by_tag("t", Paging::all()).await.unwrap();
        assert_eq!(keys, vec!["secret"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let adapter = MemoryAdapter::new();
        adapter.put("a", item(b"1", &["t"])).await.unwrap();
        adapter.clear().await.unwrap();
        assert!(adapter.get_keys(Paging::all()).await.unwrap().is_empty());
        assert!(
            adapter
                .get_keys_by_tag("t", Paging::all())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
