//! Cache item model: value payload plus metadata
//!
//! An item carries the serialized payload together with everything the
//! engine needs for expiry, stale detection and eviction ordering.
//!
//! Expiry rules:
//! - `expiry == None` = never expire
//! - `sliding_ttl` set = expiry is recomputed to `now + sliding_ttl`
//!   on each successful read; an item can never have a sliding TTL
//!   without an absolute expiry

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Eviction priority tier
///
/// `Critical` items are exempt from pressure eviction; they only leave the
/// cache through explicit delete, clear, or expiry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Stored value with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItem {
    /// Serialized payload; the compressed blob when `is_compressed`
    #[serde(with = "base64_payload")]
    pub payload: Bytes,
    /// Absolute expiration, milliseconds since epoch (`None` = never expire)
    pub expiry: Option<u64>,
    /// Per-access expiry extension in milliseconds
    pub sliding_ttl: Option<u64>,
    pub priority: Priority,
    /// Creation time, milliseconds since epoch
    pub created_at: u64,
    /// Last successful read, milliseconds since epoch
    pub last_accessed_at: u64,
    pub access_count: u64,
    pub is_compressed: bool,
    /// Payload size before compression, when compressed
    pub original_size: Option<u64>,
    /// `original / compressed`, when compressed
    pub compression_ratio: Option<f64>,
    pub tags: BTreeSet<String>,
}

impl CacheItem {
    /// Create a new item stamped with the current time.
    ///
    /// A sliding TTL without an absolute expiry is not a valid state; when
    /// only `sliding_ttl` is given the initial expiry is derived from it.
    pub fn new(
        payload: Bytes,
        expiry: Option<Duration>,
        sliding_ttl: Option<Duration>,
        priority: Priority,
        tags: BTreeSet<String>,
    ) -> Self {
        let now = now_millis();
        let sliding_millis = sliding_ttl.map(duration_millis);
        let expiry_at = expiry
            .map(|d| now + duration_millis(d))
            .or_else(|| sliding_millis.map(|s| now + s));

        Self {
            payload,
            expiry: expiry_at,
            sliding_ttl: sliding_millis,
            priority,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            is_compressed: false,
            original_size: None,
            compression_ratio: None,
            tags,
        }
    }

    /// Mark the payload as the compressed form of an `original_size`-byte value.
    pub fn with_compression(mut self, original_size: u64) -> Self {
        self.is_compressed = true;
        self.original_size = Some(original_size);
        self.compression_ratio = if self.payload.is_empty() {
            None
        } else {
            Some(original_size as f64 / self.payload.len() as f64)
        };
        self
    }

    /// Check if the item has passed its absolute expiry
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|at| now_millis() > at)
    }

    /// Check if the time since the last access exceeds `stale_after`
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        now_millis().saturating_sub(self.last_accessed_at) > duration_millis(stale_after)
    }

    /// Remaining time to live in milliseconds (`None` = never expires)
    pub fn remaining_ttl(&self) -> Option<u64> {
        self.expiry.map(|at| at.saturating_sub(now_millis()))
    }

    /// Record a successful read: refresh the sliding expiry, bump the
    /// access counter and last-access time.
    pub fn touch(&mut self) {
        let now = now_millis();
        if let Some(sliding) = self.sliding_ttl {
            self.expiry = Some(now + sliding);
        }
        self.last_accessed_at = now;
        self.access_count += 1;
    }

    /// Encode to the JSON form used by encrypting adapters.
    ///
    /// Every metadata field round-trips so that an encrypted store needs no
    /// plaintext side-channel.
    pub fn to_json(&self) -> Result<Vec<u8>, crate::StorageError> {
        serde_json::to_vec(self).map_err(|e| crate::StorageError::Encoding(e.to_string()))
    }

    /// Decode from the JSON form produced by [`CacheItem::to_json`]
    pub fn from_json(bytes: &[u8]) -> Result<Self, crate::StorageError> {
        serde_json::from_slice(bytes).map_err(|e| crate::StorageError::Decoding(e.to_string()))
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Duration to whole milliseconds, never rounding a non-zero duration to zero
pub fn duration_millis(d: Duration) -> u64 {
    let millis = d.as_millis() as u64;
    if millis == 0 && !d.is_zero() { 1 } else { millis }
}

mod base64_payload {
    //! Payload bytes as a base64 string inside item JSON

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
