//! Per-item cache policies
//!
//! A policy bundles the knobs a caller can attach to a `put`: expiry,
//! sliding expiry, stale threshold, refresh strategy, priority, size limit,
//! compression and encryption. Inline arguments given to the engine call
//! override the policy field-by-field.

use crate::item::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when a read finds a stale item and a refresh callback is present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Serve the stored value, never refresh
    #[default]
    Never,
    /// Serve the stored value and refresh in a detached task
    BackgroundRefresh,
    /// Await the refresh and serve the fresh value
    ImmediateRefresh,
}

/// Compression behavior for stored payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// Entropy heuristic decides; compression is kept only when profitable
    #[default]
    Auto,
    Always,
    Never,
}

/// Named bundle of per-item policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Absolute TTL from put time
    pub expiry: Option<Duration>,
    /// Per-access expiry extension
    pub sliding_ttl: Option<Duration>,
    /// Age since last access beyond which the item counts as stale
    pub stale_time: Option<Duration>,
    pub priority: Priority,
    pub refresh_strategy: RefreshStrategy,
    /// Per-item byte limit; the put is rejected when exceeded
    pub max_size: Option<u64>,
    /// Request at-rest encryption; silently ignored when the adapter
    /// has no key material
    pub encrypt: bool,
    pub compression: CompressionMode,
    /// GZIP level, clamped to 1..=9
    pub compression_level: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            expiry: None,
            sliding_ttl: None,
            stale_time: None,
            priority: Priority::Normal,
            refresh_strategy: RefreshStrategy::Never,
            max_size: None,
            encrypt: false,
            compression: CompressionMode::Auto,
            compression_level: crate::codec::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CachePolicy {
    /// Items that survive until explicitly deleted
    pub fn never_expire() -> Self {
        Self::default()
    }

    /// Short-lived, low-priority items (5 minutes, first in line for eviction)
    pub fn temporary() -> Self {
        Self {
            expiry: Some(Duration::from_secs(5 * 60)),
            priority: Priority::Low,
            ..Self::default()
        }
    }

    /// Encrypted at rest with the given TTL
    pub fn encrypted(ttl: Duration) -> Self {
        Self {
            expiry: Some(ttl),
            encrypt: true,
            ..Self::default()
        }
    }

    /// Unconditional compression at the default level
    pub fn compressed() -> Self {
        Self {
            compression: CompressionMode::Always,
            ..Self::default()
        }
    }

    /// Serve stale values while refreshing in the background
    pub fn background_refresh(stale_time: Duration, ttl: Duration) -> Self {
        Self {
            expiry: Some(ttl),
            stale_time: Some(stale_time),
            refresh_strategy: RefreshStrategy::BackgroundRefresh,
            ..Self::default()
        }
    }

    /// Block stale reads on a refresh
    pub fn immediate_refresh(stale_time: Duration, ttl: Duration) -> Self {
        Self {
            expiry: Some(ttl),
            stale_time: Some(stale_time),
            refresh_strategy: RefreshStrategy::ImmediateRefresh,
            ..Self::default()
        }
    }

    /// Effective policy for a call: start from `policy` (or defaults) and
    /// let inline arguments win field-by-field.
    pub fn resolve(
        policy: Option<&CachePolicy>,
        inline_expiry: Option<Duration>,
        inline_sliding: Option<Duration>,
    ) -> Self {
        let mut effective = policy.cloned().unwrap_or_default();
        if inline_expiry.is_some() {
            effective.expiry = inline_expiry;
        }
        if inline_sliding.is_some() {
            effective.sliding_ttl = inline_sliding;
        }
        effective.compression_level = crate::codec::clamp_level(effective.compression_level);
        effective
    }
}
