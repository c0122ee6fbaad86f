//! # stratacache
//!
//! Embeddable async key/value cache engine with pluggable persistent
//! backends ("strata" of storage).
//!
//! ## Features
//!
//! - Typed `put`/`get` over serde, with per-item policies (TTL, sliding
//!   expiry, priority tiers, size limits)
//! - Stale-while-revalidate reads with background or blocking refresh
//! - Size/count pressure eviction under LRU, LFU, FIFO or TTL strategies;
//!   `Critical` items are exempt
//! - Adaptive GZIP compression with an entropy heuristic
//! - Transparent at-rest encryption (AES-256-GCM, PBKDF2 key derivation)
//! - Tag-based grouping with AND queries and bulk invalidation
//! - Batch operations routed through adapter batch APIs
//! - Auxiliary services: periodic cleanup, preloading, two-engine
//!   synchronization, scheduled eviction
//!
//! ## Example
//!
//! ```ignore
//! use stratacache::prelude::*;
//!
//! let engine = CacheBuilder::new().build().await?;
//! engine.put("user:7", &user, PutOptions::new().tag("users")).await?;
//! let cached: Option<User> = engine.get("user:7").await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────────────────────┐
//! │ client     │──▶│ CacheEngine                              │
//! │ (typed     │   │  ├─ policy resolve ─ codec ─ size gate   │
//! │  API)      │   │  ├─ analytics (hits, sizes, recency)     │
//! └────────────┘   │  ├─ eviction (LRU/LFU/FIFO/TTL)          │
//!                  │  └─ StorageAdapter (memory │ sled │ ...) │
//!                  └──────────────────────────────────────────┘
//! ```

// Modules
pub mod analytics;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod evict;
pub mod item;
pub mod policy;
pub mod prelude;
pub mod services;
pub mod setup;
pub mod size;
pub mod storage;

// Re-exports for convenience
pub use error::{CacheError, CodecError, EncryptionError, Result, StorageError};
