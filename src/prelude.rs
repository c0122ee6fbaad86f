//! Prelude module for common imports.
//!
//! This module re-exports commonly used types and traits for convenience.
//!
//! # Usage
//!
//! ```ignore
//! use stratacache::prelude::*;
//! ```

// Error types
pub use crate::error::{CacheError, CodecError, EncryptionError, Result, StorageError};

// Configuration and wiring
pub use crate::config::{CacheConfig, Config, EncryptionConfig, EvictionConfig};
pub use crate::setup::CacheBuilder;

// Engine
pub use crate::engine::{CacheEngine, PutOptions, Refresher};

// Items and policies
pub use crate::item::{CacheItem, Priority};
pub use crate::policy::{CachePolicy, CompressionMode, RefreshStrategy};

// Storage
pub use crate::storage::{MemoryAdapter, Paging, SledAdapter, StorageAdapter};

// Eviction
pub use crate::evict::EvictionStrategy;

// Codec
pub use crate::codec::{EncryptionOptions, PayloadSerializer};

// Services
pub use crate::services::{
    CleanupService, ConflictResolution, EvictionScheduler, PlatformSignal, Preloader,
    ScheduleConfig, SyncEvent, SyncOptions, Synchronizer,
};

// Analytics
pub use crate::analytics::{Analytics, AnalyticsSummary};

// Common external crates
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};
