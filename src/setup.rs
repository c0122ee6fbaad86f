//! Engine construction and wiring
//!
//! [`CacheBuilder`] is the single entry point for assembling an engine:
//! pick an adapter kind, a database path, eviction limits, encryption and a
//! payload serializer, then `build()`. Custom backends and serializers are
//! registered by name; asking for an unregistered name fails during wiring,
//! never at operation time.

use crate::codec::{EncryptionOptions, JsonSerializer, PayloadSerializer};
use crate::config::{Config, EvictionConfig};
use crate::engine::CacheEngine;
use crate::error::CacheError;
use crate::services::CleanupService;
use crate::storage::{MemoryAdapter, SledAdapter, StorageAdapter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Constructs an adapter from the resolved config and optional key material
pub type AdapterFactory =
    Arc<dyn Fn(&Config, Option<EncryptionOptions>) -> crate::Result<Arc<dyn StorageAdapter>> + Send + Sync>;

/// Builder for a wired [`CacheEngine`]
pub struct CacheBuilder {
    config: Config,
    encryption: Option<EncryptionOptions>,
    adapters: HashMap<String, AdapterFactory>,
    serializers: HashMap<String, Arc<dyn PayloadSerializer>>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        let mut adapters: HashMap<String, AdapterFactory> = HashMap::new();
        adapters.insert(
            "memory".to_string(),
            Arc::new(|_, encryption| {
                Ok(match encryption {
                    Some(options) => Arc::new(MemoryAdapter::with_encryption(options)),
                    None => Arc::new(MemoryAdapter::new()),
                })
            }),
        );
        adapters.insert(
            "sled".to_string(),
            Arc::new(|config, encryption| {
                Ok(Arc::new(SledAdapter::open(
                    &config.cache.db_path,
                    &config.cache.name,
                    encryption,
                )?))
            }),
        );

        let mut serializers: HashMap<String, Arc<dyn PayloadSerializer>> = HashMap::new();
        serializers.insert("json".to_string(), Arc::new(JsonSerializer));

        Self {
            config: Config::default(),
            encryption: None,
            adapters,
            serializers,
        }
    }

    /// Start from a loaded [`Config`]
    pub fn with_config(config: Config) -> Self {
        let mut builder = Self::new();
        builder.config = config;
        builder
    }

    /// Adapter kind: "memory", "sled", or a registered custom name
    pub fn adapter(mut self, kind: impl Into<String>) -> Self {
        self.config.cache.adapter = kind.into();
        self
    }

    /// Logical cache name (sled tree name, log field)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.cache.name = name.into();
        self
    }

    /// Data directory for persistent adapters
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache.db_path = path.into();
        self
    }

    /// Interval between expired-item sweeps; `None` disables the worker
    pub fn cleanup_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.cache.cleanup_interval_secs = interval.map_or(0, |d| d.as_secs());
        self
    }

    pub fn eviction(mut self, eviction: EvictionConfig) -> Self {
        self.config.eviction = eviction;
        self
    }

    /// At-rest encryption key material, overriding any config-derived key
    pub fn encryption(mut self, options: EncryptionOptions) -> Self {
        self.encryption = Some(options);
        self
    }

    /// Select a registered payload serializer by name
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        self.config.cache.serializer = name.into();
        self
    }

    /// Register a custom backend under a name
    pub fn register_adapter(mut self, name: impl Into<String>, factory: AdapterFactory) -> Self {
        self.adapters.insert(name.into(), factory);
        self
    }

    /// Register a custom payload serializer under a name
    pub fn register_serializer(
        mut self,
        name: impl Into<String>,
        serializer: Arc<dyn PayloadSerializer>,
    ) -> Self {
        self.serializers.insert(name.into(), serializer);
        self
    }

    /// Wire the engine and spawn the cleanup worker
    pub async fn build(self) -> crate::Result<CacheEngine> {
        let encryption = match self.encryption {
            Some(options) => Some(options),
            None => match &self.config.encryption {
                Some(settings) => {
                    if settings.password.is_empty() {
                        return Err(CacheError::Config(
                            "encryption configured with an empty password".to_string(),
                        ));
                    }
                    Some(EncryptionOptions::from_password(
                        &settings.password,
                        settings.salt.as_bytes(),
                        settings.iterations,
                    ))
                }
                None => None,
            },
        };

        let factory = self
            .adapters
            .get(&self.config.cache.adapter)
            .ok_or_else(|| CacheError::AdapterNotFound(self.config.cache.adapter.clone()))?;
        let adapter = factory(&self.config, encryption)?;

        let serializer = self
            .serializers
            .get(&self.config.cache.serializer)
            .cloned()
            .ok_or_else(|| CacheError::SerializerNotFound(self.config.cache.serializer.clone()))?;

        let engine = CacheEngine::new(
            adapter,
            serializer,
            self.config.eviction.clone(),
            self.config.cache.name.clone(),
        );

        if let Some(interval) = self.config.cache.cleanup_interval() {
            CleanupService::spawn(engine.clone(), interval);
        }

        info!(
            name = engine.name(),
            adapter = %self.config.cache.adapter,
            cleanup_secs = self.config.cache.cleanup_interval_secs,
            "cache engine ready"
        );
        Ok(engine)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
