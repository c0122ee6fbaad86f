//! Configuration for stratacache

use crate::evict::EvictionStrategy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub eviction: EvictionConfig,
    pub encryption: Option<EncryptionConfig>,
}

/// Engine and adapter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Logical cache name (sled tree name, log field)
    pub name: String,

    /// Adapter kind: "memory", "sled", or a registered custom name
    pub adapter: String,

    /// Data directory for persistent adapters
    pub db_path: PathBuf,

    /// Serializer name ("json" unless a custom one is registered)
    pub serializer: String,

    /// Interval between expired-item sweeps in seconds (0 = disabled)
    pub cleanup_interval_secs: u64,

    /// Payload size above which codec work moves to the blocking pool
    pub async_codec_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "stratacache".to_string(),
            adapter: "memory".to_string(),
            db_path: PathBuf::from("./data/cache"),
            serializer: "json".to_string(),
            cleanup_interval_secs: 60,
            async_codec_threshold: crate::codec::ASYNC_CODEC_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Cleanup interval as a `Duration` (`None` when disabled)
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0)
            .then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

/// Size/count pressure limits and victim-selection strategy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Total estimated size limit in bytes
    pub max_size: Option<u64>,

    /// Item count limit
    pub max_items: Option<usize>,

    pub strategy: EvictionStrategy,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            max_size: None,
            max_items: None,
            strategy: EvictionStrategy::Lru,
        }
    }
}

impl EvictionConfig {
    /// Whether any pressure limit is configured at all
    pub fn has_limits(&self) -> bool {
        self.max_size.is_some() || self.max_items.is_some()
    }
}

/// Password-derived at-rest encryption settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub password: String,
    pub salt: String,
    pub iterations: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            salt: String::new(),
            iterations: crate::codec::DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::CacheError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| crate::CacheError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("STRATACACHE_NAME") {
            config.cache.name = name;
        }

        if let Ok(adapter) = std::env::var("STRATACACHE_ADAPTER") {
            config.cache.adapter = adapter;
        }

        if let Ok(path) = std::env::var("STRATACACHE_DB_PATH") {
            config.cache.db_path = PathBuf::from(path);
        }

        if let Ok(interval) = std::env::var("STRATACACHE_CLEANUP_INTERVAL_SECS")
            && let Ok(n) = interval.parse()
        {
            config.cache.cleanup_interval_secs = n;
        }

        if let Ok(max_items) = std::env::var("STRATACACHE_MAX_ITEMS")
            && let Ok(n) = max_items.parse()
        {
            config.eviction.max_items = Some(n);
        }

        if let Ok(max_size) = std::env::var("STRATACACHE_MAX_SIZE")
            && let Ok(n) = max_size.parse()
        {
            config.eviction.max_size = Some(n);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.adapter, "memory");
        assert_eq!(config.cache.serializer, "json");
        assert_eq!(config.cache.cleanup_interval(), Some(Duration::from_secs(60)));
        assert!(!config.eviction.has_limits());
        assert!(config.encryption.is_none());
    }

    #[test]
    fn test_cleanup_disabled() {
        let config = CacheConfig {
            cleanup_interval_secs: 0,
            ..CacheConfig::default()
        };
        assert_eq!(config.cleanup_interval(), None);
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            name = "sessions"
            adapter = "sled"
            cleanup_interval_secs = 30

            [eviction]
            max_items = 1000
            strategy = "lfu"

            [encryption]
            password = "hunter2"
            salt = "pepper"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.name, "sessions");
        assert_eq!(config.cache.adapter, "sled");
        assert_eq!(config.eviction.max_items, Some(1000));
        assert_eq!(config.eviction.strategy, EvictionStrategy::Lfu);
        let enc = config.encryption.unwrap();
        assert_eq!(enc.password, "hunter2");
        assert_eq!(enc.iterations, crate::codec::DEFAULT_PBKDF2_ITERATIONS);
    }

    #[test]
    fn test_has_limits() {
        let eviction = EvictionConfig {
            max_items: Some(10),
            ..EvictionConfig::default()
        };
        assert!(eviction.has_limits());
    }
}
