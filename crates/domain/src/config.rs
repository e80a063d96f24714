//! Configuration structures for the cache layer
//!
//! Loaded by `cacheward_infra::config` from the environment or a TOML/JSON
//! file. Every section has defaults so partial files are accepted.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_KEY_PREFIX, DEFAULT_LOG_LEVEL, DEFAULT_MEMORY_CAPACITY,
    DEFAULT_RETRY_TIMEOUT_SECS,
};
use crate::errors::{CachewardError, Result};
use crate::store::CacheStore;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLayerConfig {
    pub breaker: BreakerSettings,
    pub stores: Vec<StoreSettings>,
    pub logging: LoggingSettings,
}

impl Default for CacheLayerConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerSettings::default(),
            stores: CacheStore::ALL.iter().map(|store| StoreSettings::memory(*store)).collect(),
            logging: LoggingSettings::default(),
        }
    }
}

impl CacheLayerConfig {
    /// Check invariants the loader cannot express through serde
    ///
    /// # Errors
    /// Returns `CachewardError::Config` naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        self.breaker.validate()?;

        let mut seen = HashSet::new();
        for settings in &self.stores {
            if !seen.insert(settings.store) {
                return Err(CachewardError::Config(format!(
                    "store '{}' is configured more than once",
                    settings.store
                )));
            }
            settings.backend.validate(settings.store)?;
        }

        Ok(())
    }

    /// Backend settings for `store`, if configured
    pub fn store(&self, store: CacheStore) -> Option<&BackendSettings> {
        self.stores.iter().find(|settings| settings.store == store).map(|s| &s.backend)
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u64,
    pub retry_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            retry_timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
        }
    }
}

impl BreakerSettings {
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(CachewardError::Config(
                "breaker.failure_threshold must be greater than 0".to_string(),
            ));
        }
        if self.retry_timeout_secs == 0 {
            return Err(CachewardError::Config(
                "breaker.retry_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which backend serves a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store: CacheStore,
    pub backend: BackendSettings,
}

impl StoreSettings {
    pub fn memory(store: CacheStore) -> Self {
        Self::memory_with_capacity(store, DEFAULT_MEMORY_CAPACITY)
    }

    pub fn memory_with_capacity(store: CacheStore, max_capacity: u64) -> Self {
        Self { store, backend: BackendSettings::Memory { max_capacity } }
    }

    pub fn redis(store: CacheStore, url: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            backend: BackendSettings::Redis { url: url.into(), key_prefix: key_prefix.into() },
        }
    }
}

/// Backend kind and its connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSettings {
    /// In-process cache, bounded by entry count
    Memory {
        #[serde(default = "default_memory_capacity")]
        max_capacity: u64,
    },
    /// Redis server
    Redis {
        url: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

impl BackendSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory { .. } => "memory",
            Self::Redis { .. } => "redis",
        }
    }

    fn validate(&self, store: CacheStore) -> Result<()> {
        match self {
            Self::Memory { max_capacity: 0 } => Err(CachewardError::Config(format!(
                "store '{store}': memory max_capacity must be greater than 0"
            ))),
            Self::Redis { url, .. } if url.trim().is_empty() => {
                Err(CachewardError::Config(format!("store '{store}': redis url is empty")))
            }
            _ => Ok(()),
        }
    }
}

fn default_memory_capacity() -> u64 {
    DEFAULT_MEMORY_CAPACITY
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines on the console instead of human-readable text
    pub json: bool,
    /// Optional log file receiving warnings and errors
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false, file: None }
    }
}
