//! Redis cache backend
//!
//! Uses `redis::aio::ConnectionManager` for a multiplexed connection with
//! automatic reconnection. Entries live under
//! `{prefix}:{store}:{version}:{key}`.
//! Requires the `redis` feature flag.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cacheward_core::{BackendError, CacheBackend};
use cacheward_domain::CacheStore;
use redis::aio::ConnectionManager;
use tracing::debug;

/// Redis-backed [`CacheBackend`]
#[derive(Clone)]
pub struct RedisBackend {
    connection_manager: ConnectionManager,
    key_prefix: String,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connection_manager", &"ConnectionManager")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisBackend {
    /// Connect to `url`
    ///
    /// # Errors
    /// Returns `BackendError` when the URL is invalid or the server cannot be
    /// reached.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)
            .map_err(|e| BackendError::with_source("failed to create Redis client", e))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| BackendError::with_source("failed to connect to Redis", e))?;

        debug!(url = %redact_url(url), "Redis cache backend connected");

        Ok(Self { connection_manager, key_prefix: key_prefix.into() })
    }

    fn entry_key(&self, store: CacheStore, key: &str, version: u32) -> String {
        entry_key(&self.key_prefix, store, key, version)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(
        &self,
        store: CacheStore,
        key: &str,
        version: u32,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("GET")
            .arg(self.entry_key(store, key, version))
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| BackendError::with_source("Redis GET failed", e))
    }

    async fn set(
        &self,
        store: CacheStore,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        version: u32,
    ) -> Result<(), BackendError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("SET")
            .arg(self.entry_key(store, key, version))
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| BackendError::with_source("Redis SET failed", e))
    }

    async fn delete(&self, store: CacheStore, key: &str, version: u32) -> Result<(), BackendError> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("DEL")
            .arg(self.entry_key(store, key, version))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| BackendError::with_source("Redis DEL failed", e))
    }
}

fn entry_key(prefix: &str, store: CacheStore, key: &str, version: u32) -> String {
    format!("{prefix}:{store}:{version}:{key}")
}

/// Whole seconds for `EX`, rounded up; Redis rejects a zero expiry
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Redact credentials from a Redis URL for logging
fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            return format!("{}***{}", &url[..=colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}
