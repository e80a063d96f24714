//! In-process cache backend using Moka
//!
//! Entries carry their own TTL through a moka [`Expiry`], so patterns with
//! different lifetimes can share one cache. Entries are keyed by
//! `(store, version, key)`, so every store can be served from one instance.
//! State is per process and is lost on restart.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cacheward_core::{BackendError, CacheBackend};
use cacheward_domain::CacheStore;
use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

type EntryKey = (CacheStore, u32, String);

#[derive(Clone)]
struct MemoryEntry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<EntryKey, MemoryEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &EntryKey,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    // An overwrite restarts the clock with the new entry's TTL.
    fn expire_after_update(
        &self,
        _key: &EntryKey,
        value: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed [`CacheBackend`]
#[derive(Clone)]
pub struct MemoryBackend {
    cache: Cache<EntryKey, MemoryEntry>,
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MemoryBackend {
    /// Create a backend holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).expire_after(EntryExpiry).build();
        debug!(max_capacity, "Memory cache backend created");
        Self { cache }
    }

    /// Number of live entries
    ///
    /// Runs pending maintenance first so expired entries are not counted.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(
        &self,
        store: CacheStore,
        key: &str,
        version: u32,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        let entry = self.cache.get(&(store, version, key.to_string())).await;
        Ok(entry.map(|entry| entry.bytes.to_vec()))
    }

    async fn set(
        &self,
        store: CacheStore,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        version: u32,
    ) -> Result<(), BackendError> {
        let entry = MemoryEntry { bytes: value.into(), ttl };
        self.cache.insert((store, version, key.to_string()), entry).await;
        Ok(())
    }

    async fn delete(&self, store: CacheStore, key: &str, version: u32) -> Result<(), BackendError> {
        self.cache.invalidate(&(store, version, key.to_string())).await;
        Ok(())
    }
}
