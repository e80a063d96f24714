//! Test doubles for the cache and source ports
//!
//! Both doubles are cheap to clone; clones share state, so a test can keep
//! one handle for assertions and hand another to the client under test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cacheward_domain::{CacheStore, Params};
use parking_lot::Mutex;

use crate::cache_ports::{BackendError, CacheBackend};
use crate::source_ports::{DataSource, QueryRows, SourceError};

type EntryKey = (CacheStore, u32, String);

#[derive(Debug, Default)]
struct BackendState {
    entries: Mutex<HashMap<EntryKey, Vec<u8>>>,
    last_ttl: Mutex<Option<Duration>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    drop_writes: AtomicBool,
    gets: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

/// In-memory [`CacheBackend`] with fault injection and call counters
///
/// TTLs are recorded but never enforced.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<BackendState>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with a `BackendError`
    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write and delete fail with a `BackendError`
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Acknowledge writes without storing them
    pub fn drop_writes(&self, drop: bool) {
        self.state.drop_writes.store(drop, Ordering::SeqCst);
    }

    /// Store raw bytes directly, bypassing counters and faults
    pub fn seed(&self, store: CacheStore, key: &str, version: u32, value: Vec<u8>) {
        self.state.entries.lock().insert((store, version, key.to_string()), value);
    }

    /// Raw bytes under `(store, version, key)`
    pub fn stored(&self, store: CacheStore, key: &str, version: u32) -> Option<Vec<u8>> {
        self.state.entries.lock().get(&(store, version, key.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_calls(&self) -> u64 {
        self.state.gets.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> u64 {
        self.state.sets.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u64 {
        self.state.deletes.load(Ordering::SeqCst)
    }

    /// TTL passed to the most recent `set`
    pub fn last_ttl(&self) -> Option<Duration> {
        *self.state.last_ttl.lock()
    }
}

#[async_trait]
impl CacheBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get(
        &self,
        store: CacheStore,
        key: &str,
        version: u32,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        self.state.gets.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::new(format!("scripted read failure for '{key}'")));
        }
        Ok(self.stored(store, key, version))
    }

    async fn set(
        &self,
        store: CacheStore,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        version: u32,
    ) -> Result<(), BackendError> {
        self.state.sets.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::new(format!("scripted write failure for '{key}'")));
        }
        *self.state.last_ttl.lock() = Some(ttl);
        if !self.state.drop_writes.load(Ordering::SeqCst) {
            self.seed(store, key, version, value);
        }
        Ok(())
    }

    async fn delete(&self, store: CacheStore, key: &str, version: u32) -> Result<(), BackendError> {
        self.state.deletes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::new(format!("scripted delete failure for '{key}'")));
        }
        self.state.entries.lock().remove(&(store, version, key.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
struct SourceState<T> {
    rows: Mutex<Vec<T>>,
    last_params: Mutex<Option<Params>>,
    fail: AtomicBool,
    calls: AtomicU64,
}

/// [`DataSource`] returning a fixed row set and counting queries
#[derive(Debug)]
pub struct CountingSource<T> {
    state: Arc<SourceState<T>>,
}

impl<T> Clone for CountingSource<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T: Clone> CountingSource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            state: Arc::new(SourceState {
                rows: Mutex::new(rows),
                last_params: Mutex::new(None),
                fail: AtomicBool::new(false),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the rows returned by later queries
    pub fn set_rows(&self, rows: Vec<T>) {
        *self.state.rows.lock() = rows;
    }

    /// Make every query fail
    pub fn fail(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u64 {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Parameters passed to the most recent query
    pub fn last_params(&self) -> Option<Params> {
        self.state.last_params.lock().clone()
    }
}

#[async_trait]
impl<T> DataSource<T> for CountingSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn query(&self, params: &Params) -> Result<QueryRows<T>, SourceError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_params.lock() = Some(params.clone());
        if self.state.fail.load(Ordering::SeqCst) {
            return Err("source unavailable".into());
        }
        Ok(QueryRows::Many(self.state.rows.lock().clone()))
    }
}
