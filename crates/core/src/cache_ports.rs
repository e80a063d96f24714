//! Cache backend port.
//!
//! A backend stores opaque byte values under `(store, version, key)` with a
//! per-key TTL. Stores and versions both partition the keyspace: the same key
//! string under another store or version addresses a different entry, even
//! when several stores are served by one backend.
//!
//! # Example
//!
//! ```no_run
//! use cacheward_core::CacheBackend;
//! use cacheward_domain::CacheStore;
//!
//! async fn warm(backend: &dyn CacheBackend) {
//!     let ttl = std::time::Duration::from_secs(60);
//!     backend.set(CacheStore::Default, "greeting", b"hello".to_vec(), ttl, 1).await.unwrap();
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use cacheward_domain::CacheStore;
use thiserror::Error;

/// Boxed error type carried as the cause of port failures
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a cache backend
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self { message: message.into(), source: Some(source.into()) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Port for a key-value cache server.
///
/// Implementations own their network timeouts; callers never add their own.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs (e.g. `"memory"`, `"redis"`)
    fn name(&self) -> &str;

    /// Read the value stored under `(store, version, key)`.
    ///
    /// Returns `Ok(None)` on a miss or an expired entry.
    async fn get(
        &self,
        store: CacheStore,
        key: &str,
        version: u32,
    ) -> Result<Option<Vec<u8>>, BackendError>;

    /// Store `value` under `(store, version, key)`, expiring after `ttl`.
    async fn set(
        &self,
        store: CacheStore,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        version: u32,
    ) -> Result<(), BackendError>;

    /// Remove the entry under `(store, version, key)`; removing a missing
    /// entry is not an error.
    async fn delete(&self, store: CacheStore, key: &str, version: u32) -> Result<(), BackendError>;
}
