//! Cache-only client
//!
//! [`CacheClient`] never falls back to another data source. A failing cache
//! shows up as `None` from [`CacheClient::get`] (the caller treats it as a
//! miss) and as an error from [`CacheClient::set`].

use std::sync::Arc;

use cacheward_common::resilience::{CacheCircuitBreaker, Clock, SystemClock};
use cacheward_domain::{AccessPattern, Params};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cache_ports::BackendError;
use crate::codec;
use crate::error::{log_cache_error, CacheError, CacheOp, CacheResult};
use crate::store::{CacheSlot, StoreRegistry};

/// Typed get/set over the registered stores, gated by the shared breaker
pub struct CacheClient<C: Clock = SystemClock> {
    registry: Arc<StoreRegistry>,
    breaker: Arc<CacheCircuitBreaker<C>>,
}

impl<C: Clock> Clone for CacheClient<C> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry), breaker: Arc::clone(&self.breaker) }
    }
}

impl<C: Clock> CacheClient<C> {
    pub fn new(registry: Arc<StoreRegistry>, breaker: Arc<CacheCircuitBreaker<C>>) -> Self {
        Self { registry, breaker }
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    pub fn breaker(&self) -> &Arc<CacheCircuitBreaker<C>> {
        &self.breaker
    }

    /// Read and decode the value for `pattern` and `args`
    ///
    /// Returns `Ok(None)` on a miss, while the circuit is open, and when the
    /// backend read fails (the failure is counted by the breaker and logged).
    /// Rejected reads log at debug level; the breaker itself logs when the
    /// circuit opens.
    ///
    /// # Errors
    /// - [`CacheError::UnknownStore`] / [`CacheError::InvalidKeyArgs`] when
    ///   the pattern cannot be located
    /// - [`CacheError::Decode`] when the stored bytes do not decode; a
    ///   corrupt entry is never reported as a miss
    #[instrument(skip_all, fields(pattern = pattern.name(), store = %pattern.store()))]
    pub async fn get<T>(&self, pattern: &AccessPattern<T>, args: &Params) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let slot = self.registry.locate(pattern, args)?;

        if !self.breaker.allow_request() {
            debug!(key = %slot.key, "Cache circuit open, skipping read");
            return Ok(None);
        }

        match self.read_slot(&slot, pattern.name()).await {
            Ok(Some(bytes)) => decode_entry(pattern, &bytes).map(Some),
            Ok(None) => {
                debug!(key = %slot.key, version = slot.version, "Cache miss");
                Ok(None)
            }
            Err(err) => {
                log_cache_error(&err, "Cache read failed, treating as miss");
                Ok(None)
            }
        }
    }

    /// Encode `value` and write it with the pattern's TTL and version
    ///
    /// Writes do not consult the breaker, but their outcome is reported to
    /// it.
    ///
    /// # Errors
    /// - [`CacheError::Encode`] when the value cannot be encoded
    /// - [`CacheError::CacheOperation`] when the backend write fails
    #[instrument(skip_all, fields(pattern = pattern.name(), store = %pattern.store()))]
    pub async fn set<T>(
        &self,
        value: &T,
        pattern: &AccessPattern<T>,
        args: &Params,
    ) -> CacheResult<()>
    where
        T: Serialize,
    {
        let slot = self.registry.locate(pattern, args)?;
        let bytes = encode_entry(pattern, value)?;
        self.write_slot(&slot, pattern, bytes).await
    }

    /// Remove the entry for `pattern` and `args`
    ///
    /// # Errors
    /// [`CacheError::CacheOperation`] when the backend delete fails.
    #[instrument(skip_all, fields(pattern = pattern.name(), store = %pattern.store()))]
    pub async fn invalidate<T>(
        &self,
        pattern: &AccessPattern<T>,
        args: &Params,
    ) -> CacheResult<()> {
        let slot = self.registry.locate(pattern, args)?;
        self.delete_slot(&slot, pattern.name()).await
    }

    /// Backend read with breaker reporting
    pub(crate) async fn read_slot(
        &self,
        slot: &CacheSlot,
        pattern: &'static str,
    ) -> CacheResult<Option<Vec<u8>>> {
        let result = slot.backend.get(slot.store, &slot.key, slot.version).await;
        self.report(result, slot, pattern, CacheOp::Get)
    }

    /// Backend delete with breaker reporting
    pub(crate) async fn delete_slot(
        &self,
        slot: &CacheSlot,
        pattern: &'static str,
    ) -> CacheResult<()> {
        let result = slot.backend.delete(slot.store, &slot.key, slot.version).await;
        self.report(result, slot, pattern, CacheOp::Delete)?;
        debug!(key = %slot.key, version = slot.version, "Cache entry invalidated");
        Ok(())
    }

    /// Backend write with breaker reporting
    pub(crate) async fn write_slot<T>(
        &self,
        slot: &CacheSlot,
        pattern: &AccessPattern<T>,
        bytes: Vec<u8>,
    ) -> CacheResult<()> {
        let len = bytes.len();
        let result =
            slot.backend.set(slot.store, &slot.key, bytes, pattern.ttl(), slot.version).await;
        self.report(result, slot, pattern.name(), CacheOp::Set)?;
        debug!(
            key = %slot.key,
            version = slot.version,
            bytes = len,
            ttl_secs = pattern.ttl().as_secs(),
            "Cache entry written"
        );
        Ok(())
    }

    fn report<V>(
        &self,
        result: Result<V, BackendError>,
        slot: &CacheSlot,
        pattern: &'static str,
        operation: CacheOp,
    ) -> CacheResult<V> {
        match result {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(source) => {
                self.breaker.record_failure();
                Err(CacheError::CacheOperation { pattern, store: slot.store, operation, source })
            }
        }
    }
}

pub(crate) fn encode_entry<T, V>(pattern: &AccessPattern<T>, value: &V) -> CacheResult<Vec<u8>>
where
    V: Serialize + ?Sized,
{
    codec::encode(value, pattern.encoding()).map_err(|source| CacheError::Encode {
        pattern: pattern.name(),
        encoding: pattern.encoding(),
        source,
    })
}

pub(crate) fn decode_entry<T>(pattern: &AccessPattern<T>, bytes: &[u8]) -> CacheResult<T>
where
    T: DeserializeOwned,
{
    codec::decode(bytes, pattern.encoding()).map_err(|source| {
        let err =
            CacheError::Decode { pattern: pattern.name(), encoding: pattern.encoding(), source };
        log_cache_error(&err, "Corrupt cache entry");
        err
    })
}
