//! Read-through client with an authoritative fallback
//!
//! [`ReadThroughCacheClient::get`] always produces rows: from the cache when
//! it is healthy and populated, from the pattern's [`DataSource`] otherwise.
//! It fails only when the source itself fails, or when a freshly written
//! entry is missing on read-back. A written entry that does not decode is
//! evicted and the source rows are returned.
//!
//! [`ReadThroughCacheClient::get_one`] serves patterns whose source answers
//! with a single value ([`QueryRows::One`](crate::QueryRows::One)). It shares
//! entries with `get`.
//!
//! Concurrent misses on the same key are not de-duplicated; each caller
//! queries the source and the last write wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cacheward_common::resilience::{CacheCircuitBreaker, Clock, SystemClock};
use cacheward_domain::{AccessPattern, CacheStore, Encoding, KeyTemplate, Params};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::client::{decode_entry, encode_entry, CacheClient};
use crate::error::{log_cache_error, CacheError, CacheResult};
use crate::source_ports::DataSource;
use crate::store::{CacheSlot, StoreRegistry};

/// Access pattern whose rows come from a [`DataSource`]
///
/// Entries hold the full row list and default to [`Encoding::Binary`].
pub struct ReadThroughPattern<T: Send + 'static> {
    access: AccessPattern<Vec<T>>,
    source: Arc<dyn DataSource<T>>,
    params: Params,
}

impl<T: Send + 'static> ReadThroughPattern<T> {
    pub fn new(
        name: &'static str,
        store: CacheStore,
        ttl: Duration,
        key: KeyTemplate,
        source: Arc<dyn DataSource<T>>,
    ) -> Self {
        Self {
            access: AccessPattern::new(name, store, ttl, key).with_encoding(Encoding::Binary),
            source,
            params: Params::new(),
        }
    }

    /// Fixed query arguments passed to the source on every miss
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.access = self.access.with_version(version);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.access = self.access.with_encoding(encoding);
        self
    }

    /// The cache side of the pattern
    pub fn access(&self) -> &AccessPattern<Vec<T>> {
        &self.access
    }

    pub fn name(&self) -> &'static str {
        self.access.name()
    }

    pub fn source(&self) -> &Arc<dyn DataSource<T>> {
        &self.source
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl<T: Send + 'static> Clone for ReadThroughPattern<T> {
    fn clone(&self) -> Self {
        Self {
            access: self.access.clone(),
            source: Arc::clone(&self.source),
            params: self.params.clone(),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for ReadThroughPattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughPattern")
            .field("access", &self.access)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Cache client that falls back to the pattern's source
pub struct ReadThroughCacheClient<C: Clock = SystemClock> {
    cache: CacheClient<C>,
}

impl<C: Clock> Clone for ReadThroughCacheClient<C> {
    fn clone(&self) -> Self {
        Self { cache: self.cache.clone() }
    }
}

impl<C: Clock> ReadThroughCacheClient<C> {
    pub fn new(registry: Arc<StoreRegistry>, breaker: Arc<CacheCircuitBreaker<C>>) -> Self {
        Self { cache: CacheClient::new(registry, breaker) }
    }

    /// Share the registry and breaker of an existing cache-only client
    pub fn from_client(cache: CacheClient<C>) -> Self {
        Self { cache }
    }

    pub fn breaker(&self) -> &Arc<CacheCircuitBreaker<C>> {
        self.cache.breaker()
    }

    /// Rows for `pattern` and `args`, from cache or source
    ///
    /// # Errors
    /// - [`CacheError::UnknownStore`] / [`CacheError::InvalidKeyArgs`] when
    ///   the pattern cannot be located
    /// - [`CacheError::Decode`] when a cached entry is corrupt
    /// - [`CacheError::SourceQuery`] when the source fails
    /// - [`CacheError::ReadThroughFailed`] when a written entry cannot be
    ///   read back
    #[instrument(skip_all, fields(pattern = pattern.name(), store = %pattern.access().store()))]
    pub async fn get<T>(
        &self,
        pattern: &ReadThroughPattern<T>,
        args: &Params,
    ) -> CacheResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let access = pattern.access();
        let slot = self.cache.registry().locate(access, args)?;

        if !self.cache.breaker().allow_request() {
            debug!(key = %slot.key, "Cache circuit open, serving from source");
            return query_source(pattern).await;
        }

        match self.cache.read_slot(&slot, access.name()).await {
            Ok(Some(bytes)) => return decode_entry(access, &bytes),
            Ok(None) => debug!(key = %slot.key, version = slot.version, "Cache miss"),
            Err(err) => {
                log_cache_error(&err, "Cache read failed, serving from source");
                return query_source(pattern).await;
            }
        }

        let rows = query_source(pattern).await?;
        if !self.populate(&slot, access, &rows).await {
            return Ok(rows);
        }
        self.confirm(&slot, access, rows).await
    }

    /// The single value for `pattern` and `args`
    ///
    /// Returns `Ok(None)` when the source produced no rows.
    ///
    /// # Errors
    /// As [`get`](Self::get), plus [`CacheError::SourceQuery`] when the rows
    /// hold more than one value.
    pub async fn get_one<T>(
        &self,
        pattern: &ReadThroughPattern<T>,
        args: &Params,
    ) -> CacheResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let mut rows = self.get(pattern, args).await?;
        if rows.len() > 1 {
            let source = format!("expected at most one row, got {}", rows.len()).into();
            return Err(CacheError::SourceQuery { pattern: pattern.name(), source });
        }
        Ok(rows.pop())
    }

    /// Query the source and overwrite the cached entry
    ///
    /// # Errors
    /// - [`CacheError::SourceQuery`] when the source fails
    /// - [`CacheError::Encode`] / [`CacheError::CacheOperation`] when the
    ///   entry cannot be written
    #[instrument(skip_all, fields(pattern = pattern.name(), store = %pattern.access().store()))]
    pub async fn refresh<T>(
        &self,
        pattern: &ReadThroughPattern<T>,
        args: &Params,
    ) -> CacheResult<Vec<T>>
    where
        T: Serialize + Send + 'static,
    {
        let access = pattern.access();
        let slot = self.cache.registry().locate(access, args)?;
        let rows = query_source(pattern).await?;
        let bytes = encode_entry(access, &rows)?;
        self.cache.write_slot(&slot, access, bytes).await?;
        info!(key = %slot.key, rows = rows.len(), "Cache entry refreshed from source");
        Ok(rows)
    }

    /// Drop the cached entry so the next `get` reloads from source
    pub async fn invalidate<T>(
        &self,
        pattern: &ReadThroughPattern<T>,
        args: &Params,
    ) -> CacheResult<()>
    where
        T: Send + 'static,
    {
        self.cache.invalidate(pattern.access(), args).await
    }

    /// Read back a freshly written entry
    async fn confirm<T>(
        &self,
        slot: &CacheSlot,
        access: &AccessPattern<Vec<T>>,
        rows: Vec<T>,
    ) -> CacheResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        match self.cache.read_slot(slot, access.name()).await {
            Ok(Some(bytes)) => match decode_entry(access, &bytes) {
                Ok(cached) => Ok(cached),
                // Already logged by decode_entry; later reads must not hit it.
                Err(_) => {
                    if let Err(err) = self.cache.delete_slot(slot, access.name()).await {
                        log_cache_error(&err, "Could not evict unreadable entry");
                    }
                    Ok(rows)
                }
            },
            Ok(None) => Err(CacheError::ReadThroughFailed {
                pattern: access.name(),
                key: slot.key.clone(),
            }),
            Err(err) => {
                log_cache_error(&err, "Confirmation read failed, returning source rows");
                Ok(rows)
            }
        }
    }

    /// Best-effort write-back; `true` when the entry was written
    async fn populate<T>(
        &self,
        slot: &CacheSlot,
        access: &AccessPattern<Vec<T>>,
        rows: &[T],
    ) -> bool
    where
        T: Serialize,
    {
        let bytes = match encode_entry(access, rows) {
            Ok(bytes) => bytes,
            Err(err) => {
                log_cache_error(&err, "Could not encode source rows, skipping write-back");
                return false;
            }
        };

        match self.cache.write_slot(slot, access, bytes).await {
            Ok(()) => true,
            Err(err) => {
                log_cache_error(&err, "Write-back failed, returning source rows");
                false
            }
        }
    }
}

async fn query_source<T>(pattern: &ReadThroughPattern<T>) -> CacheResult<Vec<T>>
where
    T: Send + 'static,
{
    let into_error = |source| CacheError::SourceQuery { pattern: pattern.name(), source };
    let rows = pattern.source().query(pattern.params()).await.map_err(into_error)?;
    let rows = rows.collect().await.map_err(into_error)?;
    debug!(rows = rows.len(), "Loaded rows from source");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use cacheward_common::resilience::{BreakerConfig, MockClock};
    use cacheward_domain::constants::ttl;
    use cacheward_domain::params;
    use serde::Deserialize;

    use super::*;
    use crate::source_ports::{source_fn, QueryRows, SourceError};
    use crate::testing::{CountingSource, ScriptedBackend};

    struct Harness {
        client: ReadThroughCacheClient<MockClock>,
        backend: ScriptedBackend,
        source: CountingSource<u32>,
        pattern: ReadThroughPattern<u32>,
    }

    fn harness() -> Harness {
        let backend = ScriptedBackend::new();
        let registry = StoreRegistry::builder()
            .register(CacheStore::Resources, Arc::new(backend.clone()))
            .build();
        let breaker = BreakerConfig::new().clock(MockClock::new()).build().unwrap();
        let source = CountingSource::new(vec![1, 2, 3]);
        let pattern = ReadThroughPattern::new(
            "bed_counts",
            CacheStore::Resources,
            ttl::FIFTEEN_MINUTES,
            KeyTemplate::template("beds:{city}"),
            Arc::new(source.clone()),
        )
        .with_params(params! { "open_only" => true });

        Harness {
            client: ReadThroughCacheClient::new(Arc::new(registry), Arc::new(breaker)),
            backend,
            source,
            pattern,
        }
    }

    fn args() -> Params {
        params! { "city" => "vancouver" }
    }

    /// Validates populate-then-serve.
    ///
    /// Assertions:
    /// - Confirms the first call returns source rows and writes the entry.
    /// - Confirms the second call is served from cache with the source down.
    #[tokio::test]
    async fn test_miss_populates_then_serves_from_cache() {
        let h = harness();

        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(h.source.calls(), 1);
        assert_eq!(h.source.last_params(), Some(params! { "open_only" => true }));
        assert!(h.backend.stored(CacheStore::Resources, "beds:vancouver", 1).is_some());

        h.source.fail(true);
        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_entries_use_binary_envelope() {
        let h = harness();
        h.client.get(&h.pattern, &args()).await.unwrap();

        let raw = h.backend.stored(CacheStore::Resources, "beds:vancouver", 1).unwrap();
        assert_eq!(&raw[..2], b"CW");
        assert_eq!(h.backend.last_ttl(), Some(ttl::FIFTEEN_MINUTES));
    }

    /// Validates the open-circuit bypass.
    ///
    /// Assertions:
    /// - Confirms source rows are returned.
    /// - Confirms the backend sees neither reads nor writes.
    #[tokio::test]
    async fn test_open_circuit_bypasses_cache() {
        let h = harness();
        h.client.breaker().force_open();

        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(h.backend.get_calls(), 0);
        assert_eq!(h.backend.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_error_serves_source_without_write_back() {
        let h = harness();
        h.backend.fail_reads(true);

        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(h.backend.set_calls(), 0);
        assert_eq!(h.client.breaker().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_rows() {
        let h = harness();
        h.backend.fail_writes(true);

        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(h.backend.set_calls(), 1);
        assert_eq!(h.backend.get_calls(), 1);
    }

    /// Validates the post-write consistency check.
    #[tokio::test]
    async fn test_lost_write_is_read_through_failure() {
        let h = harness();
        h.backend.drop_writes(true);

        let err = h.client.get(&h.pattern, &args()).await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::ReadThroughFailed { ref key, .. } if key == "beds:vancouver"
        ));
    }

    #[tokio::test]
    async fn test_source_failure_is_surfaced() {
        let h = harness();
        h.source.fail(true);

        let err = h.client.get(&h.pattern, &args()).await.unwrap_err();
        assert!(matches!(err, CacheError::SourceQuery { pattern: "bed_counts", .. }));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_decode_error() {
        let h = harness();
        h.backend.seed(CacheStore::Resources, "beds:vancouver", 1, b"garbage".to_vec());

        let err = h.client.get(&h.pattern, &args()).await.unwrap_err();
        assert!(matches!(err, CacheError::Decode { encoding: Encoding::Binary, .. }));
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_overwrites_entry() {
        let h = harness();
        h.client.get(&h.pattern, &args()).await.unwrap();

        h.source.set_rows(vec![9]);
        assert_eq!(h.client.refresh(&h.pattern, &args()).await.unwrap(), vec![9]);
        assert_eq!(h.client.get(&h.pattern, &args()).await.unwrap(), vec![9]);
        assert_eq!(h.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let h = harness();
        h.client.get(&h.pattern, &args()).await.unwrap();

        h.client.invalidate(&h.pattern, &args()).await.unwrap();
        h.client.get(&h.pattern, &args()).await.unwrap();

        assert_eq!(h.source.calls(), 2);
    }

    /// A type whose encoded form its own `Deserialize` cannot read.
    #[derive(Debug, Clone, PartialEq)]
    struct Lopsided(u32);

    impl Serialize for Lopsided {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u32(self.0)
        }
    }

    impl<'de> Deserialize<'de> for Lopsided {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = String::deserialize(deserializer)?;
            text.parse().map(Lopsided).map_err(serde::de::Error::custom)
        }
    }

    /// Validates the read-back of an entry that does not decode.
    ///
    /// Assertions:
    /// - Confirms the source rows are returned.
    /// - Confirms the unreadable entry is evicted.
    #[tokio::test]
    async fn test_undecodable_write_back_is_evicted() {
        let h = harness();
        let pattern = ReadThroughPattern::new(
            "lopsided",
            CacheStore::Resources,
            ttl::MINUTE,
            KeyTemplate::fixed("lopsided"),
            Arc::new(source_fn(|_params: Params| async {
                Ok::<_, SourceError>(QueryRows::Many(vec![Lopsided(4)]))
            })),
        );

        assert_eq!(h.client.get(&pattern, &Params::new()).await.unwrap(), vec![Lopsided(4)]);
        assert_eq!(h.backend.set_calls(), 1);
        assert_eq!(h.backend.delete_calls(), 1);
        assert!(h.backend.stored(CacheStore::Resources, "lopsided", 1).is_none());
    }

    fn single_row(name: &'static str, rows: QueryRows<u32>) -> ReadThroughPattern<u32> {
        let rows = parking_lot::Mutex::new(Some(rows));
        ReadThroughPattern::new(
            name,
            CacheStore::Resources,
            ttl::MINUTE,
            KeyTemplate::fixed(name),
            Arc::new(source_fn(move |_params: Params| {
                let rows = rows.lock().take().unwrap_or(QueryRows::Many(Vec::new()));
                async move { Ok::<_, SourceError>(rows) }
            })),
        )
    }

    /// Validates single-value reads.
    ///
    /// Assertions:
    /// - Confirms a `One` answer comes back as the value, then from cache.
    /// - Confirms an empty answer is `None`.
    /// - Confirms several rows are rejected.
    #[tokio::test]
    async fn test_get_one_returns_single_value() {
        let h = harness();

        let total = single_row("total_beds", QueryRows::One(120));
        assert_eq!(h.client.get_one(&total, &Params::new()).await.unwrap(), Some(120));
        assert_eq!(h.client.get_one(&total, &Params::new()).await.unwrap(), Some(120));
        assert_eq!(h.backend.set_calls(), 1);

        let none = single_row("no_beds", QueryRows::Many(Vec::new()));
        assert_eq!(h.client.get_one(&none, &Params::new()).await.unwrap(), None);

        let many = single_row("many_beds", QueryRows::Many(vec![1, 2]));
        let err = h.client.get_one(&many, &Params::new()).await.unwrap_err();
        assert!(matches!(err, CacheError::SourceQuery { pattern: "many_beds", .. }));
    }
}
