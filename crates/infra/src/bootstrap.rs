//! Composition root
//!
//! Builds the shared breaker, one backend per distinct backend setting, the
//! store registry and both clients from a [`CacheLayerConfig`].

use std::sync::Arc;

use cacheward_common::resilience::{BreakerConfig, CacheCircuitBreaker, Clock, SystemClock};
use cacheward_core::{CacheBackend, CacheClient, ReadThroughCacheClient, StoreRegistry};
use cacheward_domain::{BackendSettings, CacheLayerConfig, CacheStore};
use tracing::info;

use crate::backends::MemoryBackend;
use crate::errors::{InfraError, InfraResult};

/// Both clients over one registry and one breaker
pub struct CacheLayer<C: Clock = SystemClock> {
    registry: Arc<StoreRegistry>,
    breaker: Arc<CacheCircuitBreaker<C>>,
    cache: CacheClient<C>,
    read_through: ReadThroughCacheClient<C>,
}

impl CacheLayer<SystemClock> {
    /// Build everything `config` describes
    ///
    /// # Errors
    /// - `InfraError::Config` when `config` fails validation
    /// - `InfraError::Breaker` for unusable breaker settings
    /// - `InfraError::Backend` when a backend cannot be opened
    /// - `InfraError::BackendUnavailable` when a store needs a backend this
    ///   build does not include
    pub async fn from_config(config: &CacheLayerConfig) -> InfraResult<Self> {
        let breaker_config = BreakerConfig::new()
            .failure_threshold(config.breaker.failure_threshold)
            .retry_timeout(config.breaker.retry_timeout())
            .build()?;
        let breaker = CacheCircuitBreaker::new(breaker_config)?;
        Self::with_breaker(config, Arc::new(breaker)).await
    }
}

impl<C: Clock> CacheLayer<C> {
    /// Build the registry from `config` around an existing breaker
    ///
    /// The breaker settings in `config` are ignored.
    pub async fn with_breaker(
        config: &CacheLayerConfig,
        breaker: Arc<CacheCircuitBreaker<C>>,
    ) -> InfraResult<Self> {
        config.validate()?;
        let registry = Arc::new(build_registry(config).await?);

        info!(
            stores = ?registry.stores(),
            failure_threshold = breaker.config().failure_threshold,
            retry_timeout_secs = breaker.config().retry_timeout.as_secs(),
            "Cache layer ready"
        );

        let cache = CacheClient::new(Arc::clone(&registry), Arc::clone(&breaker));
        let read_through = ReadThroughCacheClient::from_client(cache.clone());
        Ok(Self { registry, breaker, cache, read_through })
    }

    pub fn cache(&self) -> &CacheClient<C> {
        &self.cache
    }

    pub fn read_through(&self) -> &ReadThroughCacheClient<C> {
        &self.read_through
    }

    pub fn breaker(&self) -> &Arc<CacheCircuitBreaker<C>> {
        &self.breaker
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }
}

// Stores with identical settings share a backend (and its connection).
async fn build_registry(config: &CacheLayerConfig) -> InfraResult<StoreRegistry> {
    let mut opened: Vec<(&BackendSettings, Arc<dyn CacheBackend>)> = Vec::new();
    let mut builder = StoreRegistry::builder();

    for settings in &config.stores {
        let existing = opened.iter().find(|(backend, _)| *backend == &settings.backend);
        let backend = match existing {
            Some((_, backend)) => Arc::clone(backend),
            None => {
                let backend = open_backend(settings.store, &settings.backend).await?;
                opened.push((&settings.backend, Arc::clone(&backend)));
                backend
            }
        };
        builder = builder.register(settings.store, backend);
    }

    Ok(builder.build())
}

async fn open_backend(
    store: CacheStore,
    settings: &BackendSettings,
) -> InfraResult<Arc<dyn CacheBackend>> {
    match settings {
        BackendSettings::Memory { max_capacity } => {
            Ok(Arc::new(MemoryBackend::new(*max_capacity)))
        }
        #[cfg(feature = "redis")]
        BackendSettings::Redis { url, key_prefix } => {
            let backend = crate::backends::RedisBackend::connect(url, key_prefix.as_str())
                .await
                .map_err(|source| InfraError::Backend { store, kind: "redis", source })?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "redis"))]
        BackendSettings::Redis { .. } => {
            Err(InfraError::BackendUnavailable { store, kind: "redis" })
        }
    }
}
