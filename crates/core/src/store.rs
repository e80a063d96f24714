//! Store resolution and key building shared by both cache clients

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cacheward_domain::{AccessPattern, CacheStore, Params};

use crate::cache_ports::CacheBackend;
use crate::error::{CacheError, CacheResult};

/// Map from logical store to the backend serving it
#[derive(Clone, Default)]
pub struct StoreRegistry {
    backends: HashMap<CacheStore, Arc<dyn CacheBackend>>,
}

/// Builder for [`StoreRegistry`]
#[derive(Default)]
pub struct StoreRegistryBuilder {
    backends: HashMap<CacheStore, Arc<dyn CacheBackend>>,
}

impl StoreRegistryBuilder {
    /// Serve `store` from `backend`, replacing any earlier registration
    pub fn register(mut self, store: CacheStore, backend: Arc<dyn CacheBackend>) -> Self {
        self.backends.insert(store, backend);
        self
    }

    /// Serve every store in `stores` from the same backend
    pub fn register_all(mut self, stores: &[CacheStore], backend: Arc<dyn CacheBackend>) -> Self {
        for store in stores {
            self.backends.insert(*store, Arc::clone(&backend));
        }
        self
    }

    pub fn build(self) -> StoreRegistry {
        StoreRegistry { backends: self.backends }
    }
}

/// Resolved backend coordinate for one call
#[derive(Clone)]
pub struct CacheSlot {
    pub store: CacheStore,
    pub backend: Arc<dyn CacheBackend>,
    pub key: String,
    pub version: u32,
}

impl fmt::Debug for CacheSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSlot")
            .field("store", &self.store)
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .field("version", &self.version)
            .finish()
    }
}

impl StoreRegistry {
    pub fn builder() -> StoreRegistryBuilder {
        StoreRegistryBuilder::default()
    }

    /// Backend serving `store`
    ///
    /// # Errors
    /// [`CacheError::UnknownStore`] when nothing is registered for `store`.
    pub fn resolve(&self, store: CacheStore) -> CacheResult<Arc<dyn CacheBackend>> {
        self.backends.get(&store).cloned().ok_or(CacheError::UnknownStore { store })
    }

    /// Render `pattern`'s key for `args`
    ///
    /// # Errors
    /// [`CacheError::InvalidKeyArgs`] on missing, mistyped or unexpected
    /// arguments.
    pub fn render_key<T>(pattern: &AccessPattern<T>, args: &Params) -> CacheResult<String> {
        pattern
            .key(args)
            .map_err(|source| CacheError::InvalidKeyArgs { pattern: pattern.name(), source })
    }

    /// Resolve store and key together
    pub fn locate<T>(&self, pattern: &AccessPattern<T>, args: &Params) -> CacheResult<CacheSlot> {
        let backend = self.resolve(pattern.store())?;
        let key = Self::render_key(pattern, args)?;
        Ok(CacheSlot { store: pattern.store(), backend, key, version: pattern.version() })
    }

    pub fn contains(&self, store: CacheStore) -> bool {
        self.backends.contains_key(&store)
    }

    /// Registered stores in declaration order
    pub fn stores(&self) -> Vec<CacheStore> {
        CacheStore::ALL.iter().copied().filter(|store| self.contains(*store)).collect()
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for store in self.stores() {
            if let Some(backend) = self.backends.get(&store) {
                map.entry(&store.as_str(), &backend.name());
            }
        }
        map.finish()
    }
}
