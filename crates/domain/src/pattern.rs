//! Access patterns: immutable descriptors of a cache entry

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PATTERN_VERSION;
use crate::errors::KeyArgsError;
use crate::key::KeyTemplate;
use crate::params::Params;
use crate::store::CacheStore;

/// Byte encoding used for a pattern's values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Human-inspectable JSON, for sessions and configuration shared with
    /// other services
    #[default]
    Json,
    /// Lossless compact binary inside a versioned envelope, for domain
    /// objects and row sets
    Binary,
}

crate::impl_name_conversions!(Encoding {
    Json => "json",
    Binary => "binary",
});

/// How one kind of cache entry is keyed, stored, encoded and expired
///
/// `T` is the value type stored under the pattern. Patterns are built once
/// (usually as statics) and shared by every call site.
///
/// ```rust
/// use cacheward_domain::constants::ttl;
/// use cacheward_domain::{params, AccessPattern, CacheStore, KeyTemplate};
///
/// let pattern: AccessPattern<String> = AccessPattern::new(
///     "phone_session",
///     CacheStore::PhoneSession,
///     ttl::THIRTY_MINUTES,
///     KeyTemplate::template("session:{phone}"),
/// );
///
/// assert_eq!(pattern.key(&params! { "phone" => "+15550001" }).unwrap(), "session:+15550001");
/// assert_eq!(pattern.version(), 1);
/// ```
pub struct AccessPattern<T> {
    name: &'static str,
    store: CacheStore,
    ttl: Duration,
    key: KeyTemplate,
    version: u32,
    encoding: Encoding,
    _value: PhantomData<fn() -> T>,
}

impl<T> AccessPattern<T> {
    /// Create a JSON pattern at version 1
    pub fn new(name: &'static str, store: CacheStore, ttl: Duration, key: KeyTemplate) -> Self {
        Self {
            name,
            store,
            ttl,
            key,
            version: DEFAULT_PATTERN_VERSION,
            encoding: Encoding::Json,
            _value: PhantomData,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Symbolic name used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn store(&self) -> CacheStore {
        self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn key_template(&self) -> &KeyTemplate {
        &self.key
    }

    /// Render the concrete key for `args`
    pub fn key(&self, args: &Params) -> Result<String, KeyArgsError> {
        self.key.render(args)
    }
}

impl<T> Clone for AccessPattern<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            store: self.store,
            ttl: self.ttl,
            key: self.key.clone(),
            version: self.version,
            encoding: self.encoding,
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AccessPattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPattern")
            .field("name", &self.name)
            .field("store", &self.store)
            .field("ttl", &self.ttl)
            .field("key", &self.key)
            .field("version", &self.version)
            .field("encoding", &self.encoding)
            .finish()
    }
}
