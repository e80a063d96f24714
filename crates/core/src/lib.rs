//! # Cacheward Core
//!
//! Cache client logic - no concrete backends.
//!
//! This crate contains:
//! - Port interfaces for cache backends and data sources (traits)
//! - The entry codec (JSON and enveloped binary)
//! - Store resolution and key rendering
//! - [`CacheClient`] and [`ReadThroughCacheClient`]
//!
//! ## Architecture Principles
//! - Only depends on `cacheward-common` and `cacheward-domain`
//! - No Redis, no in-process cache, no logging setup
//! - All external dependencies via traits

pub mod cache_ports;
pub mod client;
pub mod codec;
pub mod error;
pub mod read_through;
pub mod source_ports;
pub mod store;
pub mod testing;

pub use cache_ports::{BackendError, BoxedError, CacheBackend};
pub use client::CacheClient;
pub use error::{error_chain, CacheError, CacheOp, CacheResult};
pub use read_through::{ReadThroughCacheClient, ReadThroughPattern};
pub use source_ports::{source_fn, DataSource, FnSource, QueryRows, SourceError};
pub use store::{CacheSlot, StoreRegistry, StoreRegistryBuilder};
