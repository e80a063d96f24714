//! # Cacheward Infrastructure
//!
//! Infrastructure implementations of the core cache ports.
//!
//! This crate contains:
//! - Cache backends (Moka in-process, Redis behind the `redis` feature)
//! - Configuration loading from the environment and TOML/JSON files
//! - Structured logging setup
//! - The [`CacheLayer`] composition root
//!
//! ## Architecture
//! - Implements traits defined in `cacheward-core`
//! - Contains all "impure" code (network, files, global subscriber)

pub mod backends;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use backends::MemoryBackend;
#[cfg(feature = "redis")]
pub use backends::RedisBackend;
pub use bootstrap::CacheLayer;
pub use errors::{InfraError, InfraResult};
pub use observability::init_logging;
