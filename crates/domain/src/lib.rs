//! # Cacheward Domain
//!
//! Pure data types for the cache access layer.
//!
//! This crate contains:
//! - Logical cache stores and TTL constants
//! - Call-site parameters and key templates
//! - Access patterns (how an entry is keyed, stored and encoded)
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other Cacheward crates
//! - No I/O: everything here is a value

pub mod config;
pub mod constants;
pub mod errors;
pub mod key;
pub mod macros;
pub mod params;
pub mod pattern;
pub mod store;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use key::KeyTemplate;
pub use params::{ParamValue, Params};
pub use pattern::{AccessPattern, Encoding};
pub use store::CacheStore;
