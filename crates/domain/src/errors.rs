//! Error types used throughout the domain layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Cacheward configuration and domain values
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CachewardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Cacheward domain operations
pub type Result<T> = std::result::Result<T, CachewardError>;

/// Failure to render a cache key from call-site arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyArgsError {
    /// A required argument was not supplied
    #[error("missing key argument '{name}'")]
    Missing { name: String },

    /// An argument was supplied with the wrong type
    #[error("key argument '{name}' should be {expected}, got {found}")]
    Mistyped { name: String, expected: &'static str, found: &'static str },

    /// An argument was supplied that the key does not use
    #[error("unexpected key argument '{name}'")]
    Unexpected { name: String },

    /// An argument has the right type but an unusable value
    #[error("invalid key argument '{name}': {reason}")]
    Invalid { name: String, reason: String },

    /// The rendered key was empty
    #[error("rendered cache key is empty")]
    EmptyKey,
}
