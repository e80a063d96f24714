//! Cache client errors
//!
//! Every variant keeps its cause reachable through
//! [`std::error::Error::source`] and names the access pattern involved.

use std::fmt;

use cacheward_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use cacheward_domain::{CacheStore, Encoding, KeyArgsError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cache_ports::BackendError;
use crate::codec::CodecError;
use crate::source_ports::SourceError;

/// Result type for cache client operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Backend operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Get,
    Set,
    Delete,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Set => write!(f, "set"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store '{store}' is not registered")]
    UnknownStore { store: CacheStore },

    #[error("invalid key arguments for '{pattern}'")]
    InvalidKeyArgs {
        pattern: &'static str,
        #[source]
        source: KeyArgsError,
    },

    #[error("failed to encode value for '{pattern}' as {encoding}")]
    Encode {
        pattern: &'static str,
        encoding: Encoding,
        #[source]
        source: CodecError,
    },

    #[error("failed to decode cached value for '{pattern}' as {encoding}")]
    Decode {
        pattern: &'static str,
        encoding: Encoding,
        #[source]
        source: CodecError,
    },

    #[error("cache {operation} failed for '{pattern}' on store '{store}'")]
    CacheOperation {
        pattern: &'static str,
        store: CacheStore,
        operation: CacheOp,
        #[source]
        source: BackendError,
    },

    #[error("source query failed for '{pattern}'")]
    SourceQuery {
        pattern: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("read-through for '{pattern}' wrote key '{key}' but could not read it back")]
    ReadThroughFailed { pattern: &'static str, key: String },
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::CacheOperation { .. } | Self::SourceQuery { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CacheOperation { .. } => ErrorSeverity::Warning,
            Self::Decode { .. } | Self::ReadThroughFailed { .. } => ErrorSeverity::Critical,
            Self::UnknownStore { .. }
            | Self::InvalidKeyArgs { .. }
            | Self::Encode { .. }
            | Self::SourceQuery { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::ReadThroughFailed { .. })
    }
}

impl From<&CacheError> for CommonError {
    fn from(err: &CacheError) -> Self {
        let detail = error_chain(err);
        match err {
            CacheError::UnknownStore { store } => {
                CommonError::not_found_with_id("Cache store", store.as_str())
            }
            CacheError::InvalidKeyArgs { pattern, source } => {
                CommonError::validation(*pattern, source.to_string())
            }
            CacheError::Encode { encoding, .. } | CacheError::Decode { encoding, .. } => {
                CommonError::serialization_format(encoding.as_str(), detail)
            }
            CacheError::CacheOperation { store, .. } => {
                CommonError::backend(format!("cache:{store}"), detail, true)
            }
            CacheError::SourceQuery { pattern, .. } => {
                CommonError::backend(format!("source:{pattern}"), detail, true)
            }
            CacheError::ReadThroughFailed { .. } => {
                CommonError::internal_with_context(detail, "read_through")
            }
        }
    }
}

impl From<CacheError> for CommonError {
    fn from(err: CacheError) -> Self {
        Self::from(&err)
    }
}

/// Log a handled cache failure at the level its severity calls for
///
/// Used where the clients absorb a failure instead of returning it.
pub(crate) fn log_cache_error(err: &CacheError, message: &str) {
    let error_type = CommonError::from(err).error_type_name();
    let retryable = err.is_retryable();
    let critical = err.is_critical();
    let detail = error_chain(err);
    match err.severity() {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            error!(error_type, retryable, critical, error = %detail, "{message}");
        }
        ErrorSeverity::Warning => warn!(error_type, retryable, error = %detail, "{message}"),
        ErrorSeverity::Info => info!(error_type, error = %detail, "{message}"),
    }
}

/// Render an error and its causes as `outer: inner: root`
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}
