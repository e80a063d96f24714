//! Infrastructure errors
//!
//! Raised while wiring backends, the breaker and logging. Runtime cache
//! failures are `cacheward_core::CacheError`, not this type.

use cacheward_common::resilience::ConfigError;
use cacheward_core::{error_chain, BackendError};
use cacheward_domain::{CacheStore, CachewardError};
use thiserror::Error;

pub type InfraResult<T> = Result<T, InfraError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Config(#[from] CachewardError),

    #[error("invalid circuit breaker settings")]
    Breaker(#[from] ConfigError),

    #[error("failed to open {kind} backend for store '{store}'")]
    Backend {
        store: CacheStore,
        kind: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("store '{store}' uses the {kind} backend, which this build does not include")]
    BackendUnavailable { store: CacheStore, kind: &'static str },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl From<InfraError> for CachewardError {
    fn from(err: InfraError) -> Self {
        let detail = error_chain(&err);
        match err {
            InfraError::Config(inner) => inner,
            InfraError::Breaker(_) | InfraError::BackendUnavailable { .. } => {
                CachewardError::Config(detail)
            }
            InfraError::Backend { .. } | InfraError::Logging(_) => CachewardError::Internal(detail),
        }
    }
}
