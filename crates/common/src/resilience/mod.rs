//! Resilience primitives for the cache access layer
//!
//! This module provides the pieces every cache client shares:
//! - **Clock abstraction**: [`Clock`], [`SystemClock`] for production and
//!   [`MockClock`] for deterministic tests of timeout behavior
//! - **Cache circuit breaker**: [`CacheCircuitBreaker`], a process-wide gate
//!   tracking cache health that short-circuits cache calls while the cache is
//!   failing and lets a single probe through once the retry window elapses
//!
//! The breaker is constructed once at the composition root and shared by
//! `Arc` among all clients. It never performs I/O itself: clients ask
//! [`CacheCircuitBreaker::allow_request`] before touching the cache and report
//! the outcome with [`CacheCircuitBreaker::record_success`] or
//! [`CacheCircuitBreaker::record_failure`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cacheward_common::resilience::{BreakerConfig, CacheCircuitBreaker, MockClock};
//!
//! let clock = MockClock::new();
//! let breaker = Arc::new(
//!     BreakerConfig::new()
//!         .failure_threshold(2)
//!         .retry_timeout(Duration::from_secs(30))
//!         .clock(clock.clone())
//!         .build()
//!         .unwrap(),
//! );
//!
//! breaker.record_failure();
//! breaker.record_failure();
//! assert!(!breaker.allow_request());
//!
//! clock.advance(Duration::from_secs(30));
//! assert!(breaker.allow_request()); // the probe
//! assert!(!breaker.allow_request()); // only one at a time
//! ```

pub mod circuit_breaker;

// Re-export circuit breaker types
pub use circuit_breaker::{
    BreakerBuilderWithClock, BreakerConfig, BreakerConfigBuilder, BreakerMetrics,
    CacheCircuitBreaker, CircuitState, Clock, ConfigError, ConfigResult, MockClock, SystemClock,
};
