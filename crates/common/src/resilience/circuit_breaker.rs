//! Process-wide circuit breaker guarding the cache tier
//!
//! Two stored states exist: closed and open. A third, half-open, is only
//! reported: it is what an open circuit looks like once the retry window has
//! elapsed and the next caller may probe the cache. Granting the probe does
//! not change the stored state; the probe's outcome does.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Consecutive failures that open the circuit unless configured otherwise
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 3;

/// Cooldown before a probe is allowed through an open circuit
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(30);

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// The breaker uses real monotonic time in production and a controlled
/// [`MockClock`] in tests, so retry windows can be crossed without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a test can keep one handle and
/// give another to the breaker.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, cache calls go through
    Closed,
    /// Circuit is open, cache calls are short-circuited
    Open,
    /// Circuit is open but the retry window has elapsed; a probe may pass
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u64,
    /// Time after the last failure before a probe is allowed
    pub retry_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: DEFAULT_FAILURE_THRESHOLD, retry_timeout: DEFAULT_RETRY_TIMEOUT }
    }
}

impl BreakerConfig {
    /// Create a new configuration with validation
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }

    /// Create a configuration builder (alias for `new()`)
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.retry_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "retry_timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for BreakerConfig
#[derive(Debug)]
pub struct BreakerConfigBuilder {
    config: BreakerConfig,
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: BreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.retry_timeout = timeout;
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> BreakerBuilderWithClock<C> {
        BreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<BreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a breaker directly
#[derive(Debug)]
pub struct BreakerBuilderWithClock<C: Clock> {
    config: BreakerConfig,
    clock: C,
}

impl<C: Clock> BreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.retry_timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CacheCircuitBreaker<C>> {
        CacheCircuitBreaker::with_clock(self.config, self.clock)
    }
}

//==============================================================================
// Breaker
//==============================================================================

/// Point-in-time snapshot of the breaker for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u64,
    pub failure_threshold: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub times_opened: u64,
    pub rejected_requests: u64,
    pub last_failure_time: Option<Instant>,
    pub probe_in_flight: bool,
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u64,
    circuit_open: bool,
    last_failure_time: Option<Instant>,
    probe_started: Option<Instant>,
    total_failures: u64,
    total_successes: u64,
    times_opened: u64,
    rejected_requests: u64,
}

impl BreakerState {
    fn retry_window_elapsed(&self, now: Instant, retry_timeout: Duration) -> bool {
        match self.last_failure_time {
            Some(failed_at) => now.saturating_duration_since(failed_at) >= retry_timeout,
            None => true,
        }
    }

    fn probe_in_flight(&self, now: Instant, retry_timeout: Duration) -> bool {
        match self.probe_started {
            Some(started) => now.saturating_duration_since(started) < retry_timeout,
            None => false,
        }
    }

    fn close(&mut self) {
        self.circuit_open = false;
        self.consecutive_failures = 0;
        self.last_failure_time = None;
        self.probe_started = None;
    }
}

/// Circuit breaker tracking the health of the cache tier
///
/// All state lives behind one mutex and every critical section is a handful
/// of field updates, so concurrent `record_failure` / `record_success` calls
/// never lose updates.
pub struct CacheCircuitBreaker<C: Clock = SystemClock> {
    config: BreakerConfig,
    state: Mutex<BreakerState>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CacheCircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CacheCircuitBreaker")
            .field("config", &self.config)
            .field("circuit_open", &state.circuit_open)
            .field("consecutive_failures", &state.consecutive_failures)
            .finish()
    }
}

impl CacheCircuitBreaker<SystemClock> {
    /// Create a new circuit breaker with the given configuration using system
    /// clock
    pub fn new(config: BreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker with the default threshold and retry timeout
    pub fn with_defaults() -> Self {
        Self { config: BreakerConfig::default(), state: Mutex::default(), clock: SystemClock }
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }
}

impl Default for CacheCircuitBreaker<SystemClock> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: Clock> CacheCircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: BreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config, state: Mutex::default(), clock })
    }

    /// Get the configuration
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Decide whether a cache call may proceed
    ///
    /// Always `true` while closed. While open, `true` only once the retry
    /// window since the last failure has elapsed and no other probe is in
    /// flight. A probe claim older than the retry timeout lapses so a caller
    /// that never reports back cannot wedge the breaker.
    pub fn allow_request(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if !state.circuit_open {
            return true;
        }

        if !state.retry_window_elapsed(now, self.config.retry_timeout)
            || state.probe_in_flight(now, self.config.retry_timeout)
        {
            state.rejected_requests += 1;
            return false;
        }

        state.probe_started = Some(now);
        debug!(
            consecutive_failures = state.consecutive_failures,
            "Cache circuit breaker letting a probe through"
        );
        true
    }

    /// Record a successful cache call
    ///
    /// Resets the consecutive failure count and closes an open circuit.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.total_successes += 1;

        if state.circuit_open {
            state.close();
            info!("Cache circuit breaker closed after a successful call");
        } else {
            state.consecutive_failures = 0;
        }
    }

    /// Record a failed cache call
    ///
    /// Opens the circuit once the failure threshold is reached. A failure
    /// while open restarts the retry window.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        state.consecutive_failures += 1;
        state.total_failures += 1;
        state.last_failure_time = Some(now);
        state.probe_started = None;

        if !state.circuit_open && state.consecutive_failures >= self.config.failure_threshold {
            state.circuit_open = true;
            state.times_opened += 1;
            warn!(
                consecutive_failures = state.consecutive_failures,
                failure_threshold = self.config.failure_threshold,
                retry_timeout_secs = self.config.retry_timeout.as_secs(),
                "Cache circuit breaker opened"
            );
        }
    }

    /// Get the current state
    ///
    /// Reports [`CircuitState::HalfOpen`] when the circuit is open and the
    /// retry window has elapsed.
    pub fn state(&self) -> CircuitState {
        let now = self.clock.now();
        let state = self.state.lock();
        Self::observed_state(&state, now, self.config.retry_timeout)
    }

    /// Whether the circuit is open (including the reported half-open state)
    pub fn is_open(&self) -> bool {
        self.state.lock().circuit_open
    }

    /// Get the number of consecutive failures since the last success
    pub fn consecutive_failures(&self) -> u64 {
        self.state.lock().consecutive_failures
    }

    /// Open the circuit immediately, starting a fresh retry window
    pub fn force_open(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if !state.circuit_open {
            state.times_opened += 1;
        }
        state.circuit_open = true;
        state.last_failure_time = Some(now);
        state.probe_started = None;
        warn!("Cache circuit breaker forced open");
    }

    /// Close the circuit and clear failure tracking; lifetime totals are kept
    pub fn reset(&self) {
        self.state.lock().close();
        info!("Cache circuit breaker reset");
    }

    /// Get a metrics snapshot
    pub fn metrics(&self) -> BreakerMetrics {
        let now = self.clock.now();
        let state = self.state.lock();
        BreakerMetrics {
            state: Self::observed_state(&state, now, self.config.retry_timeout),
            consecutive_failures: state.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            total_failures: state.total_failures,
            total_successes: state.total_successes,
            times_opened: state.times_opened,
            rejected_requests: state.rejected_requests,
            last_failure_time: state.last_failure_time,
            probe_in_flight: state.circuit_open
                && state.probe_in_flight(now, self.config.retry_timeout),
        }
    }

    fn observed_state(state: &BreakerState, now: Instant, retry_timeout: Duration) -> CircuitState {
        if !state.circuit_open {
            CircuitState::Closed
        } else if state.retry_window_elapsed(now, retry_timeout) {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }
}
