//! Domain constants
//!
//! Centralized location for defaults shared by configuration, access
//! patterns and adapters.

use std::time::Duration;

// Access pattern defaults
pub const DEFAULT_PATTERN_VERSION: u32 = 1;

// Circuit breaker defaults
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 3;
pub const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 30;

// Backend defaults
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;
pub const DEFAULT_KEY_PREFIX: &str = "cacheward";

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Standard cache entry lifetimes
pub mod ttl {
    use super::Duration;

    const MINUTE_SECS: u64 = 60;
    const HOUR_SECS: u64 = 60 * MINUTE_SECS;
    const DAY_SECS: u64 = 24 * HOUR_SECS;

    pub const HALF_MINUTE: Duration = Duration::from_secs(30);
    pub const MINUTE: Duration = Duration::from_secs(MINUTE_SECS);
    pub const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * MINUTE_SECS);
    pub const THIRTY_MINUTES: Duration = Duration::from_secs(30 * MINUTE_SECS);
    pub const HOUR: Duration = Duration::from_secs(HOUR_SECS);
    pub const TWO_HOURS: Duration = Duration::from_secs(2 * HOUR_SECS);
    pub const FOUR_HOURS: Duration = Duration::from_secs(4 * HOUR_SECS);
    pub const SIX_HOURS: Duration = Duration::from_secs(6 * HOUR_SECS);
    pub const EIGHT_HOURS: Duration = Duration::from_secs(8 * HOUR_SECS);
    pub const TWELVE_HOURS: Duration = Duration::from_secs(12 * HOUR_SECS);
    pub const DAY: Duration = Duration::from_secs(DAY_SECS);
    pub const THREE_DAYS: Duration = Duration::from_secs(3 * DAY_SECS);
    pub const WEEK: Duration = Duration::from_secs(7 * DAY_SECS);
    pub const THIRTY_DAYS: Duration = Duration::from_secs(30 * DAY_SECS);
    pub const NINETY_DAYS: Duration = Duration::from_secs(90 * DAY_SECS);
}
