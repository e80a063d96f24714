//! Logical cache partitions

use serde::{Deserialize, Serialize};

/// Named partition of the cache
///
/// Each store resolves to a backend at the composition root, so sessions can
/// live on a different server (or database) than bulk resource data. Stores
/// that share a backend still address separate entries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CacheStore {
    #[default]
    Default,
    Session,
    PhoneSession,
    Resources,
    Tasks,
    Geo,
    Tests,
    Gate,
}

crate::impl_name_conversions!(CacheStore {
    Default => "default",
    Session => "session",
    PhoneSession => "phone_session",
    Resources => "resources",
    Tasks => "tasks",
    Geo => "geo",
    Tests => "tests",
    Gate => "gate",
});
