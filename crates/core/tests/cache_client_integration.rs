//! Integration tests for the cache-only client
//!
//! Drives `CacheClient` through an outage and recovery with a scripted
//! backend and a mock clock.

mod support;

use cacheward_common::resilience::CircuitState;
use cacheward_core::{CacheClient, CacheError};
use cacheward_domain::constants::ttl;
use cacheward_domain::{params, AccessPattern, CacheStore, Encoding, KeyTemplate};
use once_cell::sync::Lazy;
use support::{shelters, Fixture, LogCapture, Shelter, RETRY_TIMEOUT};
use tracing::Level;

static SHELTERS_BY_CITY: Lazy<AccessPattern<Vec<Shelter>>> = Lazy::new(|| {
    AccessPattern::new(
        "shelters_by_city",
        CacheStore::Resources,
        ttl::HOUR,
        KeyTemplate::template("shelters:{city}"),
    )
});

static GATE_FLAG: Lazy<AccessPattern<bool>> = Lazy::new(|| {
    AccessPattern::new("gate_flag", CacheStore::Gate, ttl::MINUTE, KeyTemplate::fixed("gate:open"))
        .with_encoding(Encoding::Binary)
});

/// Validates the full outage cycle from the caller's point of view.
///
/// Assertions:
/// - Confirms reads degrade to `None` while the backend is down.
/// - Confirms the circuit opens at the threshold and stops backend traffic.
/// - Confirms a successful probe after the retry window closes the circuit.
#[tokio::test]
async fn test_outage_and_recovery() {
    let fx = Fixture::new(3);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());
    let args = params! { "city" => "vancouver" };

    client.set(&shelters(), &SHELTERS_BY_CITY, &args).await.unwrap();
    fx.backend.fail_reads(true);

    for _ in 0..3 {
        assert_eq!(client.get(&SHELTERS_BY_CITY, &args).await.unwrap(), None);
    }
    assert_eq!(fx.breaker.state(), CircuitState::Open);

    let calls_when_opened = fx.backend.get_calls();
    assert_eq!(client.get(&SHELTERS_BY_CITY, &args).await.unwrap(), None);
    assert_eq!(fx.backend.get_calls(), calls_when_opened);

    fx.backend.fail_reads(false);
    fx.clock.advance(RETRY_TIMEOUT);
    assert_eq!(fx.breaker.state(), CircuitState::HalfOpen);

    assert_eq!(client.get(&SHELTERS_BY_CITY, &args).await.unwrap(), Some(shelters()));
    assert_eq!(fx.breaker.state(), CircuitState::Closed);
}

/// Validates that a failed probe restarts the retry window.
#[tokio::test]
async fn test_failed_probe_reopens() {
    let fx = Fixture::new(1);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());
    fx.backend.fail_reads(true);

    client.get(&GATE_FLAG, &params!()).await.unwrap();
    fx.clock.advance(RETRY_TIMEOUT);
    client.get(&GATE_FLAG, &params!()).await.unwrap();
    assert_eq!(fx.backend.get_calls(), 2);

    fx.clock.advance(RETRY_TIMEOUT / 2);
    client.get(&GATE_FLAG, &params!()).await.unwrap();
    assert_eq!(fx.backend.get_calls(), 2);
    assert!(fx.breaker.is_open());
}

#[tokio::test]
async fn test_binary_and_json_patterns_share_a_backend() {
    let fx = Fixture::new(3);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());

    client.set(&true, &GATE_FLAG, &params!()).await.unwrap();
    client.set(&shelters(), &SHELTERS_BY_CITY, &params! { "city" => "surrey" }).await.unwrap();

    assert_eq!(client.get(&GATE_FLAG, &params!()).await.unwrap(), Some(true));
    assert_eq!(&fx.backend.stored(CacheStore::Gate, "gate:open", 1).unwrap()[..2], b"CW");
    let json = fx.backend.stored(CacheStore::Resources, "shelters:surrey", 1).unwrap();
    assert_eq!(json[0], b'[');
}

/// Validates that stores sharing a backend keep separate entries.
///
/// Assertions:
/// - Confirms a value written to one store is invisible to another store
///   using the same key template.
/// - Confirms invalidating one store leaves the other entry in place.
#[tokio::test]
async fn test_stores_on_one_backend_do_not_collide() {
    let fx = Fixture::new(3);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());
    let by_user = |name: &'static str, store: CacheStore| {
        AccessPattern::<String>::new(name, store, ttl::MINUTE, KeyTemplate::template("user:{id}"))
    };
    let session = by_user("session_user", CacheStore::Session);
    let geo = by_user("geo_user", CacheStore::Geo);
    let args = params! { "id" => 42 };

    client.set(&"session-data".to_string(), &session, &args).await.unwrap();
    assert_eq!(client.get(&geo, &args).await.unwrap(), None);

    client.set(&"geo-data".to_string(), &geo, &args).await.unwrap();
    client.invalidate(&session, &args).await.unwrap();

    assert_eq!(client.get(&session, &args).await.unwrap(), None);
    assert_eq!(client.get(&geo, &args).await.unwrap(), Some("geo-data".to_string()));
    assert_eq!(fx.backend.len(), 1);
}

#[tokio::test]
async fn test_unexpected_argument_is_rejected() {
    let fx = Fixture::new(3);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());

    let err = client
        .get(&SHELTERS_BY_CITY, &params! { "city" => "vancouver", "page" => 2 })
        .await
        .unwrap_err();

    assert!(matches!(err, CacheError::InvalidKeyArgs { pattern: "shelters_by_city", .. }));
    assert_eq!(fx.breaker.metrics().total_failures, 0);
}

/// Validates that an outage does not flood the logs.
///
/// Assertions:
/// - Confirms reads rejected by the open circuit log nothing at warn or above.
/// - Confirms the breaker still counts every rejection.
#[tokio::test]
async fn test_rejected_reads_stay_below_warn() {
    let fx = Fixture::new(3);
    let client = CacheClient::new(fx.registry.clone(), fx.breaker.clone());
    let args = params! { "city" => "vancouver" };
    fx.breaker.force_open();

    let (logs, _guard) = LogCapture::install(Level::WARN);
    for _ in 0..50 {
        assert_eq!(client.get(&SHELTERS_BY_CITY, &args).await.unwrap(), None);
    }

    assert!(logs.lines().is_empty(), "unexpected logs: {:?}", logs.lines());
    assert_eq!(fx.breaker.metrics().rejected_requests, 50);
    assert_eq!(fx.backend.get_calls(), 0);
}
