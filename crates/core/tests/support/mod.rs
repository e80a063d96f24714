//! Shared fixtures for `cacheward-core` integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use cacheward_common::resilience::{BreakerConfig, CacheCircuitBreaker, MockClock};
use cacheward_core::testing::ScriptedBackend;
use cacheward_core::StoreRegistry;
use cacheward_domain::CacheStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::subscriber::DefaultGuard;
use tracing::Level;

pub const RETRY_TIMEOUT: Duration = Duration::from_secs(30);

/// One backend serving every store, plus a breaker on a controllable clock.
pub struct Fixture {
    pub backend: ScriptedBackend,
    pub registry: Arc<StoreRegistry>,
    pub breaker: Arc<CacheCircuitBreaker<MockClock>>,
    pub clock: MockClock,
}

impl Fixture {
    pub fn new(failure_threshold: u64) -> Self {
        let backend = ScriptedBackend::new();
        let registry = StoreRegistry::builder()
            .register_all(CacheStore::ALL, Arc::new(backend.clone()))
            .build();
        let clock = MockClock::new();
        let breaker = BreakerConfig::new()
            .failure_threshold(failure_threshold)
            .retry_timeout(RETRY_TIMEOUT)
            .clock(clock.clone())
            .build()
            .expect("breaker config should be valid");

        Self { backend, registry: Arc::new(registry), breaker: Arc::new(breaker), clock }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub name: String,
    pub city: String,
    pub beds: u32,
}

pub fn shelters() -> Vec<Shelter> {
    vec![
        Shelter { name: "Union Gospel".into(), city: "vancouver".into(), beds: 12 },
        Shelter { name: "Covenant House".into(), city: "vancouver".into(), beds: 4 },
    ]
}

/// Log output captured on the current thread while the guard is held
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(max_level: Level) -> (Self, DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(max_level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock()).lines().map(str::to_owned).collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
