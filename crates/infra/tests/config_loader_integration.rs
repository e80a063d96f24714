//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use cacheward_domain::{BackendSettings, CacheStore};
use cacheward_infra::config;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "breaker": {
            "failure_threshold": 2,
            "retry_timeout_secs": 15
        },
        "stores": [
            { "store": "phone_session", "backend": { "kind": "redis", "url": "redis://cache:6379/0" } },
            { "store": "resources", "backend": { "kind": "memory", "max_capacity": 500 } }
        ],
        "logging": {
            "level": "cacheward=debug,info",
            "json": true
        }
    }"#;

    let path = write_config(json_content, "json");
    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_ok(), "Failed to load config from JSON file: {:?}", result.err());

    let config = result.unwrap();

    assert_eq!(config.breaker.failure_threshold, 2);
    assert_eq!(config.breaker.retry_timeout_secs, 15);

    assert_eq!(
        config.store(CacheStore::PhoneSession),
        Some(&BackendSettings::Redis {
            url: "redis://cache:6379/0".to_string(),
            key_prefix: "cacheward".to_string(),
        })
    );
    assert_eq!(
        config.store(CacheStore::Resources),
        Some(&BackendSettings::Memory { max_capacity: 500 })
    );

    assert_eq!(config.logging.level, "cacheward=debug,info");
    assert!(config.logging.json);
    assert_eq!(config.logging.file, None);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[breaker]
retry_timeout_secs = 60

[[stores]]
store = "tasks"
backend = { kind = "redis", url = "redis://cache:6379/3", key_prefix = "hotline" }

[logging]
file = "logs/cacheward.log"
"#;

    let path = write_config(toml_content, "toml");
    let config = config::load_from_file(Some(path.clone())).expect("TOML config should load");

    assert_eq!(config.breaker.failure_threshold, 3);
    assert_eq!(config.breaker.retry_timeout_secs, 60);
    assert_eq!(config.stores.len(), 1);
    assert_eq!(config.store(CacheStore::Tasks).map(BackendSettings::kind), Some("redis"));
    assert_eq!(config.logging.file.as_deref(), Some(std::path::Path::new("logs/cacheward.log")));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_duplicate_store_is_rejected() {
    let toml_content = r#"
[[stores]]
store = "geo"
backend = { kind = "memory" }

[[stores]]
store = "geo"
backend = { kind = "memory", max_capacity = 10 }
"#;

    let path = write_config(toml_content, "toml");
    let result = config::load_from_file(Some(path.clone()));

    assert!(result.is_err(), "Duplicate store entries should fail validation");
    std::fs::remove_file(path).ok();
}

#[test]
fn test_unknown_backend_kind_is_rejected() {
    let toml_content = r#"
[[stores]]
store = "geo"
backend = { kind = "memcached" }
"#;

    let path = write_config(toml_content, "toml");
    assert!(config::load_from_file(Some(path.clone())).is_err());
    std::fs::remove_file(path).ok();
}
