//! Configuration loader
//!
//! Loads the cache layer configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory is loaded when present
//! 2. Attempts to load from environment variables
//! 3. If none are set, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `CACHEWARD_BREAKER_FAILURE_THRESHOLD`: Failures before the circuit opens
//! - `CACHEWARD_BREAKER_RETRY_TIMEOUT_SECS`: Seconds before a probe is allowed
//! - `CACHEWARD_REDIS_URL`: Serve every store from this Redis server
//! - `CACHEWARD_KEY_PREFIX`: Redis key prefix (default `cacheward`)
//! - `CACHEWARD_MEMORY_CAPACITY`: Entry bound for the memory backend
//! - `CACHEWARD_LOG_LEVEL`: Log filter when `RUST_LOG` is unset
//! - `CACHEWARD_LOG_JSON`: Emit JSON logs (true/false)
//! - `CACHEWARD_LOG_FILE`: Also write warnings and errors to this file
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./cacheward.toml` or `./cacheward.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use cacheward_domain::constants::{DEFAULT_KEY_PREFIX, DEFAULT_MEMORY_CAPACITY};
use cacheward_domain::{CacheLayerConfig, CacheStore, CachewardError, Result, StoreSettings};

const ENV_PREFIX: &str = "CACHEWARD_";
const CONFIG_FILE_NAMES: [&str; 4] =
    ["cacheward.toml", "cacheward.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// Uses the environment when any `CACHEWARD_*` variable is set, otherwise a
/// config file.
///
/// # Errors
/// Returns `CachewardError::Config` if:
/// - An environment variable has an invalid value
/// - No config file is found or its format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<CacheLayerConfig> {
    if dotenvy::dotenv().is_ok() {
        tracing::debug!("Loaded .env file");
    }

    if has_env_overrides() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("No CACHEWARD_* variables set, trying file");
    load_from_file(None)
}

/// Load configuration from environment variables
///
/// Unset variables keep their defaults. Without `CACHEWARD_REDIS_URL` every
/// store uses the memory backend.
///
/// # Errors
/// Returns `CachewardError::Config` for unparsable values or a configuration
/// that fails validation.
pub fn load_from_env() -> Result<CacheLayerConfig> {
    let mut config = CacheLayerConfig::default();

    if let Some(threshold) = env_parse::<u64>("CACHEWARD_BREAKER_FAILURE_THRESHOLD")? {
        config.breaker.failure_threshold = threshold;
    }
    if let Some(timeout) = env_parse::<u64>("CACHEWARD_BREAKER_RETRY_TIMEOUT_SECS")? {
        config.breaker.retry_timeout_secs = timeout;
    }

    let capacity = env_parse::<u64>("CACHEWARD_MEMORY_CAPACITY")?;
    config.stores = match env_string("CACHEWARD_REDIS_URL") {
        Some(url) => {
            let prefix = env_string("CACHEWARD_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
            CacheStore::ALL
                .iter()
                .map(|store| StoreSettings::redis(*store, url.clone(), prefix.clone()))
                .collect()
        }
        None => {
            let capacity = capacity.unwrap_or(DEFAULT_MEMORY_CAPACITY);
            CacheStore::ALL
                .iter()
                .map(|store| StoreSettings::memory_with_capacity(*store, capacity))
                .collect()
        }
    };

    if let Some(level) = env_string("CACHEWARD_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("CACHEWARD_LOG_JSON", config.logging.json);
    if let Some(file) = env_string("CACHEWARD_LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is
/// detected by file extension.
///
/// # Errors
/// Returns `CachewardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<CacheLayerConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CachewardError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CachewardError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CachewardError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<CacheLayerConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CachewardError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CachewardError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CachewardError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// Searches the current working directory, then the executable's directory.
/// Returns the first file that exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn has_env_overrides() -> bool {
    std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CachewardError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
