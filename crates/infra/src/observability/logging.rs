//! Structured logging setup
//!
//! Console output through `tracing-subscriber` (text or JSON lines) and an
//! optional non-blocking file that receives warnings and errors only.
//! `RUST_LOG` wins over the configured level.

use std::path::Path;

use cacheward_domain::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::errors::{InfraError, InfraResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `settings`
///
/// Returns the file writer's guard when a log file is configured; keep it
/// alive for as long as logs should be flushed. If a global subscriber is
/// already installed it is left in place.
///
/// # Errors
/// Returns `InfraError::Logging` for an invalid level directive or an
/// unusable log file path.
pub fn init_logging(settings: &LoggingSettings) -> InfraResult<Option<WorkerGuard>> {
    let filter = build_filter(&settings.level)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = fmt::layer().with_target(true).with_level(true);
    if settings.json {
        layers.push(console.json().with_filter(filter).boxed());
    } else {
        layers.push(console.with_filter(filter).boxed());
    }

    let guard = match &settings.file {
        Some(path) => {
            let (layer, guard) = file_layer(path)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized - keeping it");
    } else {
        tracing::info!(
            level = %settings.level,
            json = settings.json,
            log_file = ?settings.file,
            "Logging initialized"
        );
    }

    Ok(guard)
}

fn build_filter(level: &str) -> InfraResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| InfraError::Logging(format!("invalid log level '{level}': {e}"))),
    }
}

fn file_layer(path: &Path) -> InfraResult<(BoxedLayer, WorkerGuard)> {
    let file_name = path.file_name().ok_or_else(|| {
        InfraError::Logging(format!("log file path has no file name: {}", path.display()))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| InfraError::Logging(format!("cannot create {}: {e}", dir.display())))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .json()
        .with_filter(LevelFilter::WARN)
        .boxed();

    Ok((layer, guard))
}
