//! Logging setup.
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber that decides where they go.

use provision_types::config::{LogConfig, LogFormat};
use provision_types::{LogLevel, ProvisionError, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "provision=info";

/// Keeps non-blocking log writers flushing until dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize logging to stderr, filtered by `RUST_LOG`.
pub fn init_default() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    init_with_filter(filter)
}

/// Initialize logging to stderr with an explicit filter.
pub fn init_with_filter(filter: EnvFilter) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| ProvisionError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Initialize logging from configuration, one layer per output.
///
/// Falls back to [`init_default`] when no outputs are configured.
pub fn init_from_config(configs: &[LogConfig]) -> Result<LogGuard> {
    if configs.is_empty() {
        init_default()?;
        return Ok(LogGuard { _guards: Vec::new() });
    }

    let mut guards = Vec::with_capacity(configs.len());
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::with_capacity(configs.len());

    for config in configs {
        let to_stderr = config.path.trim() == "-";
        let (writer, guard) = if to_stderr {
            tracing_appender::non_blocking(std::io::stderr())
        } else {
            let path = expand_log_path(&config.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_appender::non_blocking(file)
        };
        guards.push(guard);

        let level = level_filter(config.level);
        let layer = match config.format {
            LogFormat::Json => fmt::layer().json().with_writer(writer).with_filter(level).boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_ansi(to_stderr)
                .with_writer(writer)
                .with_filter(level)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_ansi(to_stderr)
                .with_writer(writer)
                .with_filter(level)
                .boxed(),
        };
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| ProvisionError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(LogGuard { _guards: guards })
}

/// Map a configured level onto a tracing filter.
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::None => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Expand `~` and `{date}` in a log path template.
pub fn expand_log_path(template: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    crate::util::expand_path(template.replace("{date}", &date))
}
