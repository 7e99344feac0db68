//! Tracing setup for the daemon and CLI.
//!
//! Console output always; an optional rolling file appender when the config
//! names a log file. `RUST_LOG` overrides the configured level per module,
//! and the `-v`/`-vv`/`--quiet` flags override everything.

use std::fs;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// Keeps the file appender's worker alive. Dropping it flushes and stops
/// file logging, so the caller holds it for the program's lifetime.
pub struct LogGuard {
    _file_worker: Option<WorkerGuard>,
}

/// Install the global subscriber for the daemon.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuard> {
    let level = resolve_level(&settings.level, verbose, quiet);
    let filter = base_filter(level);

    let console = console_layer(settings.json_format);

    let (file, file_worker) = match settings.file.as_deref() {
        Some(path) => {
            let (layer, worker) = file_layer(path, settings)?;
            (Some(layer), Some(worker))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    tracing::debug!(level = %level, file = ?settings.file, "Logging ready");

    Ok(LogGuard {
        _file_worker: file_worker,
    })
}

/// Minimal console-only setup for short-lived CLI commands.
pub fn init_simple(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt::layer().compact())
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// CLI flags beat the configured level: `--quiet` clamps to errors, each
/// `-v` steps the floor down.
fn resolve_level(configured: &str, verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => level_from_str(configured),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn level_from_str(s: &str) -> Level {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter: `RUST_LOG` when set, the resolved level otherwise. Our own crate
/// always logs at the resolved level and the WebSocket stack is kept quiet.
fn base_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));

    for directive in [
        format!("persona_switchboard={}", level),
        "tokio_tungstenite=warn".to_string(),
        "tungstenite=warn".to_string(),
    ] {
        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    filter
}

fn console_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if json {
        Box::new(fmt::layer().json().with_target(true))
    } else {
        Box::new(fmt::layer().compact().with_target(true).with_ansi(true))
    }
}

/// Non-blocking rolling file appender. Rotation is daily; tiny size limits
/// switch to hourly so short retention windows still rotate.
fn file_layer<S>(
    path: &str,
    settings: &LoggingSettings,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let path = Path::new(path);
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!("Failed to create log directory '{}': {}", dir.display(), e))
    })?;

    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("switchboard");

    let rotation = if settings.max_file_size_mb > 0 && settings.max_file_size_mb < 10 {
        Rotation::HOURLY
    } else {
        Rotation::DAILY
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(settings.max_files as usize)
        .build(dir)
        .map_err(|e| Error::Config(format!("Failed to open log file: {}", e)))?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let layer: Box<dyn Layer<S> + Send + Sync> = if settings.json_format {
        Box::new(fmt::layer().json().with_writer(writer).with_ansi(false))
    } else {
        Box::new(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false),
        )
    };
    Ok((layer, worker))
}
