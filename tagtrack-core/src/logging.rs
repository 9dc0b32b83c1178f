//! Log output for the tracker
//!
//! The library only emits `tracing` events. Binaries decide where they go:
//! [`init`] sends them to a daily rolling file in the state directory
//! (`$XDG_STATE_HOME/tagtrack/tagtrack.log.<date>`), keeping the newest
//! `[logging] max_files` files.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Prefix of every log file; rotation appends the date
pub const LOG_FILE_PREFIX: &str = "tagtrack.log";

/// Level used when the configured one cannot be parsed
const FALLBACK_LEVEL: &str = "info";

/// Keeps the background log writer running. Drop it last.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Route tracker logs to the state directory.
///
/// `RUST_LOG` overrides `[logging] level`. Fails if a global subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    init_in(config, &Config::log_dir())
}

/// Same as [`init`] with an explicit log directory
pub fn init_in(config: &LoggingConfig, dir: &Path) -> Result<LoggingGuard> {
    let appender = file_appender(config, dir)?;
    // Dispatch and lifecycle calls run under locks; never block them on disk
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(level_filter(&config.level))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("cannot install log subscriber: {}", e)))?;

    tracing::info!(
        dir = %dir.display(),
        level = %config.level,
        retained = retained_files(config),
        "Tracker logging enabled"
    );
    Ok(LoggingGuard { _worker: worker })
}

/// Daily rolling appender in `dir`, pruned to [`retained_files`]
pub fn file_appender(config: &LoggingConfig, dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(retained_files(config))
        .build(dir)
        .map_err(|e| Error::Config(format!("cannot open log file in {}: {}", dir.display(), e)))
}

/// Number of dated files kept on disk. Zero would disable pruning, so keep
/// at least today's file.
pub fn retained_files(config: &LoggingConfig) -> usize {
    config.max_files.max(1)
}

fn level_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Show tracker logs in test output when `RUST_LOG` is set
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
