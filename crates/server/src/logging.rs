//! Tracing subscriber setup.
//!
//! JSON events go to stderr. When a log directory is configured, the same
//! events are also written to a per-run file inside it through a
//! non-blocking appender.

use std::path::{Path, PathBuf};

use anyhow::Context;
use canned_core::AppConfig;
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the log file writer alive.
///
/// Buffered lines are flushed when this is dropped, so hold it until the
/// process exits.
#[must_use = "dropping the guard stops the log file writer"]
pub struct LogGuard {
    path: Option<PathBuf>,
    _worker: Option<WorkerGuard>,
}

impl LogGuard {
    /// Path of the per-run log file, if one was opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured verbosity.
pub fn init(config: &AppConfig) -> anyhow::Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let (path, writer) = match &config.log_directory {
        Some(dir) => {
            let (path, appender) = file_appender(dir, Local::now())?;
            (Some(path), Some(tracing_appender::non_blocking(appender)))
        }
        None => (None, None),
    };
    let (file_layer, worker) = match writer {
        Some((non_blocking, worker)) => (Some(fmt::layer().json().with_writer(non_blocking)), Some(worker)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("initialize logging subscriber")?;

    Ok(LogGuard { path, _worker: worker })
}

fn default_directive(config: &AppConfig) -> &'static str {
    if config.verbose_logging { "debug" } else { "info" }
}

fn log_file_name(now: DateTime<Local>) -> String {
    format!("canned-{}.log", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// A never-rotating appender writing to `dir/canned-<timestamp>.log`.
fn file_appender(dir: &Path, now: DateTime<Local>) -> anyhow::Result<(PathBuf, RollingFileAppender)> {
    std::fs::create_dir_all(dir).with_context(|| format!("create log directory {}", dir.display()))?;
    let file_name = log_file_name(now);
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&file_name)
        .build(dir)
        .with_context(|| format!("open log file in {}", dir.display()))?;
    Ok((dir.join(file_name), appender))
}
