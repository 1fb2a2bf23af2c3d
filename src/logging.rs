// src/logging.rs

//! Log sink construction.
//!
//! A [`Logging`] is built once at startup and owns both the `tracing`
//! dispatcher and the background writer of the log file. Nothing is
//! installed process-wide: callers attach [`Logging::dispatch`] to the
//! futures they run and drop the `Logging` at shutdown, which flushes the
//! file writer.

use std::path::Path;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::error::{AppError, Result};

/// Rotated log files kept next to the current one.
const KEPT_LOG_FILES: usize = 3;

/// Noisy dependencies held at a quieter level.
const QUIET_DIRECTIVES: &str = "hyper=warn,hyper_util=warn,reqwest=info,html5ever=warn,selectors=warn";

/// Injected log sink: console plus a daily-rotated file.
pub struct Logging {
    dispatch: Dispatch,
    _file_guard: WorkerGuard,
}

impl Logging {
    /// Build the sink. `RUST_LOG` overrides the `info`/`debug` default.
    pub fn new(debug: bool, log_file: &Path) -> Result<Self> {
        let level = if debug { "debug" } else { "info" };
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(format!("{level},{QUIET_DIRECTIVES}"))
                .map_err(AppError::logging)?,
        };

        let directory = log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = log_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("watcher");
        let suffix = log_file
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("log");

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix(suffix)
            .max_log_files(KEPT_LOG_FILES)
            .build(directory)
            .map_err(AppError::logging)?;
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true),
            );

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            _file_guard: file_guard,
        })
    }

    /// Dispatcher to attach with `WithSubscriber::with_subscriber`.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Flush and close the log file.
    pub fn shutdown(self) {
        drop(self);
    }
}
