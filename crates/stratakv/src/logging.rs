//! Logging setup for applications embedding stratakv.
//!
//! The library emits `tracing` events (open, close, shutdown steps,
//! collection creation); nothing is printed unless the application installs
//! a subscriber. [`LogConfig`] installs one with an env-overridable filter,
//! stdout and/or daily-rotated file output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stratakv_core::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const DEFAULT_LOG_FILE: &str = "stratakv.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// Standard output.
    Stdout,
    /// A daily-rotated file.
    File(PathBuf),
    /// Standard output and a daily-rotated file.
    Both(PathBuf),
}

/// Line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, human-oriented.
    Pretty,
    /// One line per event.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    /// Destination.
    pub output: LogOutput,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// `info` to stdout.
    pub fn info() -> Self {
        Self::default()
    }

    /// `debug` to stdout; shows resolved tuning and shutdown steps.
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// `warn` to stdout; only long bulk-load compactions and failures.
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Write to a daily-rotated file instead of stdout.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Write to stdout and a daily-rotated file.
    pub fn with_both(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Sets the line format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the filter directive.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Installs the global subscriber.
    ///
    /// Returns the file writer's guard when a file is involved; keep it
    /// alive, dropping it stops the background writer. Fails with
    /// `Invalid` on a bad filter directive or when a global subscriber is
    /// already installed.
    ///
    /// ```rust,no_run
    /// use stratakv::logging::LogConfig;
    ///
    /// let _guard = LogConfig::info().init()?;
    /// # Ok::<(), stratakv::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let filter = self.filter()?;
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if matches!(self.output, LogOutput::Stdout | LogOutput::Both(_)) {
            layers.push(match self.format {
                LogFormat::Pretty => fmt::layer().pretty().boxed(),
                LogFormat::Compact => fmt::layer().compact().boxed(),
            });
        }
        if let LogOutput::File(path) | LogOutput::Both(path) = &self.output {
            let (dir, file) = split_log_path(path);
            let appender = tracing_appender::rolling::daily(dir, file);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            layers.push(match self.format {
                LogFormat::Pretty => layer.pretty().boxed(),
                LogFormat::Compact => layer.compact().boxed(),
            });
            guard = Some(worker);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| Error::invalid("logging already initialized").with_detail(e.to_string()))?;
        Ok(guard)
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::invalid("bad log filter").with_detail(e.to_string()))
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file)
}
