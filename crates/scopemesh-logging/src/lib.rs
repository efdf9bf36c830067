//! JSONL and console logging for scopemesh processes
//!
//! Library crates in this workspace only emit `tracing` events. Binaries
//! and tests install a subscriber through this crate.
//!
//! # Quick Start
//!
//! ```ignore
//! use scopemesh_logging::{FileSink, LogConfig, MeshSubscriberBuilder};
//!
//! // JSONL to console
//! let _guard = MeshSubscriberBuilder::new().init()?;
//!
//! // Pretty console, plus JSONL files under ./logs
//! let _guard = MeshSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .with_file_output(FileSink::in_dir("logs"))
//!     .init()?;
//! ```
//!
//! `RUST_LOG` always wins over the configured default level.

pub mod config;

pub use config::{ConsoleFormat, FileRotation, FileSink, JsonlFields, LogConfig};

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling appender: {0}")]
    Appender(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Assembles the global `tracing` subscriber from a [`LogConfig`]
pub struct MeshSubscriberBuilder {
    config: LogConfig,
}

impl MeshSubscriberBuilder {
    /// JSONL on stdout at `info`
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    pub fn with_console(mut self, format: ConsoleFormat) -> Self {
        self.config.console = format;
        self
    }

    /// Also write JSONL into `sink`
    pub fn with_file_output(mut self, sink: FileSink) -> Self {
        self.config.file = Some(sink);
        self
    }

    /// Install the subscriber globally.
    ///
    /// When file output is configured, the returned guard must be kept alive
    /// for the life of the program or buffered lines are lost.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogError> {
        let LogConfig {
            level,
            console,
            ansi,
            file,
            jsonl,
        } = self.config;

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
        let registry = Registry::default().with(env_filter);

        let (file_writer, guard) = match &file {
            Some(sink) => {
                let (writer, guard) = create_file_writer(sink)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        // Optional layers compose as `Option<Layer>`
        let pretty = (console == ConsoleFormat::Pretty)
            .then(|| fmt::layer().with_ansi(ansi).with_target(true));
        let stdout_jsonl =
            (console == ConsoleFormat::Jsonl).then(|| jsonl_layer(&jsonl, std::io::stdout));
        let file_jsonl = file_writer.map(|writer| jsonl_layer(&jsonl, writer));

        registry
            .with(pretty)
            .with(stdout_jsonl)
            .with(file_jsonl)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))?;
        Ok(guard)
    }
}

impl Default for MeshSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON-lines formatting layer writing to `writer`
fn jsonl_layer<S, W>(fields: &JsonlFields, writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(fields.spans)
        .flatten_event(fields.flatten)
        .with_file(fields.location)
        .with_line_number(fields.location)
        .with_writer(writer)
}

/// Open the file writer; `Never` truncates, rolling files append
fn create_file_writer(sink: &FileSink) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let rotation = match sink.rotation {
        FileRotation::Never => {
            fs::create_dir_all(&sink.directory)?;
            let file = File::create(sink.directory.join(format!("{}.jsonl", sink.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        FileRotation::Daily => Rotation::DAILY,
        FileRotation::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&sink.prefix)
        .filename_suffix("jsonl")
        .build(&sink.directory)
        .map_err(|e| LogError::Appender(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<Option<WorkerGuard>, LogError> {
    MeshSubscriberBuilder::new().init()
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<Option<WorkerGuard>, LogError> {
    MeshSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for tests. Safe to call from every test; only the
/// first call installs a subscriber.
pub fn init_testing() {
    let _ = MeshSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
