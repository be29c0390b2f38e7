//! Structured logging setup for cliplog
//!
//! Every cliplog crate logs through `tracing`; this crate installs the
//! subscriber that decides where those events go.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Pretty Console**: Human-readable output for development
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//! - **Target Filters**: Per-crate levels on top of `RUST_LOG`
//!
//! # Quick Start
//!
//! ```ignore
//! use cliplog_logging::{CliplogSubscriberBuilder, LogConfig};
//!
//! // Simple setup with defaults (JSONL to console)
//! CliplogSubscriberBuilder::new().init();
//!
//! // Development mode with pretty human-readable output
//! CliplogSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .with_target("cliplog_storage", "trace")
//!     .init();
//! ```

pub mod config;
pub mod error;

pub use config::{ConsoleOutput, DEFAULT_MAX_LOG_FILES, FileConfig, LogConfig, RotationStrategy};
pub use error::LoggingError;
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};
use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Builder for configuring and initializing the cliplog logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable output during development.
///
/// JSON lines carry flattened event fields, the current span and span list,
/// and the source file and line.
#[derive(Debug, Clone, Default)]
pub struct CliplogSubscriberBuilder {
    config: LogConfig,
}

impl CliplogSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Set the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config = self.config.with_target(target, level);
        self
    }

    /// Choose the console format
    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.config.console = console;
        self
    }

    /// Restrict the console to `level` and above
    pub fn with_console_level(mut self, level: impl Into<String>) -> Self {
        self.config.console_level = Some(level.into());
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns a guard that must be kept alive for file output to be
    /// flushed. Failures are reported on stderr and leave logging off.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    ///
    /// Fails if a filter is invalid, the log file cannot be opened, or a
    /// global subscriber has already been set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = self.env_filter()?;
        let console_level = self.console_level()?;
        let console = self.config.console;

        // Pretty and JSONL console layers have different types, so each is
        // an Option and at most one is Some
        let pretty_console = (console == ConsoleOutput::Pretty).then(|| {
            fmt::layer()
                .with_ansi(std::io::stdout().is_terminal())
                .with_target(true)
                .with_filter(console_level)
        });

        let jsonl_console = (console == ConsoleOutput::Json)
            .then(|| json_layer(std::io::stdout).with_filter(console_level));

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (non_blocking, guard) = create_file_writer(file_config)?;
                (Some(json_layer(non_blocking)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }

    /// `RUST_LOG` wins over the configured directives
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.config.filter_directives()))
            .map_err(|e| LoggingError::Filter(e.to_string()))
    }

    fn console_level(&self) -> Result<LevelFilter, LoggingError> {
        match self.config.console_level.as_deref() {
            Some(level) => level
                .parse::<LevelFilter>()
                .map_err(|e| LoggingError::Filter(format!("{}: {}", level, e))),
            None => Ok(LevelFilter::TRACE),
        }
    }
}

fn json_layer<S, W>(make_writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(make_writer)
}

/// Open the writer for file output
///
/// Without rotation the file is truncated on every start.
fn create_file_writer(
    file_config: &FileConfig,
) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file_config.directory)?;

    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            let file = File::create(file_config.single_file_path())?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max_files) = file_config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder
        .build(&file_config.directory)
        .map_err(|e| LoggingError::Appender(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    CliplogSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    CliplogSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for production (rotated JSONL files)
///
/// Keep the returned guard alive until exit.
pub fn init_production(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let log_dir = log_dir.unwrap_or_else(LogConfig::default_log_dir);
    CliplogSubscriberBuilder::new()
        .with_config(LogConfig::production(log_dir))
        .init()
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_testing() {
    let _ = CliplogSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
