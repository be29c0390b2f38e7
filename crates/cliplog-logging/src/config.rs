//! Configuration types for the logging system
//!
//! All types deserialize with `#[serde(default)]`, so an application can embed
//! a partial `[logging]` table in its own config file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Files kept by the default rotating file output
pub const DEFAULT_MAX_LOG_FILES: usize = 14;

/// What the console layer prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    /// No console output
    Off,
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable, colored when stdout is a terminal
    Pretty,
}

/// Main logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level, overridden entirely by `RUST_LOG`
    pub level: String,
    /// Console format
    pub console: ConsoleOutput,
    /// Stricter level for the console only
    pub console_level: Option<String>,
    /// JSONL file output
    pub file: Option<FileConfig>,
    /// Per-target levels, e.g. `cliplog_storage = "debug"`
    pub targets: BTreeMap<String, String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleOutput::Json,
            console_level: None,
            file: None,
            targets: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Pretty console at debug
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleOutput::Pretty,
            ..Default::default()
        }
    }

    /// Daily rotated JSONL files under `log_dir`, no console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleOutput::Off,
            file: Some(FileConfig {
                directory: log_dir,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, pretty, for test binaries
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: ConsoleOutput::Pretty,
            ..Default::default()
        }
    }

    /// Log files under the platform data directory
    pub fn default_log_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cliplog")
            .join("logs")
    }

    /// Set the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// Filter directives for `EnvFilter`, base level first
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(
                self.targets
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// JSONL file output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; rotated files get a date suffix
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Rotated files to retain; `None` keeps all
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: LogConfig::default_log_dir(),
            prefix: "cliplog".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(DEFAULT_MAX_LOG_FILES),
        }
    }
}

impl FileConfig {
    /// Single never-rotated file `<prefix>.log` in `directory`
    pub fn single(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            rotation: RotationStrategy::Never,
            max_files: None,
        }
    }

    /// Path written when rotation is disabled
    pub fn single_file_path(&self) -> PathBuf {
        self.directory.join(format!("{}.log", self.prefix))
    }
}

/// How often the log file is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated on start
    Never,
}
