//! Configuration for the clipboard log store

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::append_log::compaction::{FLUSH_EVERY, MAX_WASTED_OPS};

/// Configuration for a [`ClipboardStore`](crate::ClipboardStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the log and the legacy snapshot
    pub data_dir: PathBuf,
    /// File name of the operation log
    pub log_file_name: String,
    /// File name of the legacy JSON snapshot
    pub legacy_file_name: String,
    /// Wasted operations tolerated before the log is rewritten
    pub max_wasted_ops: u64,
    /// Records written between flushes while rewriting the log
    pub flush_every: usize,
    /// Whether to sync appended records to disk before acknowledging them
    pub sync_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cliplog"),
            log_file_name: "database.log".to_string(),
            legacy_file_name: "registry.txt".to_string(),
            max_wasted_ops: MAX_WASTED_OPS,
            flush_every: FLUSH_EVERY,
            sync_on_write: true,
        }
    }
}

impl StorageConfig {
    /// Create a configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the wasted-operation threshold for compaction
    pub fn with_max_wasted_ops(mut self, max_wasted_ops: u64) -> Self {
        self.max_wasted_ops = max_wasted_ops;
        self
    }

    /// Set how many records are written between flushes during a rewrite
    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }

    /// Enable or disable syncing each append
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    /// Path of the operation log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file_name)
    }

    /// Path of the legacy JSON snapshot
    pub fn legacy_path(&self) -> PathBuf {
        self.data_dir.join(&self.legacy_file_name)
    }

    /// Scratch path a compaction writes to before replacing the log
    pub fn rewrite_path(&self) -> PathBuf {
        temp_sibling(&self.log_path())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
