//! History settings

use std::path::Path;

use cliplog_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HistoryError, HistoryResult};

/// Default number of non-favorite entries kept
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Smallest accepted history size
pub const MIN_HISTORY_SIZE: usize = 1;

/// Largest accepted history size
pub const MAX_HISTORY_SIZE: usize = 200;

/// Configuration for a [`ClipboardHistory`](crate::ClipboardHistory)
///
/// ```toml
/// history_size = 100
/// strip_text = true
/// cache_only_favorites = false
///
/// [storage]
/// data_dir = "/home/me/.cache/cliplog"
/// max_wasted_ops = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Non-favorite entries kept before the oldest are pruned
    pub history_size: usize,
    /// Trim surrounding whitespace from copied text
    pub strip_text: bool,
    /// Move a re-copied entry to the most-recent end
    pub move_item_first: bool,
    /// Keep non-favorite entries in memory only
    pub cache_only_favorites: bool,
    /// Stop recording copied text
    pub private_mode: bool,
    /// Log storage settings
    pub storage: StorageConfig,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            strip_text: false,
            move_item_first: true,
            cache_only_favorites: false,
            private_mode: false,
            storage: StorageConfig::default(),
        }
    }
}

impl HistoryConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str) -> HistoryResult<Self> {
        let config: HistoryConfig = toml::from_str(raw)?;
        Ok(config.normalized())
    }

    /// Read and parse a TOML file
    pub async fn load(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            HistoryError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), history_size = config.history_size, "Loaded config");
        Ok(config)
    }

    /// Set the history size, clamped to the accepted range
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self.normalized()
    }

    /// Enable or disable trimming copied text
    pub fn with_strip_text(mut self, strip_text: bool) -> Self {
        self.strip_text = strip_text;
        self
    }

    /// Enable or disable moving re-copied entries to the front
    pub fn with_move_item_first(mut self, move_item_first: bool) -> Self {
        self.move_item_first = move_item_first;
        self
    }

    /// Enable or disable logging non-favorites
    pub fn with_cache_only_favorites(mut self, cache_only_favorites: bool) -> Self {
        self.cache_only_favorites = cache_only_favorites;
        self
    }

    /// Enable or disable private mode
    pub fn with_private_mode(mut self, private_mode: bool) -> Self {
        self.private_mode = private_mode;
        self
    }

    /// Replace the storage settings
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Clamp out-of-range values
    pub fn normalized(mut self) -> Self {
        let clamped = self.history_size.clamp(MIN_HISTORY_SIZE, MAX_HISTORY_SIZE);
        if clamped != self.history_size {
            warn!(
                requested = self.history_size,
                clamped = clamped,
                "History size out of range"
            );
            self.history_size = clamped;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.history_size, 50);
        assert!(!config.strip_text);
        assert!(config.move_item_first);
        assert!(!config.cache_only_favorites);
        assert!(!config.private_mode);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = HistoryConfig::from_toml_str(
            r#"
            strip_text = true

            [storage]
            data_dir = "/tmp/clips"
            max_wasted_ops = 20
            "#,
        )
        .unwrap();
        assert!(config.strip_text);
        assert_eq!(config.history_size, DEFAULT_HISTORY_SIZE);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/clips"));
        assert_eq!(config.storage.max_wasted_ops, 20);
        assert_eq!(config.storage.log_file_name, "database.log");
    }

    #[test]
    fn test_history_size_is_clamped() {
        assert_eq!(
            HistoryConfig::from_toml_str("history_size = 0")
                .unwrap()
                .history_size,
            MIN_HISTORY_SIZE
        );
        assert_eq!(
            HistoryConfig::default().with_history_size(1_000).history_size,
            MAX_HISTORY_SIZE
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = HistoryConfig::from_toml_str("history_size = \"many\"").unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = HistoryConfig::load(temp.path().join("cliplog.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("cliplog.toml");
        tokio::fs::write(
            &path,
            "history_size = 10\nmove_item_first = false\ncache_only_favorites = true\n",
        )
            .await
            .unwrap();
        let config = HistoryConfig::load(&path).await.unwrap();
        assert_eq!(config.history_size, 10);
        assert!(!config.move_item_first);
        assert!(config.cache_only_favorites);
        assert!(!config.private_mode);
    }
}
