//! # Cliplog History
//!
//! Clipboard history management on top of the cliplog operation log.
//!
//! ## Features
//!
//! - **De-duplication**: Re-copied text reuses its entry instead of adding one
//! - **Favorites**: Pinned entries are exempt from size-based pruning
//! - **Pruning**: Only the newest `history_size` non-favorites are kept
//! - **Search**: Case-insensitive substring search, most recent first
//! - **Cache-only favorites**: Optionally keep non-favorites out of the log
//! - **Private mode**: Stop recording without closing the history
//! - **Compaction**: The log is rewritten from live state once enough
//!   superseded operations accumulate
//!
//! ## Example
//!
//! ```rust,ignore
//! use cliplog_history::{ClipboardHistory, HistoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> cliplog_history::HistoryResult<()> {
//!     let config = HistoryConfig::load("cliplog.toml").await?;
//!     let mut history = ClipboardHistory::open(config).await?;
//!
//!     if let Some(id) = history.record_text("hello").await? {
//!         history.toggle_favorite(id).await?;
//!     }
//!     for entry in history.search("hel") {
//!         println!("{}: {}", entry.id, entry.text);
//!     }
//!
//!     history.close().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod history;

// Re-exports
pub use config::{DEFAULT_HISTORY_SIZE, HistoryConfig, MAX_HISTORY_SIZE, MIN_HISTORY_SIZE};
pub use error::{HistoryError, HistoryResult};
pub use history::ClipboardHistory;

pub use cliplog_storage::{Entry, EntryId, StorageConfig};
